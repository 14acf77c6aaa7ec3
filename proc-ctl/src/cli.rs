use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "procctl")]
#[command(version, about = "Run commands with explicit stream redirection", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Arguments are passed verbatim, no shell
    procctl run echo 'hello $USER'
    procctl --capture --json run ls -l /

    # Through /bin/sh
    procctl shell 'echo out; echo err >&2'
    procctl --capture --merge shell 'make 2>&1'

    # Output of each stage feeds the next
    procctl pipeline 'printf \"b\\na\\n\"' sort 'tr a-z A-Z'

    # Environment and working directory
    procctl --clear-env --env PATH=/usr/bin --cwd /tmp run env

    procctl check
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Capture output and error instead of inheriting them
    #[arg(long, global = true)]
    pub capture: bool,

    /// Send the error stream wherever output goes
    #[arg(long, global = true)]
    pub merge: bool,

    /// Discard the error stream
    #[arg(long, global = true, conflicts_with = "merge")]
    pub discard_err: bool,

    /// Working directory for the command
    #[arg(long, value_name = "PATH", global = true)]
    pub cwd: Option<PathBuf>,

    /// Set an environment variable (repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair, global = true)]
    pub env: Vec<(String, String)>,

    /// Start from an empty environment
    #[arg(long, global = true)]
    pub clear_env: bool,

    /// Treat captured streams as raw bytes
    #[arg(long = "bin", global = true)]
    pub binary: bool,

    /// Keep line terminators on captured lines in --json reports
    #[arg(long, global = true)]
    pub no_chomp: bool,

    /// Encoding of captured text (utf-8, latin-1, ascii)
    #[arg(long, value_name = "ENCODING", global = true)]
    pub encoding: Option<String>,

    /// Print a JSON report instead of the captured streams
    #[arg(long, global = true)]
    pub json: bool,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program with arguments passed verbatim
    Run {
        /// Program to run
        program: String,

        /// Program arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a command line through /bin/sh
    Shell {
        /// Command line
        command: String,
    },

    /// Run shell commands connected output to input
    Pipeline {
        /// Stages, first to last
        #[arg(required = true, num_args = 1..)]
        stages: Vec<String>,
    },

    /// Check what this system supports
    Check,
}

/// Parse `KEY=VALUE`; the value may itself contain `=`
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
