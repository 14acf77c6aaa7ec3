//! Entry points and the builder that turns options into a spawned process

use std::path::{Path, PathBuf};

use log::debug;
use proc_core::util::shell_argv;
use proc_core::{Environment, Result};

use crate::execution::config::{Context, ExecutionConfig};
use crate::execution::handle::ProcessResult;
use crate::execution::launcher;
use crate::execution::sink::SinkPolicy;
use crate::stream::directive::{StreamDirective, resolve_all};
use crate::stream::encoding::{Encoding, TextMode};

/// Entry points for running external commands
pub struct Proc;

impl Proc {
    /// Run a program with arguments passed verbatim, without a shell
    pub fn run<I, S>(argv: I) -> ProcBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcBuilder::new(argv.into_iter().map(Into::into).collect())
    }

    /// Run a command line through `/bin/sh -c`
    pub fn shell(command: &str) -> ProcBuilder {
        ProcBuilder::new(shell_argv(command))
    }
}

#[derive(Debug, Clone)]
enum EnvChange {
    Set(String, String),
    Remove(String),
}

/// Builder pattern for process creation
#[derive(Debug)]
pub struct ProcBuilder {
    argv: Vec<String>,
    input: StreamDirective,
    output: StreamDirective,
    error: StreamDirective,
    merge: bool,
    text: TextMode,
    cwd: Option<PathBuf>,
    env: Option<Environment>,
    env_changes: Vec<EnvChange>,
    context: Option<Context>,
    sink_policy: SinkPolicy,
}

impl ProcBuilder {
    fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            input: StreamDirective::Inherit,
            output: StreamDirective::Inherit,
            error: StreamDirective::Inherit,
            merge: false,
            text: TextMode::default(),
            cwd: None,
            env: None,
            env_changes: Vec::new(),
            context: None,
            sink_policy: SinkPolicy::default(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Set the input stream directive
    pub fn input(mut self, directive: impl Into<StreamDirective>) -> Self {
        self.input = directive.into();
        self
    }

    /// Set the output stream directive
    pub fn output(mut self, directive: impl Into<StreamDirective>) -> Self {
        self.output = directive.into();
        self
    }

    /// Set the error stream directive; ignored when merging
    pub fn error(mut self, directive: impl Into<StreamDirective>) -> Self {
        self.error = directive.into();
        self
    }

    /// Capture both output and error
    pub fn capture_all(self) -> Self {
        self.output(StreamDirective::Capture)
            .error(StreamDirective::Capture)
    }

    /// Send the error stream wherever output goes
    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// Treat pipes as raw bytes; encoding is ignored
    pub fn binary(mut self, binary: bool) -> Self {
        self.text.binary = binary;
        self
    }

    /// Strip line terminators from lines read from pipes
    pub fn chomp(mut self, chomp: bool) -> Self {
        self.text.chomp = chomp;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.text.encoding = encoding;
        self
    }

    /// Set encoding from its name (e.g., "utf-8", "latin-1")
    pub fn encoding_str(self, name: &str) -> Result<Self> {
        let encoding = name.parse()?;
        Ok(self.encoding(encoding))
    }

    /// Line terminator used for reading lines and `say`
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.text.newline = newline.into();
        self
    }

    /// Working directory; relative paths are taken from the context's directory
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the environment entirely
    pub fn env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self.env_changes.clear();
        self
    }

    /// Set one variable on top of the inherited environment
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_changes
            .push(EnvChange::Set(key.into(), value.into()));
        self
    }

    /// Remove one variable from the inherited environment
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_changes.push(EnvChange::Remove(key.into()));
        self
    }

    /// Start from an explicit context instead of the ambient process state
    pub fn context(mut self, context: &Context) -> Self {
        self.context = Some(context.clone());
        self
    }

    /// What to do when the handle is dropped without inspecting a failure
    pub fn sink_policy(mut self, policy: SinkPolicy) -> Self {
        self.sink_policy = policy;
        self
    }

    /// Freeze the options into an [`ExecutionConfig`].
    ///
    /// The working directory and environment are copied here: from the
    /// builder's context if one was given, otherwise from the current process.
    pub fn build_config(&self) -> Result<ExecutionConfig> {
        let base = match &self.context {
            Some(context) => context.clone(),
            None => Context::ambient()?,
        };

        let cwd = match &self.cwd {
            Some(path) => base.cwd().join(path),
            None => base.cwd().to_path_buf(),
        };

        let mut env = match &self.env {
            Some(env) => env.clone(),
            None => base.env().clone(),
        };
        for change in &self.env_changes {
            match change {
                EnvChange::Set(key, value) => {
                    env.set(key.clone(), value.clone());
                }
                EnvChange::Remove(key) => {
                    env.remove(key);
                }
            }
        }

        ExecutionConfig::new(
            self.argv.clone(),
            cwd,
            env,
            self.text.clone(),
            self.merge,
            self.sink_policy,
        )
    }

    /// Spawn the process. Returns once it is running.
    pub fn spawn(self) -> Result<ProcessResult> {
        let config = self.build_config()?;
        debug!(
            "Resolving streams for {:?} (merge: {})",
            config.argv(),
            config.merge()
        );
        let bindings = resolve_all(self.input, self.output, self.error, config.merge())?;
        launcher::spawn(&config, bindings)
    }
}
