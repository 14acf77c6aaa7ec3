use console::style;
use log::{debug, info};
use proc_rs::{
    CapturedOutput, Environment, ExitInfo, Proc, ProcBuilder, ProcError, ProcessResult,
    SinkPolicy, StreamDirective, StreamHandle, StreamKind,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// What to run
pub enum Target {
    Program { program: String, args: Vec<String> },
    Shell(String),
    Pipeline(Vec<String>),
}

/// Configuration for one procctl invocation
pub struct RunConfig {
    pub target: Target,
    pub capture: bool,
    pub merge: bool,
    pub discard_err: bool,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub clear_env: bool,
    pub binary: bool,
    pub chomp: bool,
    pub encoding: Option<String>,
    pub json: bool,
}

impl RunConfig {
    fn builders(&self) -> Vec<ProcBuilder> {
        match &self.target {
            Target::Program { program, args } => {
                vec![Proc::run(std::iter::once(program).chain(args).cloned())]
            }
            Target::Shell(command) => vec![Proc::shell(command)],
            Target::Pipeline(stages) => stages.iter().map(|stage| Proc::shell(stage)).collect(),
        }
    }

    /// Apply the options shared by every stage
    fn configure(&self, mut builder: ProcBuilder) -> proc_rs::Result<ProcBuilder> {
        if let Some(cwd) = &self.cwd {
            debug!("Using working directory: {}", cwd.display());
            builder = builder.cwd(cwd);
        }
        if self.clear_env {
            builder = builder.env(Environment::new());
        }
        for (key, value) in &self.env {
            debug!("Setting {}={}", key, value);
            builder = builder.env_var(key, value);
        }
        if let Some(name) = &self.encoding {
            builder = builder.encoding_str(name)?;
        }
        if self.discard_err {
            builder = builder.error(StreamDirective::Discard);
        }
        Ok(builder
            .merge(self.merge)
            .binary(self.binary)
            .chomp(self.chomp)
            .sink_policy(SinkPolicy::Log))
    }
}

/// Captured stream contents in a report
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Captured {
    Lines(Vec<String>),
    Bytes(Vec<u8>),
}

impl Captured {
    fn from_output(output: &CapturedOutput, kind: StreamKind) -> proc_rs::Result<Self> {
        if output.is_binary() {
            let bytes = match kind {
                StreamKind::Error => &output.stderr,
                _ => &output.stdout,
            };
            return Ok(Captured::Bytes(bytes.clone()));
        }
        let lines = match kind {
            StreamKind::Error => output.stderr_lines()?,
            _ => output.stdout_lines()?,
        };
        Ok(Captured::Lines(lines))
    }
}

/// Outcome of one stage
#[derive(Debug, Serialize)]
pub struct StageReport {
    pub command: Vec<String>,
    #[serde(flatten)]
    pub exit: ExitInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<Captured>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<Captured>,
    /// Captured bytes exactly as the child wrote them
    #[serde(skip)]
    pub raw_stdout: Option<Vec<u8>>,
    #[serde(skip)]
    pub raw_stderr: Option<Vec<u8>>,
}

impl StageReport {
    fn waited(child: &mut ProcessResult) -> proc_rs::Result<Self> {
        Ok(Self {
            command: child.command().to_vec(),
            exit: child.wait()?,
            stdout: None,
            stderr: None,
            raw_stdout: None,
            raw_stderr: None,
        })
    }
}

/// Spawn every stage, feeding each one's output to the next
fn spawn_stages(config: &RunConfig) -> proc_rs::Result<Vec<ProcessResult>> {
    let builders = config.builders();
    let last = builders.len().saturating_sub(1);
    let mut upstream: Option<StreamHandle> = None;
    let mut children = Vec::with_capacity(builders.len());

    for (index, builder) in builders.into_iter().enumerate() {
        let mut builder = if index < last {
            builder.output(StreamDirective::Capture)
        } else if config.capture {
            builder.capture_all()
        } else {
            builder
        };
        if let Some(handle) = upstream.take() {
            builder = builder.input(handle);
        }

        let mut child = config.configure(builder)?.spawn()?;
        info!("Started stage {}: {}", index + 1, child.command().join(" "));
        if index < last {
            upstream = Some(child.take_output()?.into_handle()?);
        }
        children.push(child);
    }
    Ok(children)
}

/// Run the configured target and report each stage, first to last
pub fn execute(config: &RunConfig) -> proc_rs::Result<Vec<StageReport>> {
    let mut children = spawn_stages(config)?;
    let mut last = children
        .pop()
        .ok_or_else(|| ProcError::Config("Nothing to run".to_string()))?;

    // the last stage drains the pipeline, so finish it first
    let last_report = if config.capture {
        let output = last.collect()?;
        let stderr_captured = last.is_captured(StreamKind::Error);
        let stderr = if stderr_captured {
            Some(Captured::from_output(&output, StreamKind::Error)?)
        } else {
            None
        };
        StageReport {
            command: last.command().to_vec(),
            exit: output.exit,
            stdout: Some(Captured::from_output(&output, StreamKind::Output)?),
            stderr,
            raw_stderr: stderr_captured.then(|| output.stderr.clone()),
            raw_stdout: Some(output.stdout),
        }
    } else {
        StageReport::waited(&mut last)?
    };

    let mut reports = children
        .iter_mut()
        .map(StageReport::waited)
        .collect::<proc_rs::Result<Vec<_>>>()?;
    reports.push(last_report);
    Ok(reports)
}

fn print_summary(report: &StageReport) {
    let exit_code_styled = if report.exit.success() {
        style(report.exit.exit_code).green().bold()
    } else {
        style(report.exit.exit_code).red().bold()
    };

    eprint!(
        "{} {}={}",
        style(report.command.join(" ")).dim(),
        style("exit_code").dim(),
        exit_code_styled,
    );
    if let Some(signal) = report.exit.signal {
        eprint!(" | {}={}", style("signal").red(), style(signal).red().bold());
    }
    eprintln!();
}

/// Run and print results; returns the exit code of the last stage
pub fn run_command(config: RunConfig) -> Result<i32, Box<dyn std::error::Error>> {
    let reports = execute(&config)?;
    let exit_code = reports.last().map(|r| r.exit.exit_code).unwrap_or(0);

    if config.json {
        let json = match reports.as_slice() {
            [single] if !matches!(config.target, Target::Pipeline(_)) => {
                serde_json::to_string_pretty(single)?
            }
            all => serde_json::to_string_pretty(all)?,
        };
        println!("{}", json);
        return Ok(exit_code);
    }

    for report in &reports {
        if let Some(bytes) = &report.raw_stdout {
            let mut out = std::io::stdout().lock();
            out.write_all(bytes)?;
            out.flush()?;
        }
        if let Some(bytes) = &report.raw_stderr {
            let mut err = std::io::stderr().lock();
            err.write_all(bytes)?;
            err.flush()?;
        }
    }
    for report in &reports {
        print_summary(report);
    }
    Ok(exit_code)
}
