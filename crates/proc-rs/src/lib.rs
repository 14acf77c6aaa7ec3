//! proc-rs: synchronous external process execution with stream redirection
//!
//! Each of the three standard streams of a child process is bound
//! independently: inherited from the caller, captured as a pipe, discarded,
//! or connected to a handle the caller already owns (including another
//! process's pipe, which is how pipelines are built).
//!
//! A [`ProcessResult`] that is dropped without its exit status having been
//! looked at raises [`ProcError::UnsuccessfulExit`] if the process failed.
//!
//! # Examples
//!
//! ```ignore
//! use proc_rs::{Proc, StreamDirective};
//!
//! let mut producer = Proc::run(["printf", "b\\na\\n"])
//!     .output(StreamDirective::Capture)
//!     .spawn()?;
//! let mut sorter = Proc::run(["sort"])
//!     .input(producer.take_output()?.into_handle()?)
//!     .output(StreamDirective::Capture)
//!     .spawn()?;
//!
//! let lines: Vec<String> = sorter.output_pipe()?.lines().collect::<Result<_, _>>()?;
//! assert_eq!(lines, ["a", "b"]);
//! producer.check_status()?;
//! ```

pub mod builder;
pub mod execution;
pub mod stream;

pub use builder::{Proc, ProcBuilder};
pub use execution::{
    CapturedOutput, Context, ExecutionConfig, ExitInfo, NOT_EXITED, ProcessResult, SinkPolicy,
    unsuccessful_exit,
};
pub use proc_core::capabilities::SystemCapabilities;
pub use proc_core::{Associative, Environment, ProcError, Result};
pub use stream::{
    Direction, Encoding, InputPipe, Lines, OutputPipe, StreamDirective, StreamHandle, StreamKind,
    TextMode,
};

/// Run a program with default settings: all streams inherited
pub fn run<I, S>(argv: I) -> Result<ProcessResult>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Proc::run(argv).spawn()
}

/// Run a command line through the shell with default settings
pub fn shell(command: &str) -> Result<ProcessResult> {
    Proc::shell(command).spawn()
}
