//! Execution layer: launching processes and tracking their outcome
//!
//! # Features
//!
//! - **Launcher**: fork/exec with per-stream bindings, argv passed verbatim
//! - **Result handle**: pipes, pid, exit code and signal of a running process
//! - **Sink policy**: unsuccessful exits are raised when a handle is dropped
//!   without being inspected
//! - **Context**: explicit working directory and environment, copied at spawn
//!
//! # Examples
//!
//! ```ignore
//! use proc_rs::{Proc, StreamDirective};
//!
//! let mut proc = Proc::run(["echo", "hello"])
//!     .output(StreamDirective::Capture)
//!     .spawn()?;
//! assert_eq!(proc.output_pipe()?.slurp()?, "hello\n");
//! assert_eq!(proc.exit_code(), 0);
//! ```

pub mod config;
pub mod exit;
pub mod handle;
pub mod launcher;
pub mod sink;

pub use config::{Context, ExecutionConfig};
pub use exit::{ExitInfo, NOT_EXITED};
pub use handle::{CapturedOutput, ProcessResult};
pub use launcher::spawn;
pub use sink::{SinkPolicy, unsuccessful_exit};
