//! Result handle returned by the launcher

use std::sync::Arc;

use nix::unistd::Pid;
use proc_core::{ProcError, Result};

use crate::execution::exit::{ExitInfo, ExitState, NOT_EXITED};
use crate::execution::sink::{self, SinkPolicy};
use crate::stream::collect;
use crate::stream::directive::StreamKind;
use crate::stream::encoding::TextMode;
use crate::stream::pipe::{InputPipe, OutputPipe};

/// Slot for a pipe that may not have been captured
#[derive(Debug)]
enum PipeSlot<T> {
    NotCaptured,
    Open(T),
    Taken,
}

impl<T> PipeSlot<T> {
    fn new(pipe: Option<T>) -> Self {
        match pipe {
            Some(pipe) => PipeSlot::Open(pipe),
            None => PipeSlot::NotCaptured,
        }
    }

    fn get_mut(&mut self, kind: StreamKind) -> Result<&mut T> {
        match self {
            PipeSlot::Open(pipe) => Ok(pipe),
            PipeSlot::NotCaptured => Err(not_captured(kind)),
            PipeSlot::Taken => Err(already_taken(kind)),
        }
    }

    fn take(&mut self, kind: StreamKind) -> Result<T> {
        match std::mem::replace(self, PipeSlot::Taken) {
            PipeSlot::Open(pipe) => Ok(pipe),
            PipeSlot::NotCaptured => {
                *self = PipeSlot::NotCaptured;
                Err(not_captured(kind))
            }
            PipeSlot::Taken => Err(already_taken(kind)),
        }
    }

    /// Take the pipe if it is still here
    fn take_open(&mut self) -> Option<T> {
        match std::mem::replace(self, PipeSlot::Taken) {
            PipeSlot::Open(pipe) => Some(pipe),
            other => {
                *self = other;
                None
            }
        }
    }

    fn is_captured(&self) -> bool {
        !matches!(self, PipeSlot::NotCaptured)
    }
}

fn not_captured(kind: StreamKind) -> ProcError {
    ProcError::Usage(format!("the {} stream was not captured", kind.name()))
}

fn already_taken(kind: StreamKind) -> ProcError {
    ProcError::Usage(format!("the {} pipe was already taken", kind.name()))
}

/// Everything read from a process by [`ProcessResult::collect`]
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit: ExitInfo,
    text: TextMode,
}

impl CapturedOutput {
    pub fn stdout_text(&self) -> Result<String> {
        self.text.decode(self.stdout.clone())
    }

    pub fn stderr_text(&self) -> Result<String> {
        self.text.decode(self.stderr.clone())
    }

    /// Output split into lines with the handle's newline and chomp settings
    pub fn stdout_lines(&self) -> Result<Vec<String>> {
        Ok(self.text.split_lines(&self.stdout_text()?))
    }

    pub fn stderr_lines(&self) -> Result<Vec<String>> {
        Ok(self.text.split_lines(&self.stderr_text()?))
    }

    pub fn is_binary(&self) -> bool {
        self.text.binary
    }

    pub fn success(&self) -> bool {
        self.exit.success()
    }
}

/// A spawned process.
///
/// Dropping the handle without looking at the exit status runs the sink
/// policy: an unsuccessful exit is raised as [`ProcError::UnsuccessfulExit`]
/// (by default as a panic at the point of discard). Reading the exit status
/// through [`exit_code`](Self::exit_code), [`signal`](Self::signal),
/// [`wait`](Self::wait), [`success`](Self::success),
/// [`check_status`](Self::check_status) or [`collect`](Self::collect)
/// counts as handling it; `exit_code` and `signal` only count once the
/// process has been reaped.
#[derive(Debug)]
pub struct ProcessResult {
    command: Vec<String>,
    exit: Arc<ExitState>,
    text: TextMode,
    input: PipeSlot<InputPipe>,
    output: PipeSlot<OutputPipe>,
    error: PipeSlot<OutputPipe>,
    inspected: bool,
    disposed: bool,
    sink_policy: SinkPolicy,
}

impl ProcessResult {
    pub(crate) fn new(
        command: Vec<String>,
        exit: Arc<ExitState>,
        text: TextMode,
        pipes: (Option<InputPipe>, Option<OutputPipe>, Option<OutputPipe>),
        sink_policy: SinkPolicy,
    ) -> Self {
        let (input, output, error) = pipes;
        Self {
            command,
            exit,
            text,
            input: PipeSlot::new(input),
            output: PipeSlot::new(output),
            error: PipeSlot::new(error),
            inspected: false,
            disposed: false,
            sink_policy,
        }
    }

    /// Program and arguments the process was spawned with
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Process id; a handle only exists for a process that was started
    pub fn pid(&self) -> Option<Pid> {
        Some(self.exit.pid())
    }

    /// Exit code, or [`NOT_EXITED`] until the process has been reaped by a
    /// wait or by reading a captured pipe to the end. Never blocks.
    ///
    /// Reading the sentinel does not count as inspecting the outcome.
    pub fn exit_code(&mut self) -> i32 {
        self.observed()
            .map(|info| info.exit_code)
            .unwrap_or(NOT_EXITED)
    }

    /// Signal that killed the process, if it has been reaped and was signaled
    pub fn signal(&mut self) -> Option<i32> {
        self.observed().and_then(|info| info.signal)
    }

    fn observed(&mut self) -> Option<ExitInfo> {
        let info = self.exit.cached();
        if info.is_some() {
            self.inspected = true;
        }
        info
    }

    /// Whether the stream was requested as a capture pipe
    pub fn is_captured(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Input => self.input.is_captured(),
            StreamKind::Output => self.output.is_captured(),
            StreamKind::Error => self.error.is_captured(),
        }
    }

    pub fn input_pipe(&mut self) -> Result<&mut InputPipe> {
        self.input.get_mut(StreamKind::Input)
    }

    pub fn output_pipe(&mut self) -> Result<&mut OutputPipe> {
        self.output.get_mut(StreamKind::Output)
    }

    pub fn error_pipe(&mut self) -> Result<&mut OutputPipe> {
        self.error.get_mut(StreamKind::Error)
    }

    /// Move the input pipe out of the handle
    pub fn take_input(&mut self) -> Result<InputPipe> {
        self.input.take(StreamKind::Input)
    }

    /// Move the output pipe out, e.g. to feed another process
    pub fn take_output(&mut self) -> Result<OutputPipe> {
        self.output.take(StreamKind::Output)
    }

    pub fn take_error(&mut self) -> Result<OutputPipe> {
        self.error.take(StreamKind::Error)
    }

    /// Close the input pipe if the handle still holds it
    pub fn close_input(&mut self) {
        drop(self.input.take_open());
    }

    /// Block until the process exits. Repeated calls return the cached status.
    ///
    /// The input pipe is closed first so a child reading its input can finish.
    pub fn wait(&mut self) -> Result<ExitInfo> {
        self.close_input();
        let info = self.exit.wait()?;
        self.inspected = true;
        Ok(info)
    }

    /// Reap the process if it has already exited
    pub fn try_wait(&mut self) -> Result<Option<ExitInfo>> {
        let info = self.exit.try_wait()?;
        if info.is_some() {
            self.inspected = true;
        }
        Ok(info)
    }

    /// Boolean view of the handle: waits and reports whether the exit succeeded
    pub fn success(&mut self) -> Result<bool> {
        Ok(self.wait()?.success())
    }

    /// Wait and turn an unsuccessful exit into an error
    pub fn check_status(&mut self) -> Result<ExitInfo> {
        self.wait()?.check(&self.command)
    }

    /// Drain captured output and error concurrently, then wait.
    ///
    /// Uncaptured or already taken streams come back empty.
    pub fn collect(&mut self) -> Result<CapturedOutput> {
        self.close_input();
        let (stdout, stderr) = collect::drain(self.output.take_open(), self.error.take_open())?;
        let exit = self.wait()?;
        Ok(CapturedOutput {
            stdout,
            stderr,
            exit,
            text: self.text.clone(),
        })
    }

    /// Dispose of the handle explicitly.
    ///
    /// Returns `UnsuccessfulExit` if the process failed and its status was
    /// never inspected.
    pub fn sink(mut self) -> Result<()> {
        self.dispose()
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;

        self.close_input();
        let drained = collect::drain(self.output.take_open(), self.error.take_open());
        let info = self.exit.wait()?;
        drained?;

        if self.inspected {
            return Ok(());
        }
        info.check(&self.command).map(|_| ())
    }
}

impl Drop for ProcessResult {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        let outcome = self.dispose();
        sink::on_discard(self.sink_policy, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_slot_take_once() {
        let mut slot = PipeSlot::new(Some(7));
        assert!(slot.is_captured());
        assert_eq!(*slot.get_mut(StreamKind::Output).unwrap(), 7);
        assert_eq!(slot.take(StreamKind::Output).unwrap(), 7);
        assert!(matches!(
            slot.take(StreamKind::Output),
            Err(ProcError::Usage(msg)) if msg.contains("already taken")
        ));
        // a taken pipe was still captured
        assert!(slot.is_captured());
    }

    #[test]
    fn pipe_slot_not_captured() {
        let mut slot: PipeSlot<u8> = PipeSlot::new(None);
        assert!(!slot.is_captured());
        assert!(slot.take_open().is_none());
        assert!(matches!(
            slot.get_mut(StreamKind::Error),
            Err(ProcError::Usage(msg)) if msg.contains("error stream was not captured")
        ));
        assert!(matches!(slot, PipeSlot::NotCaptured));
    }

    #[test]
    fn captured_output_decodes_with_text_mode() {
        let captured = CapturedOutput {
            stdout: b"one\ntwo\n".to_vec(),
            stderr: vec![0xe9],
            exit: ExitInfo::exited(0),
            text: TextMode {
                encoding: crate::stream::encoding::Encoding::Latin1,
                ..Default::default()
            },
        };
        assert_eq!(captured.stdout_lines().unwrap(), ["one", "two"]);
        assert_eq!(captured.stderr_text().unwrap(), "é");
        assert!(captured.success());
        assert!(!captured.is_binary());
    }

    #[test]
    fn captured_output_binary_has_no_text() {
        let captured = CapturedOutput {
            stdout: vec![0, 1],
            stderr: Vec::new(),
            exit: ExitInfo::signaled(9),
            text: TextMode {
                binary: true,
                ..Default::default()
            },
        };
        assert!(matches!(captured.stdout_text(), Err(ProcError::Usage(_))));
        assert!(!captured.success());
    }
}
