//! Exit status shared between a result handle and its pipes

use std::sync::{Arc, Mutex, OnceLock, TryLockError};

use log::debug;
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use proc_core::{ProcError, Result};
use serde::Serialize;

/// Exit code reported before the process has been reaped
pub const NOT_EXITED: i32 = -1;

/// How a process terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExitInfo {
    /// Exit status, or 128 + signal number when killed by a signal
    pub exit_code: i32,
    /// Signal that killed the process (if any)
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: code,
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            exit_code: 128 + signal,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }

    /// Convert a failed exit into `UnsuccessfulExit`
    pub fn check(self, command: &[String]) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(ProcError::UnsuccessfulExit {
            exit_code: self.exit_code,
            signal: self.signal,
            command: command.to_vec(),
        })
    }

    fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Self::exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Self::signaled(signal as i32)),
            _ => None,
        }
    }
}

/// Reaps one child exactly once and caches the outcome.
///
/// The status is published in a `OnceLock`, so `cached()` never waits on a
/// thread blocked in `waitpid`.
#[derive(Debug)]
pub(crate) struct ExitState {
    pid: Pid,
    status: OnceLock<ExitInfo>,
    reap: Mutex<()>,
}

impl ExitState {
    pub(crate) fn new(pid: Pid) -> Arc<Self> {
        Arc::new(Self {
            pid,
            status: OnceLock::new(),
            reap: Mutex::new(()),
        })
    }

    pub(crate) fn pid(&self) -> Pid {
        self.pid
    }

    /// Status if the process has already been reaped
    pub(crate) fn cached(&self) -> Option<ExitInfo> {
        self.status.get().copied()
    }

    fn record(&self, info: ExitInfo) -> ExitInfo {
        debug!(
            "Process {} exited (code {}, signal {:?})",
            self.pid, info.exit_code, info.signal
        );
        *self.status.get_or_init(|| info)
    }

    /// Block until the process exits
    pub(crate) fn wait(&self) -> Result<ExitInfo> {
        if let Some(info) = self.cached() {
            return Ok(info);
        }

        let _reap = self
            .reap
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        // another thread may have reaped while we waited for the lock
        if let Some(info) = self.cached() {
            return Ok(info);
        }

        loop {
            match waitpid(self.pid, None) {
                Ok(ws) => {
                    if let Some(info) = ExitInfo::from_wait_status(ws) {
                        return Ok(self.record(info));
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    return Err(ProcError::Syscall(format!(
                        "waitpid({}) failed: {}",
                        self.pid, e
                    )));
                }
            }
        }
    }

    /// Reap the process if it has exited, without blocking
    pub(crate) fn try_wait(&self) -> Result<Option<ExitInfo>> {
        if let Some(info) = self.cached() {
            return Ok(Some(info));
        }

        let _reap = match self.reap.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poison)) => poison.into_inner(),
            // a blocking wait owns the pid
            Err(TryLockError::WouldBlock) => return Ok(self.cached()),
        };
        if let Some(info) = self.cached() {
            return Ok(Some(info));
        }

        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(ws) => Ok(ExitInfo::from_wait_status(ws).map(|info| self.record(info))),
            Err(Errno::EINTR) => Ok(None),
            Err(e) => Err(ProcError::Syscall(format!(
                "waitpid({}) failed: {}",
                self.pid, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{ForkResult, fork};

    fn fork_exiting(code: i32) -> Pid {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => unsafe { libc::_exit(code) },
            Ok(ForkResult::Parent { child }) => child,
            Err(e) => panic!("fork failed: {}", e),
        }
    }

    #[test]
    fn exit_info_success() {
        assert!(ExitInfo::exited(0).success());
        assert!(!ExitInfo::exited(3).success());
        let killed = ExitInfo::signaled(9);
        assert_eq!(killed.exit_code, 137);
        assert_eq!(killed.signal, Some(9));
        assert!(!killed.success());
    }

    #[test]
    fn exit_info_check_carries_command() {
        let command = vec!["false".to_string()];
        assert!(ExitInfo::exited(0).check(&command).is_ok());
        match ExitInfo::exited(1).check(&command) {
            Err(ProcError::UnsuccessfulExit {
                exit_code,
                signal,
                command,
            }) => {
                assert_eq!(exit_code, 1);
                assert_eq!(signal, None);
                assert_eq!(command, vec!["false"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn wait_returns_exit_status_and_caches_it() {
        let state = ExitState::new(fork_exiting(42));
        assert_eq!(state.wait().unwrap(), ExitInfo::exited(42));
        // second wait must not call waitpid on a reaped pid
        assert_eq!(state.wait().unwrap(), ExitInfo::exited(42));
        assert_eq!(state.cached(), Some(ExitInfo::exited(42)));
    }

    #[test]
    fn wait_reports_signal() {
        let pid = match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                unsafe { libc::raise(libc::SIGTERM) };
                unsafe { libc::_exit(1) }
            }
            Ok(ForkResult::Parent { child }) => child,
            Err(e) => panic!("fork failed: {}", e),
        };
        let info = ExitState::new(pid).wait().unwrap();
        assert_eq!(info.signal, Some(libc::SIGTERM));
        assert_eq!(info.exit_code, 128 + libc::SIGTERM);
    }

    #[test]
    fn try_wait_eventually_observes_exit() {
        let state = ExitState::new(fork_exiting(0));
        assert_eq!(state.cached(), None);
        let info = loop {
            if let Some(info) = state.try_wait().unwrap() {
                break info;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert!(info.success());
        assert_eq!(state.try_wait().unwrap(), Some(info));
    }

    #[test]
    fn cached_does_not_block_behind_wait() {
        let pid = match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                unsafe { libc::sleep(1) };
                unsafe { libc::_exit(0) }
            }
            Ok(ForkResult::Parent { child }) => child,
            Err(e) => panic!("fork failed: {}", e),
        };
        let state = ExitState::new(pid);
        let waiter = {
            let state = Arc::clone(&state);
            std::thread::spawn(move || state.wait().unwrap())
        };
        std::thread::sleep(std::time::Duration::from_millis(100));

        let start = std::time::Instant::now();
        assert_eq!(state.cached(), None);
        assert_eq!(state.try_wait().unwrap(), None);
        assert!(start.elapsed() < std::time::Duration::from_millis(500));

        let info = waiter.join().unwrap();
        assert!(info.success());
        assert_eq!(state.cached(), Some(info));
        assert_eq!(state.wait().unwrap(), info);
    }

    #[test]
    fn exit_info_serializes() {
        let json = serde_json::to_string(&ExitInfo::exited(2)).unwrap();
        assert_eq!(json, r#"{"exit_code":2,"signal":null}"#);
    }
}
