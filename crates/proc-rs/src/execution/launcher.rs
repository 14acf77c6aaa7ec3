//! Process launcher: fork/exec with resolved stream bindings
//!
//! All allocation happens before `fork`. Between `fork` and `execve` the
//! child only makes async-signal-safe calls on data prepared by the parent:
//! 1. Reset SIGPIPE to its default disposition
//! 2. Install stream bindings on fds 0, 1 and 2
//! 3. Chdir
//! 4. Execve
//!
//! Any failure in the child is sent back as an errno over a close-on-exec
//! pipe. EOF on that pipe means `execve` succeeded.

use std::ffi::{CString, NulError};
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use log::{debug, warn};
use nix::fcntl::OFlag;
use nix::unistd::{ForkResult, fork, pipe2};
use proc_core::util::resolve_program_path;
use proc_core::{ProcError, Result};

use crate::execution::config::ExecutionConfig;
use crate::execution::exit::ExitState;
use crate::execution::handle::ProcessResult;
use crate::stream::directive::{Bindings, ErrorBinding, StreamKind};
use crate::stream::pipe::{InputPipe, OutputPipe};

/// Pointers and descriptors the child uses after `fork`
struct ExecPlan {
    program: CString,
    cwd: CString,
    // keep the strings alive for the pointer arrays below
    _args: Vec<CString>,
    _env: Vec<CString>,
    argv: Vec<*const libc::c_char>,
    envp: Vec<*const libc::c_char>,
    redirects: [Option<RawFd>; 3],
    merge: bool,
}

impl ExecPlan {
    fn new(config: &ExecutionConfig, program: &Path, bindings: &Bindings) -> Result<Self> {
        let program = CString::new(program.as_os_str().as_bytes()).map_err(nul_error)?;
        let cwd = CString::new(config.cwd().as_os_str().as_bytes()).map_err(nul_error)?;
        let args = to_cstrings(config.argv().iter().map(String::as_str))?;
        let env = to_cstrings(config.env().to_entries().iter().map(String::as_str))?;

        let argv = null_terminated(&args);
        let envp = null_terminated(&env);

        let (error_fd, merge) = match &bindings.error {
            ErrorBinding::Own(binding) => (binding.child_fd(), false),
            ErrorBinding::Merged => (None, true),
        };

        Ok(Self {
            program,
            cwd,
            _args: args,
            _env: env,
            argv,
            envp,
            redirects: [bindings.input.child_fd(), bindings.output.child_fd(), error_fd],
            merge,
        })
    }
}

fn nul_error(e: NulError) -> ProcError {
    ProcError::Config(format!("string contains a nul byte: {}", e))
}

fn to_cstrings<'a>(items: impl Iterator<Item = &'a str>) -> Result<Vec<CString>> {
    items
        .map(CString::new)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(nul_error)
}

fn null_terminated(strings: &[CString]) -> Vec<*const libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Spawn the configured process with the given bindings.
///
/// Returns as soon as `execve` has succeeded; the process keeps running.
pub fn spawn(config: &ExecutionConfig, bindings: Bindings) -> Result<ProcessResult> {
    let argv = config.argv();
    let program = resolve_program_path(config.program(), config.env().path())
        .map_err(|e| ProcError::spawn(argv, e))?;
    let plan = ExecPlan::new(config, &program, &bindings)?;

    let (status_read, status_write) =
        pipe2(OFlag::O_CLOEXEC).map_err(|e| ProcError::Syscall(format!("pipe failed: {}", e)))?;

    // SAFETY: the child only runs exec_child, which sticks to
    // async-signal-safe calls on memory prepared above
    let child = match unsafe { fork() } {
        Ok(ForkResult::Child) => unsafe { exec_child(&plan, status_write.as_raw_fd()) },
        Ok(ForkResult::Parent { child }) => child,
        Err(e) => return Err(ProcError::spawn(argv, io::Error::from(e))),
    };

    drop(status_write);
    let Bindings {
        input,
        output,
        error,
    } = bindings;
    let input = input.into_parent();
    let output = output.into_parent();
    let error = match error {
        ErrorBinding::Own(binding) => binding.into_parent(),
        ErrorBinding::Merged => None,
    };

    let exit = ExitState::new(child);
    if let Some(errno) = read_exec_status(status_read)? {
        let source = io::Error::from_raw_os_error(errno);
        warn!("Failed to spawn {}: {}", argv.join(" "), source);
        // the child exits right after reporting, reap it
        exit.wait()?;
        return Err(ProcError::spawn(argv, source));
    }

    debug!(
        "Spawned {} (pid {}, cwd {})",
        argv.join(" "),
        child,
        config.cwd().display()
    );

    let text = config.text().clone();
    let pipes = (
        input.map(|fd| InputPipe::new(fd, text.clone())),
        output.map(|fd| OutputPipe::new(StreamKind::Output, fd, text.clone(), exit.clone())),
        error.map(|fd| OutputPipe::new(StreamKind::Error, fd, text.clone(), exit.clone())),
    );

    Ok(ProcessResult::new(
        argv.to_vec(),
        exit,
        text,
        pipes,
        config.sink_policy(),
    ))
}

/// Errno reported by the child, or `None` once exec succeeded
fn read_exec_status(fd: OwnedFd) -> Result<Option<i32>> {
    let mut file = File::from(fd);
    let mut buf = [0u8; 4];
    let mut filled = 0;

    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProcError::Io(e)),
        }
    }

    match filled {
        0 => Ok(None),
        4 => Ok(Some(i32::from_ne_bytes(buf))),
        n => Err(ProcError::Syscall(format!(
            "short read of {} bytes from exec status pipe",
            n
        ))),
    }
}

/// Runs in the forked child; never returns.
///
/// # Safety
///
/// Must only be called in the child of `fork`, with `plan` prepared by the
/// parent and `status_fd` the write end of a close-on-exec pipe.
unsafe fn exec_child(plan: &ExecPlan, status_fd: RawFd) -> ! {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);

        for (target, source) in plan.redirects.iter().enumerate() {
            let target = target as RawFd;
            let Some(source) = *source else {
                continue;
            };
            if source == target {
                // dup2 would be a no-op and leave FD_CLOEXEC set
                let flags = libc::fcntl(source, libc::F_GETFD);
                if flags < 0 || libc::fcntl(source, libc::F_SETFD, flags & !libc::FD_CLOEXEC) < 0 {
                    report_and_exit(status_fd);
                }
            } else if libc::dup2(source, target) < 0 {
                report_and_exit(status_fd);
            }
        }

        if plan.merge && libc::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO) < 0 {
            report_and_exit(status_fd);
        }

        if libc::chdir(plan.cwd.as_ptr()) != 0 {
            report_and_exit(status_fd);
        }

        libc::execve(plan.program.as_ptr(), plan.argv.as_ptr(), plan.envp.as_ptr());
        report_and_exit(status_fd)
    }
}

/// Send errno to the parent and exit
unsafe fn report_and_exit(status_fd: RawFd) -> ! {
    let errno = io::Error::last_os_error().raw_os_error().unwrap_or(libc::EINVAL);
    let bytes = errno.to_ne_bytes();
    unsafe {
        libc::write(status_fd, bytes.as_ptr() as *const libc::c_void, bytes.len());
        libc::_exit(127)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::sink::SinkPolicy;
    use crate::stream::directive::{StreamDirective, resolve_all};
    use crate::stream::encoding::TextMode;
    use proc_core::Environment;
    use std::path::PathBuf;

    fn config(args: &[&str], cwd: &str) -> ExecutionConfig {
        ExecutionConfig::new(
            args.iter().map(|s| s.to_string()).collect(),
            PathBuf::from(cwd),
            Environment::ambient(),
            TextMode::default(),
            false,
            SinkPolicy::Panic,
        )
        .unwrap()
    }

    fn captured_output() -> Bindings {
        resolve_all(
            StreamDirective::Inherit,
            StreamDirective::Capture,
            StreamDirective::Inherit,
            false,
        )
        .unwrap()
    }

    #[test]
    fn spawn_runs_program_and_captures_output() {
        let mut result = spawn(&config(&["echo", "launcher"], "/"), captured_output()).unwrap();
        let text = result.output_pipe().unwrap().slurp().unwrap();
        assert_eq!(text, "launcher\n");
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn spawn_reports_missing_program() {
        let err = spawn(
            &config(&["definitely_missing_cmd_xyz"], "/"),
            captured_output(),
        )
        .unwrap_err();
        match err {
            ProcError::Spawn { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn spawn_reports_bad_working_directory() {
        let err = spawn(
            &config(&["true"], "/definitely/missing/dir"),
            captured_output(),
        )
        .unwrap_err();
        match err {
            ProcError::Spawn { source, .. } => {
                assert_eq!(source.raw_os_error(), Some(libc::ENOENT))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn spawn_reports_exec_permission_error() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("not-executable");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        let program = script.to_string_lossy().into_owned();

        let err = spawn(&config(&[program.as_str()], "/"), captured_output()).unwrap_err();
        match err {
            ProcError::Spawn { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn read_exec_status_on_closed_pipe_is_success() {
        let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).unwrap();
        drop(write_end);
        assert_eq!(read_exec_status(read_end).unwrap(), None);
    }
}
