//! Draining output and error pipes together
//!
//! Reading one pipe to the end before touching the other deadlocks once the
//! child fills the buffer of the pipe nobody is reading. `drain` waits on
//! both descriptors with poll(2) and reads whichever is ready.

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsRawFd;

use proc_core::{ProcError, Result};

use crate::stream::pipe::OutputPipe;

const CHUNK: usize = 8192;

struct Source {
    file: File,
    buf: Vec<u8>,
    open: bool,
}

impl Source {
    fn new(pipe: OutputPipe) -> Self {
        let (buf, file) = pipe.into_parts();
        Self {
            file,
            buf,
            open: true,
        }
    }

    /// Read one chunk; marks the source closed at end of stream
    fn pump(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; CHUNK];
        match self.file.read(&mut chunk) {
            Ok(0) => self.open = false,
            Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// Read two optional pipes to end of stream without blocking on either one
pub(crate) fn drain(
    output: Option<OutputPipe>,
    error: Option<OutputPipe>,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut sources = [output.map(Source::new), error.map(Source::new)];

    loop {
        let mut fds: Vec<libc::pollfd> = Vec::with_capacity(2);
        let mut owners: Vec<usize> = Vec::with_capacity(2);
        for (idx, source) in sources.iter().enumerate() {
            if let Some(source) = source
                && source.open
            {
                fds.push(libc::pollfd {
                    fd: source.file.as_raw_fd(),
                    events: libc::POLLIN,
                    revents: 0,
                });
                owners.push(idx);
            }
        }
        if fds.is_empty() {
            break;
        }

        // SAFETY: fds points to a live array of fds.len() pollfd entries
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(ProcError::Syscall(format!("poll failed: {}", err)));
        }

        for (pfd, idx) in fds.iter().zip(owners) {
            let Some(source) = sources[idx].as_mut() else {
                continue;
            };
            if pfd.revents & libc::POLLNVAL != 0 {
                source.open = false;
            } else if pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0 {
                source.pump()?;
            }
        }
    }

    let [output, error] = sources;
    Ok((
        output.map(|s| s.buf).unwrap_or_default(),
        error.map(|s| s.buf).unwrap_or_default(),
    ))
}
