//! Stream directives and their resolution into child-side bindings

use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};

use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use proc_core::{ProcError, Result};

/// One of the three standard streams of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Input,
    Output,
    Error,
}

impl StreamKind {
    /// File descriptor number inside the child
    pub fn target_fd(&self) -> RawFd {
        match self {
            StreamKind::Input => libc::STDIN_FILENO,
            StreamKind::Output => libc::STDOUT_FILENO,
            StreamKind::Error => libc::STDERR_FILENO,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamKind::Input => "input",
            StreamKind::Output => "output",
            StreamKind::Error => "error",
        }
    }

    /// The child reads from input and writes to output/error
    fn child_reads(&self) -> bool {
        matches!(self, StreamKind::Input)
    }
}

/// Access mode of an externally supplied descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
    ReadWrite,
}

impl Direction {
    pub fn readable(&self) -> bool {
        matches!(self, Direction::Read | Direction::ReadWrite)
    }

    pub fn writable(&self) -> bool {
        matches!(self, Direction::Write | Direction::ReadWrite)
    }

    /// Read the access mode from the descriptor's open flags
    pub fn detect(fd: &impl AsFd) -> Result<Self> {
        // SAFETY: F_GETFL only queries flags of a descriptor we borrow
        let flags = unsafe { libc::fcntl(fd.as_fd().as_raw_fd(), libc::F_GETFL) };
        if flags < 0 {
            return Err(ProcError::Config(format!(
                "stream handle is not an open descriptor: {}",
                std::io::Error::last_os_error()
            )));
        }
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => Ok(Direction::Read),
            libc::O_WRONLY => Ok(Direction::Write),
            _ => Ok(Direction::ReadWrite),
        }
    }
}

/// An open descriptor supplied by the caller for one of the child's streams
#[derive(Debug)]
pub struct StreamHandle {
    fd: OwnedFd,
    direction: Direction,
}

impl StreamHandle {
    /// Wrap a descriptor, detecting its direction
    pub fn new(fd: OwnedFd) -> Result<Self> {
        let direction = Direction::detect(&fd)?;
        Ok(Self { fd, direction })
    }

    /// Wrap a descriptor whose direction is already known
    pub fn with_direction(fd: OwnedFd, direction: Direction) -> Self {
        Self { fd, direction }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn into_fd(self) -> OwnedFd {
        self.fd
    }

    fn check_direction(&self, kind: StreamKind) -> Result<()> {
        let compatible = if kind.child_reads() {
            self.direction.readable()
        } else {
            self.direction.writable()
        };
        if compatible {
            return Ok(());
        }
        Err(ProcError::Config(format!(
            "{:?} handle cannot be used for the {} stream",
            self.direction,
            kind.name()
        )))
    }
}

impl TryFrom<File> for StreamHandle {
    type Error = ProcError;

    fn try_from(file: File) -> Result<Self> {
        StreamHandle::new(OwnedFd::from(file))
    }
}

/// What to do with one standard stream of the child
#[derive(Debug, Default)]
pub enum StreamDirective {
    /// Share the parent's stream
    #[default]
    Inherit,
    /// Connect the stream to a pipe exposed on the result handle
    Capture,
    /// Bind the stream to the null device
    Discard,
    /// Bind the stream to a caller-supplied descriptor
    Handle(StreamHandle),
}

impl StreamDirective {
    /// Bind to an open file, detecting its direction
    pub fn file(file: File) -> Result<Self> {
        Ok(StreamDirective::Handle(StreamHandle::try_from(file)?))
    }

    pub fn is_capture(&self) -> bool {
        matches!(self, StreamDirective::Capture)
    }
}

impl From<StreamHandle> for StreamDirective {
    fn from(handle: StreamHandle) -> Self {
        StreamDirective::Handle(handle)
    }
}

/// Execution-time binding for one stream
#[derive(Debug)]
pub enum ResolvedBinding {
    Inherit,
    Null(OwnedFd),
    Pipe { child: OwnedFd, parent: OwnedFd },
    Handle(OwnedFd),
}

impl ResolvedBinding {
    /// Descriptor to install in the child, if any
    pub(crate) fn child_fd(&self) -> Option<RawFd> {
        match self {
            ResolvedBinding::Inherit => None,
            ResolvedBinding::Null(fd) | ResolvedBinding::Handle(fd) => Some(fd.as_raw_fd()),
            ResolvedBinding::Pipe { child, .. } => Some(child.as_raw_fd()),
        }
    }

    /// Close the child side and keep the parent end of a pipe
    pub(crate) fn into_parent(self) -> Option<OwnedFd> {
        match self {
            ResolvedBinding::Pipe { parent, .. } => Some(parent),
            _ => None,
        }
    }
}

/// Where the child's error stream goes
#[derive(Debug)]
pub enum ErrorBinding {
    Own(ResolvedBinding),
    /// Same destination as the output stream
    Merged,
}

/// Resolved bindings for all three streams
#[derive(Debug)]
pub struct Bindings {
    pub input: ResolvedBinding,
    pub output: ResolvedBinding,
    pub error: ErrorBinding,
}

impl Bindings {
    pub(crate) fn error_captured(&self) -> bool {
        matches!(self.error, ErrorBinding::Own(ResolvedBinding::Pipe { .. }))
    }
}

/// Resolve a directive for `kind` into a concrete binding
pub fn resolve(directive: StreamDirective, kind: StreamKind) -> Result<ResolvedBinding> {
    match directive {
        StreamDirective::Inherit => Ok(ResolvedBinding::Inherit),
        StreamDirective::Discard => {
            let null = if kind.child_reads() {
                File::open("/dev/null")?
            } else {
                OpenOptions::new().write(true).open("/dev/null")?
            };
            Ok(ResolvedBinding::Null(OwnedFd::from(null)))
        }
        StreamDirective::Capture => {
            let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC)
                .map_err(|e| ProcError::Syscall(format!("pipe failed: {}", e)))?;
            let (child, parent) = if kind.child_reads() {
                (read_end, write_end)
            } else {
                (write_end, read_end)
            };
            Ok(ResolvedBinding::Pipe { child, parent })
        }
        StreamDirective::Handle(handle) => {
            handle.check_direction(kind)?;
            Ok(ResolvedBinding::Handle(handle.into_fd()))
        }
    }
}

/// Resolve all three directives; with `merge` the error directive is ignored
pub fn resolve_all(
    input: StreamDirective,
    output: StreamDirective,
    error: StreamDirective,
    merge: bool,
) -> Result<Bindings> {
    let input = resolve(input, StreamKind::Input)?;
    let output = resolve(output, StreamKind::Output)?;
    let error = if merge {
        ErrorBinding::Merged
    } else {
        ErrorBinding::Own(resolve(error, StreamKind::Error)?)
    };
    Ok(Bindings {
        input,
        output,
        error,
    })
}
