//! Caller-side ends of captured streams

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::fd::OwnedFd;
use std::sync::Arc;

use proc_core::{ProcError, Result};

use crate::execution::exit::{ExitInfo, ExitState};
use crate::stream::directive::{Direction, StreamDirective, StreamHandle, StreamKind};
use crate::stream::encoding::TextMode;

/// Readable end of a captured output or error stream.
///
/// Reading to end of stream reaps the process, so the exit code is
/// available on the result handle afterwards.
#[derive(Debug)]
pub struct OutputPipe {
    kind: StreamKind,
    reader: BufReader<File>,
    text: TextMode,
    exit: Arc<ExitState>,
    newline: Vec<u8>,
    eof: bool,
}

impl OutputPipe {
    pub(crate) fn new(kind: StreamKind, fd: OwnedFd, text: TextMode, exit: Arc<ExitState>) -> Self {
        let newline = text.newline_bytes();
        Self {
            kind,
            reader: BufReader::new(File::from(fd)),
            text,
            exit,
            newline,
            eof: false,
        }
    }

    /// Which stream of the child this pipe carries
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn is_binary(&self) -> bool {
        self.text.binary
    }

    fn reached_eof(&mut self) -> io::Result<()> {
        if self.eof {
            return Ok(());
        }
        self.eof = true;
        self.exit
            .wait()
            .map(|_| ())
            .map_err(|e| io::Error::other(e.to_string()))
    }

    /// Read everything that is left as raw bytes
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        self.reached_eof()?;
        Ok(buf)
    }

    /// Read everything that is left as text
    pub fn slurp(&mut self) -> Result<String> {
        self.text.require_text("slurp")?;
        let bytes = self.read_bytes()?;
        self.text.decode(bytes)
    }

    /// Read one line; `None` at end of stream
    pub fn get(&mut self) -> Result<Option<String>> {
        self.text.require_text("get")?;
        let last = *self
            .newline
            .last()
            .ok_or_else(|| ProcError::Config("Line terminator cannot be empty".to_string()))?;

        let mut line = Vec::new();
        loop {
            let n = self.reader.read_until(last, &mut line)?;
            if n == 0 || line.ends_with(&self.newline) {
                break;
            }
        }

        if line.is_empty() {
            self.reached_eof()?;
            return Ok(None);
        }
        if self.text.chomp && line.ends_with(&self.newline) {
            line.truncate(line.len() - self.newline.len());
        }
        self.text.decode(line).map(Some)
    }

    /// Iterate over the remaining lines
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { pipe: self }
    }

    /// Close the pipe and wait for the process to exit
    pub fn close(self) -> Result<ExitInfo> {
        let exit = Arc::clone(&self.exit);
        drop(self);
        exit.wait()
    }

    /// Hand the descriptor to another process, e.g. as its input.
    ///
    /// Fails if data has already been buffered on this side.
    pub fn into_handle(self) -> Result<StreamHandle> {
        if !self.reader.buffer().is_empty() {
            return Err(ProcError::Usage(format!(
                "{} pipe has buffered data and cannot be handed over",
                self.kind.name()
            )));
        }
        let file = self.reader.into_inner();
        Ok(StreamHandle::with_direction(OwnedFd::from(file), Direction::Read))
    }

    /// Split into already buffered bytes and the underlying file
    pub(crate) fn into_parts(self) -> (Vec<u8>, File) {
        let buffered = self.reader.buffer().to_vec();
        (buffered, self.reader.into_inner())
    }
}

impl Read for OutputPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.reached_eof()?;
        }
        Ok(n)
    }
}

impl TryFrom<OutputPipe> for StreamDirective {
    type Error = ProcError;

    fn try_from(pipe: OutputPipe) -> Result<Self> {
        Ok(StreamDirective::Handle(pipe.into_handle()?))
    }
}

/// Iterator over the lines of an [`OutputPipe`]
pub struct Lines<'a> {
    pipe: &'a mut OutputPipe,
}

impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pipe.get().transpose()
    }
}

/// Writable end of a captured input stream.
///
/// The child sees end of stream once this is closed or dropped.
#[derive(Debug)]
pub struct InputPipe {
    writer: File,
    text: TextMode,
}

impl InputPipe {
    pub(crate) fn new(fd: OwnedFd, text: TextMode) -> Self {
        Self {
            writer: File::from(fd),
            text,
        }
    }

    /// Write text in the configured encoding
    pub fn print(&mut self, text: &str) -> Result<()> {
        let bytes = self.text.encode(text)?;
        self.writer.write_all(&bytes)?;
        Ok(())
    }

    /// Write text followed by the line terminator
    pub fn say(&mut self, text: &str) -> Result<()> {
        self.text.require_text("say")?;
        let mut line = String::with_capacity(text.len() + self.text.newline.len());
        line.push_str(text);
        line.push_str(&self.text.newline);
        self.print(&line)
    }

    /// Close the pipe so the child sees end of stream
    pub fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }

    pub fn into_handle(self) -> StreamHandle {
        StreamHandle::with_direction(OwnedFd::from(self.writer), Direction::Write)
    }
}

impl Write for InputPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl From<InputPipe> for StreamDirective {
    fn from(pipe: InputPipe) -> Self {
        StreamDirective::Handle(pipe.into_handle())
    }
}
