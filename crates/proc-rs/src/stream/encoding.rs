//! Text decoding settings for pipe objects

use std::fmt;
use std::io;
use std::str::FromStr;

use proc_core::{ProcError, Result};

/// Character encoding applied to text read from or written to pipes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "iso-8859-1",
            Encoding::Ascii => "ascii",
        }
    }

    pub fn decode(&self, bytes: Vec<u8>) -> io::Result<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
            Encoding::Ascii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("non-ascii byte 0x{:02x} at offset {}", bytes[pos], pos),
                    ));
                }
                // ASCII is a subset of UTF-8
                String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            }
        }
    }

    pub fn encode(&self, text: &str) -> io::Result<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("character {:?} is not representable in latin-1", c),
                        )
                    })
                })
                .collect(),
            Encoding::Ascii => {
                if let Some(c) = text.chars().find(|c| !c.is_ascii()) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("character {:?} is not representable in ascii", c),
                    ));
                }
                Ok(text.as_bytes().to_vec())
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = ProcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso_8859-1" => Ok(Encoding::Latin1),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            other => Err(ProcError::Config(format!("Unknown encoding: {}", other))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a pipe turns bytes into text.
///
/// `encoding` is ignored when `binary` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMode {
    pub encoding: Encoding,
    pub binary: bool,
    pub chomp: bool,
    pub newline: String,
}

impl Default for TextMode {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            binary: false,
            chomp: true,
            newline: "\n".to_string(),
        }
    }
}

impl TextMode {
    pub fn validate(&self) -> Result<()> {
        if self.newline.is_empty() {
            return Err(ProcError::Config(
                "Line terminator cannot be empty".to_string(),
            ));
        }
        if !self.binary {
            self.encoding.encode(&self.newline).map_err(|e| {
                ProcError::Config(format!("Line terminator cannot be encoded: {}", e))
            })?;
        }
        Ok(())
    }

    /// Line terminator as raw bytes
    pub fn newline_bytes(&self) -> Vec<u8> {
        if self.binary {
            return self.newline.as_bytes().to_vec();
        }
        self.encoding
            .encode(&self.newline)
            .unwrap_or_else(|_| self.newline.as_bytes().to_vec())
    }

    /// Split decoded text into lines the way a pipe's `get` would
    pub fn split_lines(&self, text: &str) -> Vec<String> {
        text.split_inclusive(self.newline.as_str())
            .map(|line| match line.strip_suffix(self.newline.as_str()) {
                Some(chomped) if self.chomp => chomped.to_string(),
                _ => line.to_string(),
            })
            .collect()
    }

    pub(crate) fn require_text(&self, operation: &str) -> Result<()> {
        if self.binary {
            return Err(ProcError::Usage(format!(
                "{} is not available on a binary pipe",
                operation
            )));
        }
        Ok(())
    }

    pub(crate) fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        self.require_text("text decoding")?;
        Ok(self.encoding.decode(bytes)?)
    }

    pub(crate) fn encode(&self, text: &str) -> Result<Vec<u8>> {
        self.require_text("text encoding")?;
        Ok(self.encoding.encode(text)?)
    }
}
