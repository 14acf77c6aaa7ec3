//! Stream layer: directives, bindings and pipe objects
//!
//! Each of the child's standard streams is chosen independently:
//!
//! - **Inherit**: share the parent's stream
//! - **Capture**: pipe exposed on the result handle
//! - **Discard**: null device
//! - **Handle**: caller-supplied descriptor, including another process's pipe

pub(crate) mod collect;
pub mod directive;
pub mod encoding;
pub mod pipe;

pub use directive::{
    Bindings, Direction, ErrorBinding, ResolvedBinding, StreamDirective, StreamHandle, StreamKind,
    resolve, resolve_all,
};
pub use encoding::{Encoding, TextMode};
pub use pipe::{InputPipe, Lines, OutputPipe};
