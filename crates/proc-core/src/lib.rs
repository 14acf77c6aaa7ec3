//! proc-core: shared types for proc-rs
//!
//! This crate provides the foundational pieces used by the execution crate
//! and the command-line front end:
//! - Error types and Result alias
//! - The `Associative` lookup trait and the `Environment` mapping
//! - Program lookup along `PATH`
//! - Runtime capability detection

pub mod associative;
pub mod capabilities;
pub mod env;
pub mod error;
pub mod util;

pub use associative::Associative;
pub use env::Environment;
pub use error::{ProcError, Result};
