//! Execution substrate of a tensor program virtual machine.
//!
//! - [`module`] loads serialized VM modules, proving every reachable offset is in bounds before
//!   any field is read, and ties the lifetime of the backing bytes to the handle.
//! - [`hal`] holds the shape-directed CPU kernels the interpreter runs tensor operations with.
//! - [`fbs`] is the binary table format modules are stored in.
//! - [`loom`] defines element types and shapes.

pub mod error;
pub mod fbs;
pub mod hal;
pub mod loom;
pub mod module;

pub use error::{Error, ErrorKind};
