//! The `loom` module provides the value types every other part of the runtime is woven from.
//!
//! ## Key Components
//! 1. **Numerical System**:
//!    - Element types (`i8` to `i64`, `u8` to `u64`, `f16`, `f32`, `f64`) behind the sealed
//!      `Scalar` trait.
//!    - Data type tags (`DataType`) for runtime element representation.
//!    - Capability traits (`Arithmetic`, `Integer`, `Float`, `Cast`) kernels are generic over.
//!
//! 2. **Shapes**:
//!    - Immutable `Shape` values describing how a flat span maps to an N-dimensional array.
//!    - Inline, allocation-free `Dims` for per-dimension indices and strides.

pub mod num;
pub mod shape;
