//! The `hal` module is the hardware abstraction layer kernels are executed through.
//!
//! ## Key Components
//! 1. **Kernels** (`cpu`): strided copies, permutations, reversal, tiling, padding,
//!    reductions and element-wise arithmetic over flat spans, generic over the element type.
//! 2. **Operations** (`ops`): zero-sized markers selecting what an element-wise kernel computes.
//! 3. **Host buffers** (`view`, `dispatch`): typed buffers with a shape, and kernel selection
//!    from a runtime element type tag.
//! 4. **Executable formats** (`format`): four-character codes naming executable payloads.

pub mod cpu;
pub mod dispatch;
pub mod format;
pub mod ops;
pub mod view;
