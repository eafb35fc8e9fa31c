//! Host game data structures.
//!
//! - Spatial value types (`Vector`, `RotMatrix`) with the arithmetic scripts use
//! - `#[repr(C)]` layouts of every record kept in the host's static arrays

mod records;
mod vector;

pub use records::*;
pub use vector::*;
