//! Re-exporting the register access macros
//!
//! Frames are not memory-mapped registers, but their fields are described
//! the same way: a module per field with `offset` and `mask` constants.
//! The `ral-registers` macros then handle shifting and masking for us.

pub use ral_registers::{modify_reg, read_reg, write_reg};
