//! A CHIP-8 virtual machine.
//!
//! The [`emu`] module holds the interpreter engine: memory, opcode decoding,
//! the processor state machine and the display buffer. Clocks, input mapping
//! and rendering are left to the caller; see [`emu::Runner`] for a helper that
//! drives the instruction and timer cadences from wall-clock deltas.

pub mod emu;
mod nibble;

pub use nibble::u4;
