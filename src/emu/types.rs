// The constants are specified by the CHIP-8 specification
pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;
pub const STACK_DEPTH: usize = 16;

/// A type alias for a grid the size of the CHIP-8 display.
pub type Grid<T> = [[T; DISPLAY_X]; DISPLAY_Y];

/// Outcome of a single instruction tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// An instruction was fetched and executed.
    Executed,
    /// A pending `FX0A` received its key; no instruction was fetched.
    KeyAccepted,
    /// Still waiting for a key press; no instruction was fetched.
    AwaitingKey,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Stack overflow: call nesting exceeded {depth} levels")]
    StackOverflow { depth: usize },
}
