mod display;
mod execute;
mod font;
mod memory;
mod opcode;
mod processor;
mod quirks;
pub mod random;
mod runner;
mod types;

pub use display::*;
pub use font::*;
pub use memory::*;
pub use opcode::*;
pub use processor::*;
pub use quirks::*;
pub use random::RandomSource;
pub use runner::*;
pub use types::*;
