use super::{
    Chip8Error, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, MEMORY_SIZE, ROM_START_ADDRESS,
    STACK_DEPTH,
};

/// Address space, register file and call stack of the virtual machine.
pub struct Memory {
    /// 4KB memory array
    pub(crate) ram: [u8; MEMORY_SIZE],
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Address register
    pub(crate) i: u16,
    /// Return addresses for subroutine calls
    stack: Vec<u16>,
}

impl Memory {
    /// Creates an initialized memory image with the font installed.
    pub fn new() -> Self {
        let mut memory = Memory {
            ram: [0; MEMORY_SIZE],
            v: [0; 16],
            i: 0,
            stack: Vec::with_capacity(STACK_DEPTH),
        };
        memory.initialize();
        memory
    }

    /// Zero-fills the address space and installs the font glyphs at address 0.
    pub fn initialize(&mut self) {
        self.ram.fill(0);
        self.ram[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
    }

    /// Copies a program into memory starting at `0x200`.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.ram
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomTooLarge {
                size: rom.len(),
                max_size: MEMORY_SIZE - ROM_START_ADDRESS,
            })?
            .copy_from_slice(rom);

        log::debug!("loaded {} byte program at {:#05X}", rom.len(), ROM_START_ADDRESS);
        Ok(())
    }

    pub fn read(&self, addr: usize) -> Result<u8, Chip8Error> {
        self.ram
            .get(addr)
            .copied()
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), Chip8Error> {
        *self.byte_mut(addr)? = value;
        Ok(())
    }

    /// Helper to get a mutable reference to a memory location with bounds checking.
    fn byte_mut(&mut self, addr: usize) -> Result<&mut u8, Chip8Error> {
        self.ram
            .get_mut(addr)
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    pub fn push(&mut self, return_address: u16) -> Result<(), Chip8Error> {
        if self.stack.len() >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { depth: STACK_DEPTH });
        }
        self.stack.push(return_address);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        self.stack.pop().ok_or(Chip8Error::StackUnderflow)
    }

    pub fn ram(&self) -> &[u8; MEMORY_SIZE] {
        &self.ram
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
