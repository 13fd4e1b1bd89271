use super::{
    Chip8Error, DisplayBuffer, Instruction, Memory, Quirks, ROM_START_ADDRESS, RandomSource,
    TickResult, random,
};
use crate::u4;

/// Whether the processor is fetching instructions or parked on `FX0A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    /// Waiting for a non-zero key value, which will be stored in `register`.
    AwaitingKey { register: u4 },
}

/// CHIP-8 processor: program counter, timers and input state, driving
/// [`Memory`] and the [`DisplayBuffer`].
///
/// The processor owns no clock. Call [`tick`](Processor::tick) at the
/// instruction rate and [`timer_tick`](Processor::timer_tick) at 60Hz.
pub struct Processor {
    pub(crate) memory: Memory,
    pub(crate) display: DisplayBuffer,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Delay timer: decrements at 60Hz until it reaches 0
    pub(crate) delay_timer: u8,
    pub(crate) state: State,
    /// Key value supplied by the input collaborator, 0 meaning no key
    pub(crate) current_key: u8,
    /// The most recently fetched instruction
    pub(crate) current_instruction: Option<Instruction>,

    pub(crate) quirks: Quirks,
    pub(crate) rng: Box<dyn RandomSource>,
}

impl Processor {
    /// Creates a processor with legacy quirks and an OS-seeded random source.
    pub fn new(rom: &[u8]) -> Result<Self, Chip8Error> {
        Self::with_config(rom, Quirks::default(), random::os_seeded())
    }

    /// Initializes memory, installs the font and loads the program.
    pub fn with_config(
        rom: &[u8],
        quirks: Quirks,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self, Chip8Error> {
        let mut memory = Memory::new();
        memory.load_program(rom)?;

        Ok(Processor {
            memory,
            display: DisplayBuffer::new(),
            pc: ROM_START_ADDRESS as u16,
            delay_timer: 0,
            state: State::Running,
            current_key: 0,
            current_instruction: None,
            quirks,
            rng,
        })
    }

    /// Executes a single instruction tick.
    ///
    /// While awaiting a key, no instruction is fetched: the tick either
    /// stores a non-zero key value and resumes, or does nothing.
    pub fn tick(&mut self) -> Result<TickResult, Chip8Error> {
        if let State::AwaitingKey { register } = self.state {
            if self.current_key == 0 {
                return Ok(TickResult::AwaitingKey);
            }

            self.memory.v[register] = self.current_key;
            self.state = State::Running;
            log::debug!("key {:#04X} stored in V{:X}", self.current_key, register);
            return Ok(TickResult::KeyAccepted);
        }

        let word = self.fetch()?;
        let instruction = Instruction::decode(word);
        self.current_instruction = Some(instruction);
        log::trace!("{:#05X}: {:04X} {}", self.pc.wrapping_sub(2), word, instruction);

        self.execute(instruction)?;
        Ok(TickResult::Executed)
    }

    /// Decrements the delay timer. Should be called at 60Hz.
    ///
    /// The sound timer is not emulated, so there is nothing else to count down.
    pub fn timer_tick(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Sets the current key value (0x0 meaning no key pressed).
    pub fn set_key(&mut self, key: u8) {
        self.current_key = key;
    }

    /// Fetches the big-endian word at PC and advances PC past it.
    fn fetch(&mut self) -> Result<u16, Chip8Error> {
        let addr = self.pc as usize;
        let high = self.memory.read(addr)?;
        let low = self.memory.read(addr + 1)?;
        self.pc = self.pc.wrapping_add(2);

        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.memory.i()
    }

    pub fn registers(&self) -> &[u8; 16] {
        self.memory.registers()
    }

    pub fn stack(&self) -> &[u16] {
        self.memory.stack()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_awaiting_key(&self) -> bool {
        matches!(self.state, State::AwaitingKey { .. })
    }

    /// The instruction decoded by the last fetch, if any.
    pub fn current_instruction(&self) -> Option<Instruction> {
        self.current_instruction
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.display
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }
}
