use std::fmt;

use crate::u4;

/// A decoded 16-bit instruction word.
///
/// Every word decodes; the fields are plain bit slices of `word` and say
/// nothing about whether the instruction is one the processor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The raw instruction word.
    pub word: u16,
    /// Low 12 bits: an address.
    pub nnn: u16,
    /// Low 8 bits: an immediate byte.
    pub nn: u8,
    /// Low 4 bits.
    pub n: u4,
    /// Bits 8-11: a register index.
    pub x: u4,
    /// Bits 4-7: a register index.
    pub y: u4,
}

/// Top 4 bits of an instruction word, selecting the instruction family.
pub fn opcode_class(word: u16) -> u4 {
    u4::from_low_bits((word >> 12) as u8)
}

/// Instruction family selected by the opcode class nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeClass {
    /// 0NNN - clear screen or return
    ClearOrReturn,
    /// 1NNN
    Jump,
    /// 2NNN
    Call,
    /// 3XNN
    SkipIfEqualImm,
    /// 4XNN
    SkipIfNotEqualImm,
    /// 5XY0
    SkipIfEqualReg,
    /// 6XNN
    SetImm,
    /// 7XNN
    AddImm,
    /// 8XYN
    Arithmetic,
    /// 9XY0
    SkipIfNotEqualReg,
    /// ANNN
    SetIndex,
    /// BNNN
    JumpWithOffset,
    /// CXNN
    Random,
    /// DXYN
    Draw,
    /// EXNN
    SkipOnKey,
    /// FXNN
    Misc,
}

const OPCODE_CLASSES: [OpcodeClass; 16] = [
    OpcodeClass::ClearOrReturn,
    OpcodeClass::Jump,
    OpcodeClass::Call,
    OpcodeClass::SkipIfEqualImm,
    OpcodeClass::SkipIfNotEqualImm,
    OpcodeClass::SkipIfEqualReg,
    OpcodeClass::SetImm,
    OpcodeClass::AddImm,
    OpcodeClass::Arithmetic,
    OpcodeClass::SkipIfNotEqualReg,
    OpcodeClass::SetIndex,
    OpcodeClass::JumpWithOffset,
    OpcodeClass::Random,
    OpcodeClass::Draw,
    OpcodeClass::SkipOnKey,
    OpcodeClass::Misc,
];

impl From<u4> for OpcodeClass {
    fn from(class: u4) -> Self {
        OPCODE_CLASSES[class]
    }
}

impl Instruction {
    /// Decode a 16-bit raw instruction word into its operand fields.
    pub fn decode(word: u16) -> Self {
        Instruction {
            word,
            nnn: word & 0x0FFF,
            nn: (word & 0x00FF) as u8,
            n: u4::from_low_bits(word as u8),
            x: u4::from_low_bits((word >> 8) as u8),
            y: u4::from_low_bits((word >> 4) as u8),
        }
    }

    pub fn class(&self) -> u4 {
        opcode_class(self.word)
    }

    pub fn opcode_class(&self) -> OpcodeClass {
        OpcodeClass::from(self.class())
    }
}

impl fmt::Display for Instruction {
    /// Formats the instruction as an assembly mnemonic, as this machine interprets it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Instruction { word, nnn, nn, n, x, y } = *self;

        match (self.class().get(), n.get(), nn) {
            (0x0, 0x0, _) => write!(f, "CLS"),
            (0x0, 0xE, _) => write!(f, "RET"),
            (0x1, _, _) => write!(f, "JP {nnn:#05X}"),
            (0x2, _, _) => write!(f, "CALL {nnn:#05X}"),
            (0x3, _, _) => write!(f, "SE V{x:X}, {nn:#04X}"),
            (0x4, _, _) => write!(f, "SNE V{x:X}, {nn:#04X}"),
            (0x5, _, _) => write!(f, "SE V{x:X}, V{y:X}"),
            (0x6, _, _) => write!(f, "LD V{x:X}, {nn:#04X}"),
            (0x7, _, _) => write!(f, "ADD V{x:X}, {nn:#04X}"),
            (0x8, 0x0, _) => write!(f, "LD V{x:X}, V{y:X}"),
            (0x8, 0x1, _) => write!(f, "OR V{x:X}, V{y:X}"),
            (0x8, 0x2, _) => write!(f, "AND V{x:X}, V{y:X}"),
            (0x8, 0x3, _) => write!(f, "XOR V{x:X}, V{y:X}"),
            (0x8, 0x4, _) => write!(f, "ADD V{x:X}, V{y:X}"),
            (0x8, 0x5, _) => write!(f, "SUB V{x:X}, V{y:X}"),
            (0x8, 0x6, _) => write!(f, "SHR V{x:X}"),
            (0x8, 0x7, _) => write!(f, "SUBN V{x:X}, V{y:X}"),
            (0x8, 0xE, _) => write!(f, "SHL V{x:X}"),
            (0x9, _, _) => write!(f, "SNE V{x:X}, V{y:X}"),
            (0xA, _, _) => write!(f, "LD I, {nnn:#05X}"),
            (0xB, _, _) => write!(f, "JP V0, {nnn:#05X}"),
            (0xC, _, _) => write!(f, "RND V{x:X}, {nn:#04X}"),
            (0xD, _, _) => write!(f, "DRW V{x:X}, V{y:X}, {n:X}"),
            (0xE, _, 0x9E) => write!(f, "SKP V{x:X}"),
            (0xE, _, 0xA1) => write!(f, "SKNP V{x:X}"),
            (0xF, _, 0x07) => write!(f, "LD V{x:X}, DT"),
            (0xF, _, 0x0A) => write!(f, "LD V{x:X}, K"),
            (0xF, _, 0x15) => write!(f, "LD DT, V{x:X}"),
            (0xF, _, 0x18) => write!(f, "LD ST, V{x:X}"),
            (0xF, _, 0x1E) => write!(f, "ADD I, V{x:X}"),
            (0xF, _, 0x29) => write!(f, "LD F, V{x:X}"),
            (0xF, _, 0x33) => write!(f, "LD B, V{x:X}"),
            (0xF, _, 0x55) => write!(f, "LD [I], V{x:X}"),
            (0xF, _, 0x65) => write!(f, "LD V{x:X}, [I]"),
            _ => write!(f, "DW {word:#06X}"),
        }
    }
}
