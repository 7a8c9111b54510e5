//! Decoding of instruction words into [`Instruction`]s.

use crate::bits;
use std::fmt;

/// The fields every instruction word is cut into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Fields {
    pub fn new(b0: u8, b1: u8) -> Self {
        Self {
            op: bits::high_nibble(b0),
            x: bits::low_nibble(b0),
            y: bits::high_nibble(b1),
            n: bits::low_nibble(b1),
            nn: b1,
            nnn: u16::from_be_bytes([bits::low_nibble(b0), b1]),
        }
    }
}

impl From<u16> for Fields {
    fn from(word: u16) -> Self {
        let [b0, b1] = word.to_be_bytes();
        Self::new(b0, b1)
    }
}

/// One decoded instruction. `x` and `y` are register indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `00E0`
    Clear,
    /// `00EE`
    Return,
    /// `1nnn`
    Jump(u16),
    /// `2nnn`
    Call(u16),
    /// `3xnn`
    SkipIfEqual { x: u8, nn: u8 },
    /// `4xnn`
    SkipIfNotEqual { x: u8, nn: u8 },
    /// `5xy0`
    SkipIfRegistersEqual { x: u8, y: u8 },
    /// `6xnn`
    Set { x: u8, nn: u8 },
    /// `7xnn`
    Add { x: u8, nn: u8 },
    /// `8xy0`
    Move { x: u8, y: u8 },
    /// `8xy1`
    Or { x: u8, y: u8 },
    /// `8xy2`
    And { x: u8, y: u8 },
    /// `8xy3`
    Xor { x: u8, y: u8 },
    /// `8xy4`
    AddRegisters { x: u8, y: u8 },
    /// `8xy5`
    Subtract { x: u8, y: u8 },
    /// `8xy6`
    ShiftRight { x: u8 },
    /// `8xy7`
    SubtractFrom { x: u8, y: u8 },
    /// `8xyE`
    ShiftLeft { x: u8 },
    /// `9xy0`
    SkipIfRegistersNotEqual { x: u8, y: u8 },
    /// `Annn`
    SetIndex(u16),
    /// `Bnnn`
    JumpOffset(u16),
    /// `Cxnn`
    Random { x: u8, nn: u8 },
    /// `Dxyn`
    Draw { x: u8, y: u8, n: u8 },
    /// `Ex9E`
    SkipIfKeyDown { x: u8 },
    /// `ExA1`
    SkipIfKeyUp { x: u8 },
    /// `Fx07`
    ReadDelay { x: u8 },
    /// `Fx0A`
    WaitKey { x: u8 },
    /// `Fx15`
    SetDelay { x: u8 },
    /// `Fx18`
    SetSound { x: u8 },
    /// `Fx1E`
    AddIndex { x: u8 },
    /// `Fx29`
    Glyph { x: u8 },
    /// `Fx33`
    Bcd { x: u8 },
    /// `Fx55`
    StoreRegisters { x: u8 },
    /// `Fx65`
    LoadRegisters { x: u8 },
}

/// An instruction word with no meaning in the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode(pub u16);

impl TryFrom<u16> for Instruction {
    type Error = UnknownOpcode;

    fn try_from(word: u16) -> Result<Self, Self::Error> {
        use Instruction::*;

        let Fields {
            op,
            x,
            y,
            n,
            nn,
            nnn,
        } = Fields::from(word);
        let inst = match op {
            0x0 => match nn {
                0xE0 => Clear,
                0xEE => Return,
                _ => return Err(UnknownOpcode(word)),
            },
            0x1 => Jump(nnn),
            0x2 => Call(nnn),
            0x3 => SkipIfEqual { x, nn },
            0x4 => SkipIfNotEqual { x, nn },
            0x5 => SkipIfRegistersEqual { x, y },
            0x6 => Set { x, nn },
            0x7 => Add { x, nn },
            0x8 => match n {
                0x0 => Move { x, y },
                0x1 => Or { x, y },
                0x2 => And { x, y },
                0x3 => Xor { x, y },
                0x4 => AddRegisters { x, y },
                0x5 => Subtract { x, y },
                0x6 => ShiftRight { x },
                0x7 => SubtractFrom { x, y },
                0xE => ShiftLeft { x },
                _ => return Err(UnknownOpcode(word)),
            },
            0x9 => SkipIfRegistersNotEqual { x, y },
            0xA => SetIndex(nnn),
            0xB => JumpOffset(nnn),
            0xC => Random { x, nn },
            0xD => Draw { x, y, n },
            0xE => match nn {
                0x9E => SkipIfKeyDown { x },
                0xA1 => SkipIfKeyUp { x },
                _ => return Err(UnknownOpcode(word)),
            },
            _ => match nn {
                0x07 => ReadDelay { x },
                0x0A => WaitKey { x },
                0x15 => SetDelay { x },
                0x18 => SetSound { x },
                0x1E => AddIndex { x },
                0x29 => Glyph { x },
                0x33 => Bcd { x },
                0x55 => StoreRegisters { x },
                0x65 => LoadRegisters { x },
                _ => return Err(UnknownOpcode(word)),
            },
        };
        Ok(inst)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Clear => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump(nnn) => write!(f, "JP {nnn:#05X}"),
            Call(nnn) => write!(f, "CALL {nnn:#05X}"),
            SkipIfEqual { x, nn } => write!(f, "SE V{x:X}, {nn:#04X}"),
            SkipIfNotEqual { x, nn } => write!(f, "SNE V{x:X}, {nn:#04X}"),
            SkipIfRegistersEqual { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Set { x, nn } => write!(f, "LD V{x:X}, {nn:#04X}"),
            Add { x, nn } => write!(f, "ADD V{x:X}, {nn:#04X}"),
            Move { x, y } => write!(f, "LD V{x:X}, V{y:X}"),
            Or { x, y } => write!(f, "OR V{x:X}, V{y:X}"),
            And { x, y } => write!(f, "AND V{x:X}, V{y:X}"),
            Xor { x, y } => write!(f, "XOR V{x:X}, V{y:X}"),
            AddRegisters { x, y } => write!(f, "ADD V{x:X}, V{y:X}"),
            Subtract { x, y } => write!(f, "SUB V{x:X}, V{y:X}"),
            ShiftRight { x } => write!(f, "SHR V{x:X}"),
            SubtractFrom { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            ShiftLeft { x } => write!(f, "SHL V{x:X}"),
            SkipIfRegistersNotEqual { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            SetIndex(nnn) => write!(f, "LD I, {nnn:#05X}"),
            JumpOffset(nnn) => write!(f, "JP V0, {nnn:#05X}"),
            Random { x, nn } => write!(f, "RND V{x:X}, {nn:#04X}"),
            Draw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            SkipIfKeyDown { x } => write!(f, "SKP V{x:X}"),
            SkipIfKeyUp { x } => write!(f, "SKNP V{x:X}"),
            ReadDelay { x } => write!(f, "LD V{x:X}, DT"),
            WaitKey { x } => write!(f, "LD V{x:X}, K"),
            SetDelay { x } => write!(f, "LD DT, V{x:X}"),
            SetSound { x } => write!(f, "LD ST, V{x:X}"),
            AddIndex { x } => write!(f, "ADD I, V{x:X}"),
            Glyph { x } => write!(f, "LD F, V{x:X}"),
            Bcd { x } => write!(f, "LD B, V{x:X}"),
            StoreRegisters { x } => write!(f, "LD [I], V{x:X}"),
            LoadRegisters { x } => write!(f, "LD V{x:X}, [I]"),
        }
    }
}
