//! The 4K address space.
//!
//! Layout:
//!
//! ```text
//! 0x000-0x04F  glyph table
//! 0x050-0x1FF  unused
//! 0x200-0xF9F  program image
//! 0xFA0-0xFFF  call stack (grows upward, 2 bytes per frame)
//! ```
//!
//! Programs may freely read and write anywhere; the regions are only where
//! the machine itself puts things.

use crate::error::{Error, Result};
use crate::font;
use log::info;

/// Total addressable bytes.
pub const SIZE: usize = 4096;
/// Where program images are loaded and execution begins.
pub const PROGRAM_ORIGIN: u16 = 0x200;
/// Bottom of the call stack. The stack pointer sits here when empty.
pub const STACK_BASE: u16 = 0xFA0;
/// Number of return addresses the stack region can hold.
pub const STACK_CAPACITY: usize = (SIZE - STACK_BASE as usize) / 2 - 1;

wrapper! {
    Memory => SIZE
}

/// Bounds-checked byte storage. Every access resolves its address first.
#[derive(Debug, Clone, Default)]
pub struct AddressSpace {
    bytes: Memory,
}

impl AddressSpace {
    pub fn new() -> Self {
        Default::default()
    }

    /// Largest program image that fits above the origin.
    pub const fn program_capacity() -> usize {
        SIZE - PROGRAM_ORIGIN as usize
    }

    /// Checks `offset` against the address space.
    pub fn resolve(offset: usize) -> Result<usize> {
        if offset < SIZE {
            Ok(offset)
        } else {
            Err(Error::OutOfBounds { address: offset })
        }
    }

    /// Zeroes everything, installs the glyph table and copies `program` to the origin.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > Self::program_capacity() {
            return Err(Error::ProgramTooLarge {
                size: program.len(),
                capacity: Self::program_capacity(),
            });
        }
        self.bytes = Memory::default();
        self.bytes[font::MEMORY_RANGE].copy_from_slice(font::FONT);
        let origin = PROGRAM_ORIGIN as usize;
        self.bytes[origin..origin + program.len()].copy_from_slice(program);
        info!("Loaded program image [size: {}]", program.len());
        Ok(())
    }

    pub fn read(&self, address: usize) -> Result<u8> {
        Ok(self.bytes[Self::resolve(address)?])
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<()> {
        self.bytes[Self::resolve(address)?] = value;
        Ok(())
    }

    /// Reads a big-endian word from `address` and `address + 1`.
    pub fn read_word(&self, address: usize) -> Result<u16> {
        Ok(u16::from_be_bytes([
            self.read(address)?,
            self.read(address + 1)?,
        ]))
    }

    pub fn write_word(&mut self, address: usize, value: u16) -> Result<()> {
        let [high, low] = value.to_be_bytes();
        // Check both ends before touching either byte.
        Self::resolve(address + 1)?;
        self.write(address, high)?;
        self.write(address + 1, low)
    }

    /// A checked view of `len` bytes starting at `address`.
    pub fn slice(&self, address: usize, len: usize) -> Result<&[u8]> {
        if len > 0 {
            Self::resolve(address + len - 1)?;
        }
        Self::resolve(address)?;
        Ok(&self.bytes[address..address + len])
    }

    pub fn slice_mut(&mut self, address: usize, len: usize) -> Result<&mut [u8]> {
        if len > 0 {
            Self::resolve(address + len - 1)?;
        }
        Self::resolve(address)?;
        Ok(&mut self.bytes[address..address + len])
    }

    /// The whole address space.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }
}
