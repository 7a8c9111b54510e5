use std::path::Path;

macro_rules! wrapper {
    ($($name:ident => $size:expr),*) => {
        $(
            #[derive(Debug, Clone)]
            struct $name([u8; $size]);

            impl Default for $name {
                fn default() -> Self {
                    Self([0; $size])
                }
            }

            impl std::ops::Deref for $name {
                type Target = [u8; $size];

                fn deref(&self) -> &Self::Target {
                    &self.0
                }
            }

            impl std::ops::DerefMut for $name {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.0
                }
            }
        )*
    };
}

pub mod bridge;
pub mod cli;
pub mod config;
pub mod display;
mod error;
mod font;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod machine;
pub mod memory;
pub mod scheduler;
pub mod timer;

pub use bridge::DisplayBridge;
pub use config::Config;
pub use error::{Error, Result};
pub use framebuffer::Framebuffer;
pub use instruction::Instruction;
pub use machine::Machine;
pub use scheduler::Scheduler;

/// Reads a program image from disk without loading it.
pub fn read_program(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| Error::Load {
        path: path.to_path_buf(),
        source,
    })
}

mod bits {
    pub const fn set(n: u8, bits: u8) -> bool {
        (bits & (1 << n)) != 0
    }

    pub const fn high_nibble(byte: u8) -> u8 {
        (byte & 0xF0) >> 4
    }

    pub const fn low_nibble(byte: u8) -> u8 {
        byte & 0xF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits() {
        assert!(bits::set(7, 0x80));
        assert!(!bits::set(0, 0x80));
        assert_eq!(bits::high_nibble(0xD3), 0xD);
        assert_eq!(bits::low_nibble(0xD3), 0x3);
    }

    #[test]
    fn missing_program_is_a_load_error() {
        let err = read_program("/nonexistent/definitely-not-a.rom").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
