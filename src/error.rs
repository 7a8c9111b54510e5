use std::{io, path::PathBuf};

/// Everything that can stop the machine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("address {address:#06X} is outside the 4K address space")]
    OutOfBounds { address: usize },
    #[error("unknown instruction {opcode:04X} at {address:#05X}")]
    UnknownInstruction { opcode: u16, address: u16 },
    #[error("failed to read program image {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("program image is {size} bytes but only {capacity} fit above the origin")]
    ProgramTooLarge { size: usize, capacity: usize },
    #[error("failed to initialize machine: {0}")]
    Initialization(String),
    #[error("call stack overflow at depth {depth}")]
    StackOverflow { depth: usize },
    #[error("return with an empty call stack at {address:#05X}")]
    StackUnderflow { address: u16 },
    #[error("key {0:#X} is not on the 16-key pad")]
    InvalidKey(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
