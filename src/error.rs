// Error types for the address space, ROM loading and DMA

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::bus::BusOwner;

pub type Result<T> = std::result::Result<T, Error>;

/// Fault raised by the address decoder.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccessFault {
    #[error("address {address:#06X} is not mapped to any region")]
    UnmappedAddress { address: u16 },

    #[error("address {address:#06X} is write protected")]
    WriteProtected { address: u16 },
}

impl AccessFault {
    pub fn address(&self) -> u16 {
        match *self {
            AccessFault::UnmappedAddress { address } => address,
            AccessFault::WriteProtected { address } => address,
        }
    }
}

/// Error returned to the CPU side when it touches memory through the arbiter.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("bus is owned by {owner}")]
    BusBusy { owner: BusOwner },

    #[error(transparent)]
    Access(#[from] AccessFault),
}

#[derive(Debug, Error)]
pub enum RomError {
    #[error("unable to open ROM image {path:?}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read ROM image: {0}")]
    Io(#[from] io::Error),

    #[error("ROM image has {actual} bytes, at most {max} fit in the destination region")]
    TooLarge { actual: u64, max: u64 },

    #[error("invalid bit character {char:?} at offset {offset}")]
    MalformedBit { offset: usize, char: char },

    #[error("ROM image ends with {count} bits that do not form a full byte")]
    TrailingBits { count: usize },

    #[error("no region named {0:?} in the layout")]
    UnknownRegion(String),

    #[error(transparent)]
    Access(#[from] AccessFault),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DmaError {
    #[error("transfer of {length} bytes from {start:#06X} runs past the end of the address space")]
    OutOfRange { start: u16, length: u16 },

    #[error("DMA controller is busy with another transfer")]
    NotIdle,

    #[error("transfer aborted at {at_address:#06X} with {remaining} bytes left: {cause}")]
    Aborted {
        at_address: u16,
        remaining: u16,
        cause: AccessFault,
    },
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("region {name:?} has base {base:#06X} above its limit {limit:#06X}")]
    EmptyRegion { name: String, base: u16, limit: u16 },

    #[error("regions {first:?} and {second:?} overlap")]
    Overlap { first: String, second: String },

    #[error("region name {0:?} is used more than once")]
    DuplicateName(String),

    #[error("invalid layout description: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate level error used by the machine builder.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Access(#[from] AccessFault),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Rom(#[from] RomError),

    #[error(transparent)]
    Dma(#[from] DmaError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("layout has no {0} region")]
    MissingRegion(&'static str),
}
