// ROM images are text files holding one ASCII '0' or '1' per bit, most
// significant bit first, eight characters per byte and no separators.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::RomError,
    memory::AddressSpace,
    region::{RegionId, RegionKind},
};

pub const BITS_PER_BYTE: usize = 8;

/// What to do with characters left over after the last full byte.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrailingBits {
    /// Drop them, only complete bytes reach memory.
    #[default]
    Discard,
    /// Fail with [`RomError::TrailingBits`].
    Reject,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
enum Destination {
    #[default]
    ProgramRom,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomSummary {
    pub region: String,
    pub bytes_written: usize,
    pub discarded_bits: usize,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone)]
pub struct RomLoader {
    destination: Destination,
    trailing: TrailingBits,
}

impl RomLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads into the region called `name` instead of the program ROM.
    pub fn into_region(mut self, name: &str) -> Self {
        self.destination = Destination::Named(name.to_string());
        self
    }

    pub fn trailing_bits(mut self, policy: TrailingBits) -> Self {
        self.trailing = policy;
        self
    }

    pub fn load<P: AsRef<Path>>(&self, space: &mut AddressSpace, path: P) -> Result<RomSummary, RomError> {
        let path = path.as_ref();
        let id = self.destination(space)?;
        let max = space.regions().entry(id).capacity() as u64;

        let bits = {
            let mut file = File::open(path).map_err(|source| RomError::NotFound {
                path: path.to_path_buf(),
                source,
            })?;

            let actual = file.metadata()?.len();
            if actual > max {
                return Err(RomError::TooLarge { actual, max });
            }

            let mut bits = Vec::with_capacity(actual as usize);
            file.read_to_end(&mut bits)?;
            bits
        };

        let mut summary = self.write_image(space, id, &bits)?;
        summary.path = Some(path.to_path_buf());
        tracing::info!(
            "Loaded ROM {:?}: {} bytes into {}",
            path,
            summary.bytes_written,
            summary.region
        );
        Ok(summary)
    }

    /// Same as [`RomLoader::load`] for an image already in memory.
    pub fn load_bits(&self, space: &mut AddressSpace, bits: &[u8]) -> Result<RomSummary, RomError> {
        let id = self.destination(space)?;
        let max = space.regions().entry(id).capacity() as u64;
        if bits.len() as u64 > max {
            return Err(RomError::TooLarge {
                actual: bits.len() as u64,
                max,
            });
        }

        let summary = self.write_image(space, id, bits)?;
        tracing::info!(
            "Loaded ROM image: {} bytes into {}",
            summary.bytes_written,
            summary.region
        );
        Ok(summary)
    }

    fn destination(&self, space: &AddressSpace) -> Result<RegionId, RomError> {
        match &self.destination {
            Destination::ProgramRom => space
                .regions()
                .first_of_kind(RegionKind::Rom)
                .ok_or_else(|| RomError::UnknownRegion("program ROM".to_string())),
            Destination::Named(name) => space
                .regions()
                .by_name(name)
                .ok_or_else(|| RomError::UnknownRegion(name.clone())),
        }
    }

    fn write_image(&self, space: &mut AddressSpace, id: RegionId, bits: &[u8]) -> Result<RomSummary, RomError> {
        let (bytes, trailing) = pack_bits(bits)?;

        if trailing > 0 {
            match self.trailing {
                TrailingBits::Discard => tracing::warn!(
                    "ROM image length {} is not a multiple of {}, discarding the last {} bits",
                    bits.len(),
                    BITS_PER_BYTE,
                    trailing
                ),
                TrailingBits::Reject => return Err(RomError::TrailingBits { count: trailing }),
            }
        }

        for (k, byte) in bytes.iter().enumerate() {
            space.load(id, k, *byte)?;
        }

        Ok(RomSummary {
            region: space.regions().entry(id).name.clone(),
            bytes_written: bytes.len(),
            discarded_bits: trailing,
            path: None,
        })
    }
}

/// Packs an ASCII bit stream into bytes, MSB first.
///
/// Returns the packed bytes and the number of characters after the last
/// complete group of eight. Every character is validated, including the
/// trailing ones.
pub fn pack_bits(bits: &[u8]) -> Result<(Vec<u8>, usize), RomError> {
    if let Some(offset) = bits.iter().position(|&c| c != b'0' && c != b'1') {
        return Err(RomError::MalformedBit {
            offset,
            char: bits[offset] as char,
        });
    }

    let chunks = bits.chunks_exact(BITS_PER_BYTE);
    let trailing = chunks.remainder().len();
    let bytes = chunks
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |byte, (j, c)| byte | ((c - b'0') << (7 - j)))
        })
        .collect();

    Ok((bytes, trailing))
}
