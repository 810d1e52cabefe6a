use std::{fs, path::Path};

use crate::{
    error::{Error, RomError},
    memory::AddressSpace,
    region::RegionKind,
    rom,
};

pub const OP_JMP: u8 = 0x01;
pub const OP_MOV: u8 = 0x04;
pub const REG_STKPTR: u8 = 0x04;

pub const STACK_TOP: u8 = 0xFF;
pub const PROGRAM_ENTRY: u16 = 0x8000;

/// MOV STKPTR, 0xFF ; JMP 0x8000
pub const BOOT_PROGRAM: [u8; 6] = [
    OP_MOV,
    REG_STKPTR,
    STACK_TOP,
    OP_JMP,
    (PROGRAM_ENTRY >> 8) as u8,
    (PROGRAM_ENTRY & 0xFF) as u8,
];

/// Boot program written into the firmware region before the first fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firmware {
    image: Vec<u8>,
}

impl Default for Firmware {
    fn default() -> Self {
        Firmware {
            image: BOOT_PROGRAM.to_vec(),
        }
    }
}

impl Firmware {
    pub fn from_bytes(image: &[u8]) -> Self {
        Firmware {
            image: image.to_vec(),
        }
    }

    /// Reads a firmware image stored in the same bit text format as ROMs.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let path = path.as_ref();
        let bits = fs::read(path).map_err(|source| RomError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let (image, trailing) = rom::pack_bits(&bits)?;
        if trailing > 0 {
            return Err(RomError::TrailingBits { count: trailing });
        }
        Ok(Firmware { image })
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Writes the image at the firmware base and locks the region.
    ///
    /// Runs once: a second call finds the region locked and fails with
    /// `WriteProtected`.
    pub fn install(&self, space: &mut AddressSpace) -> Result<(), Error> {
        let id = space
            .regions()
            .first_of_kind(RegionKind::Firmware)
            .ok_or(Error::MissingRegion("firmware"))?;

        let region = space.regions().entry(id);
        let (base, capacity) = (region.base, region.capacity());
        if self.image.len() as u32 > capacity {
            return Err(RomError::TooLarge {
                actual: self.image.len() as u64,
                max: capacity as u64,
            }
            .into());
        }

        for (i, byte) in self.image.iter().enumerate() {
            space.write(base + i as u16, *byte)?;
        }
        space.set_writable(id, false);

        tracing::info!(
            "Installed {} bytes of firmware at {:#06X}, region locked",
            self.image.len(),
            base
        );
        Ok(())
    }
}

/// Installs the built-in boot program.
pub fn install(space: &mut AddressSpace) -> Result<(), Error> {
    Firmware::default().install(space)
}
