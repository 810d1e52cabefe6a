// +----------------+------------------------------------------------+
// | Range          | Description                                    |
// +----------------+------------------------------------------------+
// | 0x0000-0x00FF  | Firmware: boot program, locked after install   |
// | 0x0100-0x6FFF  | RAM                                            |
// | 0x7000-0x7FFF  | I/O: memory mapped devices                     |
// | 0x8000-0xFFFF  | Program ROM                                    |
// +----------------+------------------------------------------------+
use std::{collections::HashSet, fmt};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

pub const FIRMWARE_BASE: u16 = 0x0000;
pub const FIRMWARE_LIMIT: u16 = 0x00FF;
pub const RAM_BASE: u16 = 0x0100;
pub const RAM_LIMIT: u16 = 0x6FFF;
pub const IO_BASE: u16 = 0x7000;
pub const IO_LIMIT: u16 = 0x7FFF;
pub const PROGRAM_ROM_BASE: u16 = 0x8000;
pub const PROGRAM_ROM_LIMIT: u16 = 0xFFFF;

static DEFAULT_LAYOUT: Lazy<RegionTable> = Lazy::new(|| {
    RegionTable {
        regions: vec![
            Region::new("firmware", RegionKind::Firmware, FIRMWARE_BASE, FIRMWARE_LIMIT, true),
            Region::new("ram", RegionKind::Ram, RAM_BASE, RAM_LIMIT, true),
            Region::new("io", RegionKind::Io, IO_BASE, IO_LIMIT, true),
            Region::new(
                "program_rom",
                RegionKind::Rom,
                PROGRAM_ROM_BASE,
                PROGRAM_ROM_LIMIT,
                false,
            ),
        ],
    }
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Firmware,
    Ram,
    Io,
    Rom,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Firmware => write!(f, "firmware"),
            RegionKind::Ram => write!(f, "RAM"),
            RegionKind::Io => write!(f, "I/O"),
            RegionKind::Rom => write!(f, "ROM"),
        }
    }
}

/// Position of a region inside the table that produced it. An id is
/// meaningless for any other table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub(crate) usize);

impl RegionId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub kind: RegionKind,
    pub base: u16,
    pub limit: u16,
    pub writable: bool,
}

impl Region {
    pub fn new(name: &str, kind: RegionKind, base: u16, limit: u16, writable: bool) -> Self {
        Region {
            name: name.to_string(),
            kind,
            base,
            limit,
            writable,
        }
    }

    pub fn contains(&self, address: u16) -> bool {
        address >= self.base && address <= self.limit
    }

    /// Number of bytes covered, `limit - base + 1`.
    pub fn capacity(&self) -> u32 {
        self.limit as u32 - self.base as u32 + 1
    }

    fn overlaps(&self, other: &Region) -> bool {
        self.base <= other.limit && other.base <= self.limit
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {:#06X}-{:#06X} {}",
            self.name,
            self.kind,
            self.base,
            self.limit,
            if self.writable { "rw" } else { "ro" }
        )
    }
}

/// Memory map consulted by the decoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionTable {
    regions: Vec<Region>,
}

impl Default for RegionTable {
    fn default() -> Self {
        DEFAULT_LAYOUT.clone()
    }
}

impl RegionTable {
    pub fn new(regions: Vec<Region>) -> Result<Self, LayoutError> {
        let table = RegionTable { regions };
        table.validate()?;
        Ok(table)
    }

    /// Parses a layout such as
    /// `{"regions":[{"name":"ram","kind":"ram","base":0,"limit":65535,"writable":true}]}`.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let table: RegionTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let mut names = HashSet::new();
        for (i, region) in self.regions.iter().enumerate() {
            if region.base > region.limit {
                return Err(LayoutError::EmptyRegion {
                    name: region.name.clone(),
                    base: region.base,
                    limit: region.limit,
                });
            }
            if !names.insert(region.name.as_str()) {
                return Err(LayoutError::DuplicateName(region.name.clone()));
            }
            if let Some(other) = self.regions[..i].iter().find(|r| r.overlaps(region)) {
                return Err(LayoutError::Overlap {
                    first: other.name.clone(),
                    second: region.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0)
    }

    /// Lookup for ids this table handed out itself.
    pub(crate) fn entry(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }

    pub fn find(&self, address: u16) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|r| r.contains(address))
            .map(RegionId)
    }

    pub fn by_name(&self, name: &str) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|r| r.name == name)
            .map(RegionId)
    }

    pub fn first_of_kind(&self, kind: RegionKind) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|r| r.kind == kind)
            .map(RegionId)
    }

    pub(crate) fn set_writable(&mut self, id: RegionId, writable: bool) {
        self.regions[id.0].writable = writable;
    }
}
