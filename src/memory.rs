use derivative::Derivative;

use crate::{
    decoder::{self, AccessKind, Decoded},
    device::IoDevice,
    error::AccessFault,
    region::{Region, RegionId, RegionKind, RegionTable},
};

pub const MEMORY_SIZE: usize = 0x10000;

/// The full 16-bit address space and the layout that decodes it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AddressSpace {
    #[derivative(Debug = "ignore")]
    data: Box<[u8]>,
    regions: RegionTable,
    io_device: Option<Box<dyn IoDevice>>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new(RegionTable::default())
    }
}

impl AddressSpace {
    pub fn new(regions: RegionTable) -> Self {
        AddressSpace {
            data: vec![0x00; MEMORY_SIZE].into_boxed_slice(),
            regions,
            io_device: None,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn decode(&self, address: u16, kind: AccessKind) -> Result<Decoded, AccessFault> {
        decoder::resolve(&self.regions, address, kind)
    }

    pub fn attach_io(&mut self, device: Box<dyn IoDevice>) {
        tracing::debug!("Attaching I/O device {:?}", device);
        self.io_device = Some(device);
    }

    pub fn detach_io(&mut self) -> Option<Box<dyn IoDevice>> {
        self.io_device.take()
    }

    pub fn read(&self, address: u16) -> Result<u8, AccessFault> {
        let decoded = self.decode(address, AccessKind::Read).map_err(|fault| {
            tracing::trace!("Read fault: {}", fault);
            fault
        })?;

        if decoded.kind == RegionKind::Io {
            if let Some(device) = &self.io_device {
                return Ok(device.read(address));
            }
        }

        Ok(self.data[decoded.offset])
    }

    pub fn write(&mut self, address: u16, value: u8) -> Result<(), AccessFault> {
        let decoded = self.decode(address, AccessKind::Write).map_err(|fault| {
            tracing::trace!("Write fault: {} (value {:#04X})", fault, value);
            fault
        })?;

        if decoded.kind == RegionKind::Io {
            if let Some(device) = &mut self.io_device {
                device.write(address, value);
                return Ok(());
            }
        }

        self.data[decoded.offset] = value;
        Ok(())
    }

    pub fn read_word(&self, address: u16) -> Result<u16, AccessFault> {
        let low_byte = self.read(address)? as u16;
        let high_byte = self.read(address.wrapping_add(1))? as u16;
        Ok((high_byte << 8) | low_byte)
    }

    pub fn write_word(&mut self, address: u16, value: u16) -> Result<(), AccessFault> {
        let low_byte = (value & 0x00FF) as u8;
        let high_byte = ((value & 0xFF00) >> 8) as u8;
        self.write(address, low_byte)?;
        self.write(address.wrapping_add(1), high_byte)
    }

    /// Stores `value` at `offset` bytes past the base of region `id`. ROM
    /// regions accept it even though they are read-only. Used to populate
    /// images.
    pub(crate) fn load(&mut self, id: RegionId, offset: usize, value: u8) -> Result<(), AccessFault> {
        let region = self.regions.entry(id);
        if offset >= region.capacity() as usize {
            // the address the bus would have wrapped to
            return Err(AccessFault::UnmappedAddress {
                address: region.base.wrapping_add(offset as u16),
            });
        }
        let address = region.base + offset as u16;

        let decoded = self.decode(address, AccessKind::Load)?;
        self.data[decoded.offset] = value;
        Ok(())
    }

    pub(crate) fn set_writable(&mut self, id: RegionId, writable: bool) {
        self.regions.set_writable(id, writable);
    }

    /// Copies `start..=end` of the backing buffer, bypassing decode and devices.
    pub fn snapshot(&self, start: u16, end: u16) -> Vec<u8> {
        if start > end {
            return Vec::new();
        }
        self.data[start as usize..=end as usize].to_vec()
    }
}
