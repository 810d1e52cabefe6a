use crate::{
    error::AccessFault,
    region::{RegionId, RegionKind, RegionTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    /// Image loading. ROM regions accept it despite being read-only, any
    /// other region must still be writable (a locked firmware stays locked).
    Load,
}

/// Result of a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub offset: usize,
    pub region: RegionId,
    pub kind: RegionKind,
}

/// Resolves `address` to the region that services it.
///
/// Regions sit at their real addresses inside the backing buffer, so the
/// offset is the address itself.
pub fn resolve(table: &RegionTable, address: u16, kind: AccessKind) -> Result<Decoded, AccessFault> {
    let Some(id) = table.find(address) else {
        return Err(AccessFault::UnmappedAddress { address });
    };

    let region = table.entry(id);
    let protected = match kind {
        AccessKind::Read => false,
        AccessKind::Write => !region.writable,
        AccessKind::Load => !region.writable && region.kind != RegionKind::Rom,
    };
    if protected {
        return Err(AccessFault::WriteProtected { address });
    }

    Ok(Decoded {
        offset: address as usize,
        region: id,
        kind: region.kind,
    })
}
