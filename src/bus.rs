use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BusOwner {
    #[default]
    Cpu,
    Dma,
}

impl fmt::Display for BusOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusOwner::Cpu => write!(f, "CPU"),
            BusOwner::Dma => write!(f, "DMA"),
        }
    }
}

/// Holds the single bus ownership token.
///
/// The CPU owns the bus unless a DMA transfer has been granted it. Ownership
/// only changes between accesses, never during one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BusArbiter {
    owner: BusOwner,
}

impl BusArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> BusOwner {
        self.owner
    }

    /// Fails with `BusBusy` unless `actor` currently holds the token.
    pub fn check(&self, actor: BusOwner) -> Result<(), BusError> {
        if self.owner == actor {
            Ok(())
        } else {
            Err(BusError::BusBusy { owner: self.owner })
        }
    }

    /// Hands the bus to the DMA controller. Returns false if it already had it.
    pub fn grant_dma(&mut self) -> bool {
        if self.owner == BusOwner::Dma {
            return false;
        }
        tracing::debug!("[BUS] Granted to DMA");
        self.owner = BusOwner::Dma;
        true
    }

    pub fn release(&mut self) {
        if self.owner != BusOwner::Cpu {
            tracing::debug!("[BUS] Released by {}", self.owner);
        }
        self.owner = BusOwner::Cpu;
    }
}
