// Direct memory access.
//
// The controller moves one byte per step while it owns the bus, so the CPU
// cannot touch memory until the transfer completes or aborts:
//
//   Idle --configure--> DmaRequested --grant--> DmaActive --length 0--> DmaComplete
//    ^                                              |                        |
//    +---------------- abort (bus released) -------+        acknowledge ----+

use serde::{Deserialize, Serialize};

use crate::{
    bus::BusArbiter,
    error::DmaError,
    memory::AddressSpace,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Memory to device, each byte lands in `pending_byte`.
    Read,
    /// Device to memory, `pending_byte` is stored at each address.
    Write,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmaTransferConfig {
    pub start_address: u16,
    pub length: u16,
    pub direction: Direction,
    #[serde(default)]
    pub pending_byte: u8,
}

impl DmaTransferConfig {
    pub fn read(start_address: u16, length: u16) -> Self {
        DmaTransferConfig {
            start_address,
            length,
            direction: Direction::Read,
            pending_byte: 0,
        }
    }

    pub fn write(start_address: u16, length: u16, value: u8) -> Self {
        DmaTransferConfig {
            start_address,
            length,
            direction: Direction::Write,
            pending_byte: value,
        }
    }

    fn validate(&self) -> Result<(), DmaError> {
        let last = self.start_address as u32 + self.length as u32;
        if self.length > 0 && last - 1 > u16::MAX as u32 {
            return Err(DmaError::OutOfRange {
                start: self.start_address,
                length: self.length,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DmaState {
    #[default]
    Idle,
    DmaRequested,
    DmaActive,
    DmaComplete,
}

#[derive(Debug, Default, Clone)]
pub struct DmaController {
    state: DmaState,
    transfer: Option<DmaTransferConfig>,
    pending_byte: u8,
    read_buffer: Vec<u8>,
}

impl DmaController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DmaState {
        self.state
    }

    /// Remaining part of the transfer in progress.
    pub fn transfer(&self) -> Option<&DmaTransferConfig> {
        self.transfer.as_ref()
    }

    pub fn pending_byte(&self) -> u8 {
        self.pending_byte
    }

    /// Supplies the next byte of a write transfer.
    pub fn set_pending_byte(&mut self, value: u8) {
        self.pending_byte = value;
        if let Some(transfer) = &mut self.transfer {
            transfer.pending_byte = value;
        }
    }

    /// Drains the bytes collected by read transfers.
    pub fn take_read_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.read_buffer)
    }

    pub fn configure(&mut self, config: DmaTransferConfig) -> Result<(), DmaError> {
        if self.state != DmaState::Idle {
            return Err(DmaError::NotIdle);
        }
        config.validate()?;

        if config.length == 0 {
            tracing::debug!("[DMA] Ignoring empty transfer at {:#06X}", config.start_address);
            return Ok(());
        }

        tracing::debug!(
            "[DMA] Configured {:?} of {} bytes at {:#06X}",
            config.direction,
            config.length,
            config.start_address
        );
        self.pending_byte = config.pending_byte;
        self.transfer = Some(config);
        self.read_buffer.clear();
        self.state = DmaState::DmaRequested;
        Ok(())
    }

    /// Advances the state machine by one step and returns the new state.
    ///
    /// A requested transfer spends its first step acquiring the bus, every
    /// following step moves one byte.
    pub fn step(&mut self, space: &mut AddressSpace, arbiter: &mut BusArbiter) -> Result<DmaState, DmaError> {
        match self.state {
            DmaState::Idle | DmaState::DmaComplete => {}
            DmaState::DmaRequested => {
                arbiter.grant_dma();
                self.state = DmaState::DmaActive;
            }
            DmaState::DmaActive => self.transfer_byte(space, arbiter)?,
        }
        Ok(self.state)
    }

    fn transfer_byte(&mut self, space: &mut AddressSpace, arbiter: &mut BusArbiter) -> Result<(), DmaError> {
        let Some(transfer) = &mut self.transfer else {
            arbiter.release();
            self.state = DmaState::Idle;
            return Ok(());
        };

        let address = transfer.start_address;
        let result = match transfer.direction {
            Direction::Write => space.write(address, transfer.pending_byte),
            Direction::Read => space.read(address).map(|value| {
                transfer.pending_byte = value;
                self.pending_byte = value;
                self.read_buffer.push(value);
            }),
        };

        if let Err(cause) = result {
            let remaining = transfer.length;
            self.transfer = None;
            self.state = DmaState::Idle;
            arbiter.release();
            tracing::debug!("[DMA] Aborted at {:#06X}: {}", address, cause);
            return Err(DmaError::Aborted {
                at_address: address,
                remaining,
                cause,
            });
        }

        transfer.length -= 1;
        if transfer.length == 0 {
            arbiter.release();
            self.state = DmaState::DmaComplete;
            tracing::debug!("[DMA] Transfer complete at {:#06X}", address);
        } else {
            transfer.start_address += 1;
        }
        Ok(())
    }

    /// Steps until the transfer completes, returning the number of steps taken.
    pub fn run(&mut self, space: &mut AddressSpace, arbiter: &mut BusArbiter) -> Result<usize, DmaError> {
        let mut steps = 0;
        while matches!(self.state, DmaState::DmaRequested | DmaState::DmaActive) {
            self.step(space, arbiter)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Returns a completed controller to `Idle`.
    pub fn acknowledge(&mut self) -> bool {
        if self.state != DmaState::DmaComplete {
            return false;
        }
        self.transfer = None;
        self.state = DmaState::Idle;
        true
    }
}
