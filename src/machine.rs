use std::path::PathBuf;

use crate::{
    bus::{BusArbiter, BusOwner},
    device::IoDevice,
    dma::{DmaController, DmaState, DmaTransferConfig},
    error::{BusError, DmaError, Result},
    firmware::{Firmware, OP_JMP},
    memory::AddressSpace,
    region::{RegionKind, RegionTable},
    rom::{RomLoader, RomSummary, TrailingBits},
    utils::hexdump,
};

/// Outcome of one step of the shared control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The bus is free, the CPU may execute its next instruction.
    Cpu,
    /// The DMA controller used this step.
    Dma(DmaState),
}

/// Owns the address space and everything that arbitrates access to it.
#[derive(Debug, Default)]
pub struct Machine {
    space: AddressSpace,
    arbiter: BusArbiter,
    dma: DmaController,
    rom: Option<RomSummary>,
}

impl Machine {
    pub fn new(space: AddressSpace) -> Self {
        tracing::info!("Initializing machine with regions:");
        for region in space.regions().regions() {
            tracing::info!("  {}", region);
        }

        Self {
            space,
            arbiter: BusArbiter::new(),
            dma: DmaController::new(),
            rom: None,
        }
    }

    pub fn regions(&self) -> &RegionTable {
        self.space.regions()
    }

    /// Jump target of the built-in boot program, read relative to the
    /// firmware base. `None` when the firmware holds something else.
    pub fn boot_entry(&self) -> Option<u16> {
        let regions = self.space.regions();
        let base = regions.entry(regions.first_of_kind(RegionKind::Firmware)?).base;
        let jump = [3u16, 4, 5].map(|i| self.cpu_read(base.wrapping_add(i)).ok());
        match jump {
            [Some(OP_JMP), Some(high), Some(low)] => Some(u16::from_be_bytes([high, low])),
            _ => None,
        }
    }

    pub fn arbiter(&self) -> &BusArbiter {
        &self.arbiter
    }

    pub fn dma(&self) -> &DmaController {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut DmaController {
        &mut self.dma
    }

    pub fn rom(&self) -> Option<&RomSummary> {
        self.rom.as_ref()
    }

    pub fn attach_io(&mut self, device: Box<dyn IoDevice>) {
        self.space.attach_io(device);
    }

    pub fn cpu_read(&self, address: u16) -> std::result::Result<u8, BusError> {
        self.arbiter.check(BusOwner::Cpu)?;
        Ok(self.space.read(address)?)
    }

    pub fn cpu_write(&mut self, address: u16, value: u8) -> std::result::Result<(), BusError> {
        self.arbiter.check(BusOwner::Cpu)?;
        Ok(self.space.write(address, value)?)
    }

    pub fn cpu_read_word(&self, address: u16) -> std::result::Result<u16, BusError> {
        self.arbiter.check(BusOwner::Cpu)?;
        Ok(self.space.read_word(address)?)
    }

    pub fn cpu_write_word(&mut self, address: u16, value: u16) -> std::result::Result<(), BusError> {
        self.arbiter.check(BusOwner::Cpu)?;
        Ok(self.space.write_word(address, value)?)
    }

    pub fn configure_dma(&mut self, config: DmaTransferConfig) -> std::result::Result<(), DmaError> {
        self.dma.configure(config)
    }

    pub fn step_dma(&mut self) -> std::result::Result<DmaState, DmaError> {
        self.dma.step(&mut self.space, &mut self.arbiter)
    }

    pub fn acknowledge_dma(&mut self) -> bool {
        self.dma.acknowledge()
    }

    /// Runs one step of the control loop. A pending or active transfer takes
    /// the step, otherwise the CPU gets it.
    pub fn tick(&mut self) -> std::result::Result<Tick, DmaError> {
        match self.dma.state() {
            DmaState::DmaRequested | DmaState::DmaActive => Ok(Tick::Dma(self.step_dma()?)),
            DmaState::Idle | DmaState::DmaComplete => Ok(Tick::Cpu),
        }
    }

    /// Copies `start..=end` of backing memory without going through devices.
    /// Refused like any other CPU access while the DMA controller owns the bus.
    pub fn snapshot(&self, start: u16, end: u16) -> std::result::Result<Vec<u8>, BusError> {
        self.arbiter.check(BusOwner::Cpu)?;
        Ok(self.space.snapshot(start, end))
    }

    /// Full 64KB of backing memory.
    pub fn memory(&self) -> std::result::Result<Vec<u8>, BusError> {
        self.snapshot(0x0000, 0xFFFF)
    }

    pub fn memory_dump(&self, start: u16, end: u16) -> std::result::Result<String, BusError> {
        Ok(hexdump(&self.snapshot(start, end)?, start))
    }
}

#[derive(Debug, Clone, Default)]
enum RomSource {
    #[default]
    None,
    Path(PathBuf),
    Bits(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct MachineBuilder {
    layout: RegionTable,
    firmware: Firmware,
    rom: RomSource,
    rom_region: Option<String>,
    trailing: TrailingBits,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&mut self, layout: RegionTable) -> &mut Self {
        self.layout = layout;
        self
    }

    pub fn firmware(&mut self, firmware: Firmware) -> &mut Self {
        self.firmware = firmware;
        self
    }

    pub fn rom_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.rom = RomSource::Path(path.into());
        self
    }

    pub fn rom_bits(&mut self, bits: &[u8]) -> &mut Self {
        self.rom = RomSource::Bits(bits.to_vec());
        self
    }

    /// Loads the ROM into the named region instead of the program ROM.
    pub fn rom_region(&mut self, name: &str) -> &mut Self {
        self.rom_region = Some(name.to_string());
        self
    }

    pub fn trailing_bits(&mut self, policy: TrailingBits) -> &mut Self {
        self.trailing = policy;
        self
    }

    /// Zeroes a new address space, installs the firmware and loads the ROM.
    pub fn build(&self) -> Result<Machine> {
        let mut space = AddressSpace::new(self.layout.clone());
        self.firmware.install(&mut space)?;

        let mut loader = RomLoader::new().trailing_bits(self.trailing);
        if let Some(name) = &self.rom_region {
            loader = loader.into_region(name);
        }

        let rom = match &self.rom {
            RomSource::None => None,
            RomSource::Path(path) => Some(loader.load(&mut space, path)?),
            RomSource::Bits(bits) => Some(loader.load_bits(&mut space, bits)?),
        };

        let mut machine = Machine::new(space);
        machine.rom = rom;
        Ok(machine)
    }
}
