pub mod bus;
pub mod decoder;
pub mod device;
pub mod dma;
pub mod error;
pub mod firmware;
pub mod machine;
pub mod memory;
pub mod region;
pub mod rom;
pub mod utils;

pub use bus::{BusArbiter, BusOwner};
pub use decoder::{AccessKind, Decoded};
pub use device::IoDevice;
pub use dma::{Direction, DmaController, DmaState, DmaTransferConfig};
pub use error::{AccessFault, BusError, DmaError, Error, LayoutError, Result, RomError};
pub use firmware::Firmware;
pub use machine::{Machine, MachineBuilder, Tick};
pub use memory::AddressSpace;
pub use region::{Region, RegionKind, RegionTable};
pub use rom::{RomLoader, RomSummary, TrailingBits};
pub use utils::hexdump;

use once_cell::sync::OnceCell;
use wasm_bindgen::prelude::*;

static WASM_LOGGING: OnceCell<()> = OnceCell::new();

pub fn get_machine(rom_bits: &[u8]) -> Result<Machine> {
    MachineBuilder::new().rom_bits(rom_bits).build()
}

#[wasm_bindgen(js_name = Machine)]
pub struct JsMachine(Machine);

#[wasm_bindgen(js_class = Machine)]
impl JsMachine {
    #[wasm_bindgen(constructor)]
    pub fn new(rom_bits: &[u8]) -> std::result::Result<JsMachine, JsError> {
        WASM_LOGGING.get_or_init(|| {
            console_error_panic_hook::set_once();
            tracing_wasm::set_as_global_default();
        });

        Ok(Self(get_machine(rom_bits)?))
    }

    pub fn read(&self, address: u16) -> std::result::Result<u8, JsError> {
        Ok(self.0.cpu_read(address)?)
    }

    pub fn write(&mut self, address: u16, value: u8) -> std::result::Result<(), JsError> {
        Ok(self.0.cpu_write(address, value)?)
    }

    #[wasm_bindgen(js_name = configureDma)]
    pub fn configure_dma(
        &mut self,
        start_address: u16,
        length: u16,
        write: bool,
        value: u8,
    ) -> std::result::Result<(), JsError> {
        let config = if write {
            DmaTransferConfig::write(start_address, length, value)
        } else {
            DmaTransferConfig::read(start_address, length)
        };
        Ok(self.0.configure_dma(config)?)
    }

    /// Returns true while the DMA controller holds the bus.
    pub fn tick(&mut self) -> std::result::Result<bool, JsError> {
        Ok(matches!(self.0.tick()?, Tick::Dma(_)))
    }

    #[wasm_bindgen(js_name = acknowledgeDma)]
    pub fn acknowledge_dma(&mut self) -> bool {
        self.0.acknowledge_dma()
    }

    #[wasm_bindgen(getter = dmaState)]
    pub fn dma_state(&self) -> String {
        format!("{:?}", self.0.dma().state())
    }

    #[wasm_bindgen(js_name = takeDmaBytes)]
    pub fn take_dma_bytes(&mut self) -> Vec<u8> {
        self.0.dma_mut().take_read_bytes()
    }

    #[wasm_bindgen(getter)]
    pub fn memory(&self) -> std::result::Result<Vec<u8>, JsError> {
        Ok(self.0.memory()?)
    }

    pub fn dump(&self, start: u16, end: u16) -> std::result::Result<String, JsError> {
        Ok(self.0.memory_dump(start, end)?)
    }
}
