use std::{fs, process::ExitCode};

use anyhow::Context;
use bytebus::{MachineBuilder, RegionTable};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(rom_path) = args.next() else {
        anyhow::bail!("usage: bytebus <rom-file> [layout.json]");
    };

    let mut builder = MachineBuilder::new();
    if let Some(layout_path) = args.next() {
        let json = fs::read_to_string(&layout_path)
            .with_context(|| format!("reading layout {}", layout_path))?;
        builder.layout(RegionTable::from_json(&json)?);
    }

    let machine = builder
        .rom_path(&rom_path)
        .build()
        .with_context(|| format!("booting with ROM {}", rom_path))?;

    if let Some(entry) = machine.boot_entry() {
        tracing::info!("Firmware hands off to {:#06X}", entry);
    }

    let regions = machine.regions();

    if let Some(rom) = machine.rom() {
        let base = regions
            .by_name(&rom.region)
            .and_then(|id| regions.get(id))
            .context("ROM region missing from layout")?
            .base;
        let len = rom.bytes_written.clamp(1, 64) as u16;
        print!("{}", machine.memory_dump(base, base.saturating_add(len - 1))?);
    }

    Ok(())
}
