use std::fmt::Debug;

/// A peripheral mapped into the I/O region.
///
/// Addresses are passed through unchanged, each device handles its own
/// translation from the region base.
pub trait IoDevice: Debug {
    fn read(&self, address: u16) -> u8;
    fn write(&mut self, address: u16, value: u8);
}
