pub mod console;
pub mod device;
pub mod hex;
pub mod program;
pub mod sim;
pub mod snapshot;
pub mod store;
pub mod writer;

pub use busloader_config::PinId;


#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Bus is not idle: a line is held low by another driver")]
    BusBusy,
    #[error("Flash write failed at offset {0:#x}")]
    FlashWrite(usize),
    #[error("Flash erase failed")]
    FlashErase,
    #[error("Catalog has {slots} slots but the board exposes {select_lines} select lines")]
    CatalogOverflow { slots: usize, select_lines: usize },
}

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Electrical state a pin can be put into. Bus lines never use `OutputHigh`:
/// a logical 1 releases the line to `Input` and the external pull-up asserts
/// high. This is part of the wire contract with the attached CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Input,
    InputPullUp,
    OutputLow,
    OutputHigh,
}

/// Trait for driving and sensing individual bus lines.
pub trait BusPins {
    fn set_line(&mut self, pin: PinId, mode: LineMode);
    fn read_line(&self, pin: PinId) -> Level;
}

/// Blocking sleep. Bus timing is delay-based; every sleep stalls the whole
/// device, including the console (spec'd single-operator trade-off).
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// The dedicated flash region backing the program store.
/// Erased cells read 0xFF; erase-before-write is required.
pub trait FlashRegion {
    fn erase(&mut self) -> DeviceResult<()>;
    fn read(&self, offset: usize) -> u8;
    fn write(&mut self, offset: usize, value: u8) -> DeviceResult<()>;
}

/// Character transport of the operator console (USB CDC on real hardware).
pub trait SerialPort {
    /// Whether the host side of the transport is attached.
    fn ready(&self) -> bool {
        true
    }
    fn poll_byte(&mut self) -> Option<u8>;
    fn write_byte(&mut self, byte: u8);
    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_byte(b);
        }
    }
    fn flush(&mut self);
}

/// Everything the device logic needs from the hardware, as one bound.
pub trait Board: BusPins + Delay + FlashRegion + SerialPort {}

impl<T: BusPins + Delay + FlashRegion + SerialPort> Board for T {}
