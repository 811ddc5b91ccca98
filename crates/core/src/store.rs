//! Flash-backed program store.
//!
//! The canonical mutable program lives in RAM and is mirrored to a dedicated
//! flash region of 16 individually addressable 2-byte cells. An erased region
//! reads all-0xFF; the first byte doubles as the "uninitialized" sentinel.

use crate::hex::format_byte;
use crate::program::{Program, BLOCK_SIZE, PRESET_COUNTER};
use crate::{DeviceResult, FlashRegion, SerialPort};

/// Byte value every erased flash cell reads back.
pub const ERASED_BYTE: u8 = 0xFF;
/// Program bytes are stored as 16-bit cells, one byte per cell.
pub const CELL_STRIDE: usize = 2;
pub const FLASH_REGION_LEN: usize = BLOCK_SIZE * CELL_STRIDE;

/// Prints a program as space-separated lowercase hex, newline-terminated,
/// and flushes. Shared by load, commit and bus-transfer echoes.
pub fn echo_program<S: SerialPort>(serial: &mut S, program: &Program) {
    if !serial.ready() {
        return;
    }
    for byte in program {
        serial.write_str(&format_byte(*byte));
        serial.write_str(" ");
    }
    serial.write_str("\n");
    serial.flush();
}

#[derive(Debug, Default)]
pub struct ProgramStore {
    program: Program,
}

impl ProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self) -> Program {
        self.program
    }

    /// Adopts a full program into the in-memory slot. No flash side effect.
    pub fn adopt(&mut self, program: Program) {
        self.program = program;
    }

    /// Adopts a partial byte list, zero-filling the rest of the block.
    /// The block invariant holds: the slot is always a full 16 bytes.
    pub fn adopt_prefix(&mut self, bytes: &[u8]) {
        let mut program = [0u8; BLOCK_SIZE];
        let n = bytes.len().min(BLOCK_SIZE);
        program[..n].copy_from_slice(&bytes[..n]);
        self.program = program;
    }

    /// Reads the persisted program. Pure read; the caller decides whether to
    /// adopt the result.
    pub fn load_from_flash<F: FlashRegion>(flash: &F) -> Program {
        let mut program = [0u8; BLOCK_SIZE];
        for (i, byte) in program.iter_mut().enumerate() {
            *byte = flash.read(i * CELL_STRIDE);
        }
        program
    }

    /// Boot-time adoption: flash contents verbatim, unless the first byte is
    /// the erased sentinel, in which case the designated default preset is
    /// substituted. A stored program starting with 0xFF would be
    /// misidentified; accepted policy, see the design notes.
    pub fn initialize_from_flash<F: FlashRegion>(&mut self, flash: &F) {
        let persisted = Self::load_from_flash(flash);
        if persisted[0] == ERASED_BYTE {
            tracing::info!("Flash region uninitialized, adopting default preset");
            self.program = PRESET_COUNTER;
        } else {
            self.program = persisted;
        }
    }

    /// Erases the region, then writes all 16 bytes at 2-byte stride, echoing
    /// each written byte for operator confirmation. The only mutating
    /// operation on persistent storage; not interruptible mid-way.
    pub fn commit_to_flash<B: FlashRegion + SerialPort>(&self, board: &mut B) -> DeviceResult<()> {
        tracing::debug!("Committing program block to flash");
        board.erase()?;
        for (i, byte) in self.program.iter().enumerate() {
            board.write_str(&format_byte(*byte));
            board.write(i * CELL_STRIDE, *byte)?;
            board.write_str(" ");
        }
        board.write_str("\n");
        board.flush();
        Ok(())
    }
}
