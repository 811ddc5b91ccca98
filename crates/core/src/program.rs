//! Program variants and the catalog the hardware button cycles through.

/// Every program the attached CPU can hold is exactly this many bytes.
/// No partial programs exist anywhere in the system.
pub const BLOCK_SIZE: usize = 16;

pub type Program = [u8; BLOCK_SIZE];

// Opcode blocks for the attached CPU. Unused trailing cells are zero.
pub const PRESET_FIBONACCI: Program = [
    0x51, 0x4e, 0x50, 0x2e, 0x70, 0xe0, 0x4f, 0x1e, 0x4d, 0x1f, 0x4e, 0x1d, 0x63, 0x00, 0x00, 0x00,
];
pub const PRESET_DOUBLE: Program = [
    0x51, 0x48, 0xe0, 0x28, 0x70, 0xe0, 0x48, 0x63, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];
pub const PRESET_FIZZBUZZ: Program = [
    0x1d, 0xb1, 0x4d, 0xc3, 0x8f, 0x73, 0x1d, 0xc5, 0x8e, 0x77, 0x1d, 0xe0, 0x60, 0x00, 0xc1, 0xe0,
];
/// Counts up to 255 and back down to 0. Adopted at boot when the flash
/// region is still erased; not part of the button catalog.
pub const PRESET_COUNTER: Program = [
    0xe0, 0x2e, 0x74, 0x60, 0x3f, 0xe0, 0x80, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01,
];

/// One entry of the catalog: either an immutable compile-time preset or the
/// single mutable slot mirrored to flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramSlot {
    Preset(usize),
    FlashBacked,
}

/// Ordered list of program variants with a wrapping cursor. The presets
/// occupy slots `0..len-1`; the flash-backed slot is always last, so exactly
/// one flash slot exists by construction.
#[derive(Debug)]
pub struct Catalog {
    presets: Vec<Program>,
    cursor: usize,
}

impl Catalog {
    /// The cursor boots on the flash slot so the first button press after
    /// power-up cycles to the first preset.
    pub fn new(presets: Vec<Program>) -> Self {
        let cursor = presets.len();
        Self { presets, cursor }
    }

    pub fn with_default_presets() -> Self {
        Self::new(vec![PRESET_FIBONACCI, PRESET_DOUBLE, PRESET_FIZZBUZZ])
    }

    pub fn len(&self) -> usize {
        self.presets.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> ProgramSlot {
        if self.cursor < self.presets.len() {
            ProgramSlot::Preset(self.cursor)
        } else {
            ProgramSlot::FlashBacked
        }
    }

    /// Advances the cursor, wrapping modulo catalog size.
    pub fn advance(&mut self) -> ProgramSlot {
        self.cursor = (self.cursor + 1) % self.len();
        self.current()
    }

    /// Forces the cursor onto the flash slot. Used after console commands so
    /// the operator's last action is what gets driven to the bus.
    pub fn select_flash_slot(&mut self) -> ProgramSlot {
        self.cursor = self.presets.len();
        ProgramSlot::FlashBacked
    }

    pub fn preset(&self, index: usize) -> Option<&Program> {
        self.presets.get(index)
    }
}
