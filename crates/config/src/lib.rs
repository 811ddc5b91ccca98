use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Logical pin identifier on the programmer board.
pub type PinId = u8;

pub const ADDRESS_LINES: usize = 4;
pub const DATA_LINES: usize = 8;

/// Physical wiring of the parallel bus plus the operator-facing pins.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PinMap {
    pub address: [PinId; ADDRESS_LINES],
    pub data: [PinId; DATA_LINES],
    pub write_strobe: PinId,
    pub button: PinId,
    pub status_led: PinId,
}

/// Bus and loop timing in milliseconds. The strobe and select timings are a
/// hardware contract with the attached CPU, not tunables.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Timing {
    #[serde(default = "default_write_pulse_ms")]
    pub write_pulse_ms: u32,
    #[serde(default = "default_select_hold_ms")]
    pub select_hold_ms: u32,
    #[serde(default = "default_select_settle_ms")]
    pub select_settle_ms: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    #[serde(default = "default_blink_ms")]
    pub blink_ms: u32,
}

fn default_write_pulse_ms() -> u32 {
    5
}
fn default_select_hold_ms() -> u32 {
    250
}
fn default_select_settle_ms() -> u32 {
    100
}
fn default_debounce_ms() -> u32 {
    30
}
fn default_blink_ms() -> u32 {
    50
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            write_pulse_ms: default_write_pulse_ms(),
            select_hold_ms: default_select_hold_ms(),
            select_settle_ms: default_select_settle_ms(),
            debounce_ms: default_debounce_ms(),
            blink_ms: default_blink_ms(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardProfile {
    pub name: String,
    pub pins: PinMap,
    #[serde(default)]
    pub timing: Timing,
}

impl Default for BoardProfile {
    fn default() -> Self {
        Self {
            name: "busloader-default".to_string(),
            pins: PinMap {
                data: [0, 1, 2, 3, 4, 5, 6, 7],
                address: [8, 9, 10, 11],
                write_strobe: 12,
                button: 13,
                status_led: 14,
            },
            timing: Timing::default(),
        }
    }
}

impl BoardProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board profile at {:?}", path.as_ref()))?;
        let profile: Self =
            serde_yaml::from_reader(f).context("Failed to parse board profile YAML")?;
        profile.validate()?;
        Ok(profile)
    }

    /// All pins of a profile must be distinct wires, and the strobe pulse
    /// must be non-zero or the attached CPU never latches.
    pub fn validate(&self) -> Result<()> {
        let mut pins: Vec<PinId> = Vec::with_capacity(ADDRESS_LINES + DATA_LINES + 3);
        pins.extend_from_slice(&self.pins.address);
        pins.extend_from_slice(&self.pins.data);
        pins.push(self.pins.write_strobe);
        pins.push(self.pins.button);
        pins.push(self.pins.status_led);

        let mut seen = pins.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != pins.len() {
            anyhow::bail!("Board profile '{}' assigns the same pin twice", self.name);
        }

        if self.timing.write_pulse_ms == 0 {
            anyhow::bail!("Timing 'write_pulse_ms' must be greater than zero");
        }

        Ok(())
    }
}
