//! Simulated programmer board.
//!
//! Stands in for the physical GPIO bank, flash region, delay source and CDC
//! transport so the device logic runs unmodified on a host. The simulator
//! also plays the role of the attached CPU: on each falling edge of the
//! write strobe it samples the address and data lines and records the pair,
//! which is exactly what the real CPU's memory latch does.

use crate::store::{ERASED_BYTE, FLASH_REGION_LEN};
use crate::{BusPins, Delay, DeviceResult, FlashRegion, Level, LineMode, PinId, SerialPort};
use busloader_config::{BoardProfile, PinMap};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinState {
    Floating,
    PullUp,
    DrivenLow,
    DrivenHigh,
}

#[derive(Debug)]
pub struct SimBoard {
    pins: Vec<PinState>,
    held_low: Vec<bool>,
    pin_map: PinMap,
    flash: [u8; FLASH_REGION_LEN],
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    slept_ms: u64,
    latched: Vec<(u8, u8)>,
}

impl SimBoard {
    pub fn new(profile: &BoardProfile) -> Self {
        let highest = profile
            .pins
            .address
            .iter()
            .chain(profile.pins.data.iter())
            .chain([
                &profile.pins.write_strobe,
                &profile.pins.button,
                &profile.pins.status_led,
            ])
            .copied()
            .max()
            .unwrap_or(0);

        Self {
            pins: vec![PinState::Floating; usize::from(highest) + 1],
            held_low: vec![false; usize::from(highest) + 1],
            pin_map: profile.pins.clone(),
            flash: [ERASED_BYTE; FLASH_REGION_LEN],
            rx: VecDeque::new(),
            tx: Vec::new(),
            slept_ms: 0,
            latched: Vec::new(),
        }
    }

    /// An external agent pulls the line low (bus contention, button press).
    pub fn hold_low(&mut self, pin: PinId) {
        self.held_low[usize::from(pin)] = true;
    }

    pub fn release(&mut self, pin: PinId) {
        self.held_low[usize::from(pin)] = false;
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }

    pub fn take_output(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.tx)).into_owned()
    }

    /// Address/data pairs latched by the simulated CPU, oldest first.
    pub fn latched(&self) -> &[(u8, u8)] {
        &self.latched
    }

    pub fn clear_latched(&mut self) {
        self.latched.clear();
    }

    pub fn slept_ms(&self) -> u64 {
        self.slept_ms
    }

    pub fn flash_bytes(&self) -> &[u8; FLASH_REGION_LEN] {
        &self.flash
    }

    pub fn load_flash_image(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(FLASH_REGION_LEN);
        self.flash[..n].copy_from_slice(&bytes[..n]);
    }

    fn level_of(&self, pin: PinId) -> Level {
        if self.held_low[usize::from(pin)] {
            return Level::Low;
        }
        match self.pins[usize::from(pin)] {
            PinState::DrivenLow => Level::Low,
            PinState::DrivenHigh => Level::High,
            // Bus lines carry external pull-ups; a released line reads high.
            PinState::Floating | PinState::PullUp => Level::High,
        }
    }

    fn sample_bus(&self) -> (u8, u8) {
        let mut address = 0u8;
        for (i, pin) in self.pin_map.address.iter().enumerate() {
            if self.level_of(*pin) == Level::High {
                address |= 1 << i;
            }
        }
        let mut data = 0u8;
        for (i, pin) in self.pin_map.data.iter().enumerate() {
            if self.level_of(*pin) == Level::High {
                data |= 1 << i;
            }
        }
        (address, data)
    }
}

impl BusPins for SimBoard {
    fn set_line(&mut self, pin: PinId, mode: LineMode) {
        let idx = usize::from(pin);
        let previous = self.pins[idx];
        self.pins[idx] = match mode {
            LineMode::Input => PinState::Floating,
            LineMode::InputPullUp => PinState::PullUp,
            LineMode::OutputLow => PinState::DrivenLow,
            LineMode::OutputHigh => PinState::DrivenHigh,
        };

        // The attached CPU latches on the strobe's falling edge.
        if pin == self.pin_map.write_strobe
            && mode == LineMode::OutputLow
            && previous != PinState::DrivenLow
        {
            let (address, data) = self.sample_bus();
            self.latched.push((address, data));
        }
    }

    fn read_line(&self, pin: PinId) -> Level {
        self.level_of(pin)
    }
}

impl Delay for SimBoard {
    fn delay_ms(&mut self, ms: u32) {
        // Simulated time only; tests assert on the accumulated total.
        self.slept_ms += u64::from(ms);
    }
}

impl FlashRegion for SimBoard {
    fn erase(&mut self) -> DeviceResult<()> {
        self.flash.fill(ERASED_BYTE);
        Ok(())
    }

    fn read(&self, offset: usize) -> u8 {
        self.flash.get(offset).copied().unwrap_or(ERASED_BYTE)
    }

    fn write(&mut self, offset: usize, value: u8) -> DeviceResult<()> {
        if let Some(cell) = self.flash.get_mut(offset) {
            *cell = value;
            Ok(())
        } else {
            Err(crate::DeviceError::FlashWrite(offset))
        }
    }
}

impl SerialPort for SimBoard {
    fn poll_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.tx.push(byte);
    }

    fn flush(&mut self) {}
}
