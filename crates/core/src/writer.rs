//! Bit-bang writer for the external CPU's parallel bus.
//!
//! 4 address lines, 8 data lines, 1 active-low write strobe. A logical 1 is
//! never driven high: the line is released to floating input and the external
//! pull-up asserts it. Driving onto a bus another agent holds is the primary
//! hazard here, so every transfer is preceded by an idle check.

use crate::program::{Program, BLOCK_SIZE};
use crate::store::echo_program;
use crate::{BusPins, Delay, DeviceError, DeviceResult, Level, LineMode, PinId, SerialPort};
use busloader_config::{BoardProfile, PinMap, Timing};

#[derive(Debug, Clone)]
pub struct BusWriter {
    pins: PinMap,
    timing: Timing,
}

impl BusWriter {
    pub fn new(profile: &BoardProfile) -> Self {
        Self {
            pins: profile.pins.clone(),
            timing: profile.timing.clone(),
        }
    }

    pub fn select_lines(&self) -> usize {
        self.pins.address.len()
    }

    /// Logical 1 releases the line, logical 0 drives it low.
    fn write_line<B: BusPins>(bus: &mut B, pin: PinId, high: bool) {
        if high {
            bus.set_line(pin, LineMode::Input);
        } else {
            bus.set_line(pin, LineMode::OutputLow);
        }
    }

    fn each_bus_pin(&self) -> impl Iterator<Item = PinId> + '_ {
        self.pins
            .address
            .iter()
            .chain(self.pins.data.iter())
            .copied()
            .chain(std::iter::once(self.pins.write_strobe))
    }

    /// Releases all 13 bus lines to floating input.
    pub fn release_bus<B: BusPins>(&self, bus: &mut B) {
        for pin in self.each_bus_pin() {
            bus.set_line(pin, LineMode::Input);
        }
    }

    /// Floats every line, then reads them back. True only when all 13 read
    /// high, meaning no external device is pulling a line low.
    pub fn check_bus_idle<B: BusPins>(&self, bus: &mut B) -> bool {
        self.release_bus(bus);
        self.each_bus_pin().all(|pin| bus.read_line(pin) == Level::High)
    }

    /// Drives one address/data pair and pulses the strobe. The 5 ms settle
    /// on each strobe edge is the latch contract of the attached CPU.
    pub fn write_cell<B: BusPins + Delay>(&self, bus: &mut B, address: u8, data: u8) {
        for (i, pin) in self.pins.address.iter().enumerate() {
            Self::write_line(bus, *pin, (address >> i) & 1 == 1);
        }
        for (i, pin) in self.pins.data.iter().enumerate() {
            Self::write_line(bus, *pin, (data >> i) & 1 == 1);
        }

        Self::write_line(bus, self.pins.write_strobe, false);
        bus.delay_ms(self.timing.write_pulse_ms);
        Self::write_line(bus, self.pins.write_strobe, true);
        bus.delay_ms(self.timing.write_pulse_ms);
    }

    /// Loads a full program into the attached CPU: asserts the slot-select
    /// address line low to put the CPU into load mode, releases it, then
    /// writes cells 0..16. Echoes the program first for operator visibility.
    /// A busy bus aborts before any cell write.
    pub fn transfer_program<B: BusPins + Delay + SerialPort>(
        &self,
        bus: &mut B,
        slot_index: usize,
        program: &Program,
    ) -> DeviceResult<()> {
        if !self.check_bus_idle(bus) {
            return Err(DeviceError::BusBusy);
        }
        tracing::debug!(slot_index, "Transferring program block to CPU");

        echo_program(bus, program);

        let select = self.pins.address[slot_index % self.pins.address.len()];
        Self::write_line(bus, select, false);
        bus.delay_ms(self.timing.select_hold_ms);
        Self::write_line(bus, select, true);
        bus.delay_ms(self.timing.select_settle_ms);

        for address in 0..BLOCK_SIZE {
            self.write_cell(bus, address as u8, program[address]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBoard;
    use crate::DeviceError;

    fn setup() -> (SimBoard, BusWriter) {
        let profile = BoardProfile::default();
        (SimBoard::new(&profile), BusWriter::new(&profile))
    }

    #[test]
    fn test_idle_bus_reads_high() {
        let (mut board, writer) = setup();
        assert!(writer.check_bus_idle(&mut board));
    }

    #[test]
    fn test_any_held_line_fails_idle_check() {
        let profile = BoardProfile::default();
        let writer = BusWriter::new(&profile);
        let mut all_lines: Vec<_> = profile.pins.address.to_vec();
        all_lines.extend_from_slice(&profile.pins.data);
        all_lines.push(profile.pins.write_strobe);

        for line in all_lines {
            let mut board = SimBoard::new(&profile);
            board.hold_low(line);
            assert!(!writer.check_bus_idle(&mut board), "line {line}");
            board.release(line);
            assert!(writer.check_bus_idle(&mut board));
        }
    }

    #[test]
    fn test_write_cell_latches_on_strobe() {
        let (mut board, writer) = setup();
        writer.write_cell(&mut board, 0x5, 0xA3);
        assert_eq!(board.latched(), &[(0x5, 0xA3)]);
        // Two settle delays per cell.
        assert_eq!(board.slept_ms(), 10);
    }

    #[test]
    fn test_transfer_writes_all_cells_in_order() {
        let (mut board, writer) = setup();
        let mut program = [0u8; BLOCK_SIZE];
        program[0] = 0x01;
        program[1] = 0x02;
        program[15] = 0xEE;

        writer.transfer_program(&mut board, 3, &program).unwrap();

        let latched = board.latched();
        assert_eq!(latched.len(), BLOCK_SIZE);
        assert_eq!(latched[0], (0, 0x01));
        assert_eq!(latched[1], (1, 0x02));
        assert_eq!(latched[15], (15, 0xEE));
        // Select hold + settle precede the cell strobes.
        assert_eq!(board.slept_ms(), 250 + 100 + 16 * 10);
    }

    #[test]
    fn test_transfer_echoes_before_driving() {
        let (mut board, writer) = setup();
        let program = [0x42u8; BLOCK_SIZE];
        writer.transfer_program(&mut board, 3, &program).unwrap();
        assert_eq!(board.take_output(), "42 ".repeat(BLOCK_SIZE) + "\n");
    }

    #[test]
    fn test_busy_bus_aborts_with_zero_writes() {
        let profile = BoardProfile::default();
        let writer = BusWriter::new(&profile);
        let mut board = SimBoard::new(&profile);
        board.hold_low(profile.pins.data[4]);

        let err = writer
            .transfer_program(&mut board, 3, &[0u8; BLOCK_SIZE])
            .unwrap_err();
        assert!(matches!(err, DeviceError::BusBusy));
        assert!(board.latched().is_empty());
        assert!(board.take_output().is_empty());
        assert_eq!(board.slept_ms(), 0);
    }
}
