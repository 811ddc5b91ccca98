//! The device state record and its cooperative poll loop.
//!
//! Single-threaded and poll-driven. All shared state lives in this record
//! and is touched only from `poll`, so no synchronization is needed; safety
//! comes from never re-entering these operations, not from locks.

use crate::console::{Command, Console, ConsoleLine};
use crate::hex::{format_byte, HexCursor, UNSPEC};
use crate::program::{Catalog, BLOCK_SIZE};
use crate::snapshot::DeviceSnapshot;
use crate::store::{echo_program, ProgramStore, FLASH_REGION_LEN};
use crate::writer::BusWriter;
use crate::{
    Board, BusPins, Delay, DeviceError, DeviceResult, FlashRegion, Level, LineMode, SerialPort,
};
use busloader_config::BoardProfile;

const HELP_TEXT: &str = "Commands:\n\
                         \x20 w dd dd   - write to CPU\n\
                         \x20 s         - store current program to flash\n\
                         \x20 l         - load from flash and write to CPU\n";

pub struct Device<B: Board> {
    board: B,
    profile: BoardProfile,
    writer: BusWriter,
    store: ProgramStore,
    catalog: Catalog,
    console: Console,
    last_button: Level,
}

impl<B: Board> Device<B> {
    /// Boots the device: configures the button pin, adopts the persisted
    /// program (or the fallback preset when flash is erased) and releases
    /// the bus. No transfer happens at boot.
    pub fn new(board: B, profile: BoardProfile) -> DeviceResult<Self> {
        let writer = BusWriter::new(&profile);
        let catalog = Catalog::with_default_presets();
        if catalog.len() > writer.select_lines() {
            return Err(DeviceError::CatalogOverflow {
                slots: catalog.len(),
                select_lines: writer.select_lines(),
            });
        }

        let mut board = board;
        board.set_line(profile.pins.button, LineMode::InputPullUp);
        let mut store = ProgramStore::new();
        store.initialize_from_flash(&board);
        writer.release_bus(&mut board);

        Ok(Self {
            board,
            profile,
            writer,
            store,
            catalog,
            console: Console::new(),
            last_button: Level::High,
        })
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn into_board(self) -> B {
        self.board
    }

    pub fn program(&self) -> crate::program::Program {
        self.store.program()
    }

    pub fn catalog_cursor(&self) -> usize {
        self.catalog.cursor()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            program: self.store.program().to_vec(),
            catalog_cursor: self.catalog.cursor(),
            flash: (0..FLASH_REGION_LEN).map(|o| self.board.read(o)).collect(),
            slept_ms: None,
        }
    }

    /// One loop iteration: bus-idle check, button, console. A busy bus
    /// blinks the error pattern and skips the rest of the iteration; the
    /// next iteration retries implicitly.
    pub fn poll(&mut self) {
        if !self.writer.check_bus_idle(&mut self.board) {
            tracing::warn!("Bus held low externally, skipping poll iteration");
            self.blink_error();
            return;
        }
        self.poll_button();
        self.poll_console();
    }

    /// Fires on the release edge with a blocking debounce re-read. The 30 ms
    /// sleep stalls the whole device; accepted for a single-operator box.
    fn poll_button(&mut self) {
        let pin = self.profile.pins.button;
        let mut current = self.board.read_line(pin);
        if self.last_button == Level::Low && current == Level::High {
            self.board.delay_ms(self.profile.timing.debounce_ms);
            current = self.board.read_line(pin);
            if current == Level::High {
                self.next_program();
            }
        }
        self.last_button = current;
    }

    fn poll_console(&mut self) {
        if let Some(line) = self.console.poll(&mut self.board) {
            self.dispatch(line);
        }
    }

    fn dispatch(&mut self, line: ConsoleLine) {
        tracing::debug!(?line.command, "Console command");
        match line.command {
            Command::Write => self.cmd_write(&line.args),
            Command::Store => self.cmd_store(),
            Command::Load => self.cmd_load(),
            // Read and Run are recognized but not implemented on this
            // hardware revision; they fall through to the summary.
            Command::Read | Command::Run | Command::Invalid => self.print_help(),
        }
    }

    /// Parses up to 16 hex bytes, adopts them (zero-filled, memory only)
    /// and transfers immediately. Zero parsed bytes abandons the write.
    fn cmd_write(&mut self, args: &str) {
        self.board.write_str("Write: ");

        let mut cursor = HexCursor::new(args);
        let mut data = [0u8; BLOCK_SIZE];
        let mut count = 0;
        while count < BLOCK_SIZE {
            let word = cursor.parse_word(UNSPEC);
            if word == UNSPEC {
                break;
            }
            data[count] = word as u8;
            count += 1;
        }

        if count == 0 {
            return;
        }

        self.store.adopt_prefix(&data[..count]);
        for byte in &data[..count] {
            self.board.write_str(&format_byte(*byte));
            self.board.write_str(" ");
        }
        self.board.write_str("\n");
        self.board.flush();

        self.transfer_flash_program();
    }

    fn cmd_store(&mut self) {
        self.board.write_str("Store: ");
        if let Err(e) = self.store.commit_to_flash(&mut self.board) {
            tracing::warn!("Flash commit failed: {e}");
            self.blink_error();
            return;
        }
        self.catalog.select_flash_slot();
    }

    fn cmd_load(&mut self) {
        self.board.write_str("Load: ");
        let persisted = ProgramStore::load_from_flash(&self.board);
        self.store.adopt(persisted);
        echo_program(&mut self.board, &persisted);
        self.transfer_flash_program();
    }

    fn print_help(&mut self) {
        self.board.write_str(HELP_TEXT);
        self.board.flush();
    }

    /// Button side effect: cycle the catalog and drive the new selection.
    fn next_program(&mut self) {
        let slot = self.catalog.advance();
        tracing::debug!(?slot, "Button advanced catalog");
        let program = match slot {
            crate::program::ProgramSlot::Preset(i) => self
                .catalog
                .preset(i)
                .copied()
                .unwrap_or_else(|| self.store.program()),
            crate::program::ProgramSlot::FlashBacked => self.store.program(),
        };
        let cursor = self.catalog.cursor();
        if let Err(e) = self.writer.transfer_program(&mut self.board, cursor, &program) {
            tracing::warn!("Transfer skipped: {e}");
            self.blink_error();
        }
    }

    /// Console commands always drive the flash slot, so the operator's last
    /// action is what ends up on the bus.
    fn transfer_flash_program(&mut self) {
        self.catalog.select_flash_slot();
        let cursor = self.catalog.cursor();
        let program = self.store.program();
        if let Err(e) = self.writer.transfer_program(&mut self.board, cursor, &program) {
            tracing::warn!("Transfer skipped: {e}");
            self.blink_error();
        }
    }

    /// Three short blinks, then the LED returns to pull-up input.
    fn blink_error(&mut self) {
        let led = self.profile.pins.status_led;
        let blink = self.profile.timing.blink_ms;
        for _ in 0..3 {
            self.board.set_line(led, LineMode::OutputLow);
            self.board.delay_ms(blink);
            self.board.set_line(led, LineMode::OutputHigh);
            self.board.delay_ms(blink);
        }
        self.board.set_line(led, LineMode::InputPullUp);
        self.board.delay_ms(1);
    }
}
