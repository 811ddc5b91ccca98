//! Line-oriented hex console.
//!
//! One byte is consumed per poll. Every received byte is echoed back
//! immediately (local-echo terminal behavior). A newline or carriage return
//! completes the line; the first character, case-folded, selects the command.

use crate::SerialPort;

pub const LINE_CAPACITY: usize = 120;

/// Bounded line accumulator. Backspace pops, overflow clears; the buffer is
/// never indexed past capacity.
#[derive(Debug)]
pub struct LineBuffer {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self {
            buf: [0; LINE_CAPACITY],
            len: 0,
        }
    }
}

impl LineBuffer {
    /// Appends a byte; false signals the buffer is full and the byte was
    /// not stored.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len >= LINE_CAPACITY {
            return false;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        true
    }

    /// Drops the last byte, if any. Length never goes below zero.
    pub fn pop(&mut self) {
        self.len = self.len.saturating_sub(1);
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `w <hex>...` - write bytes and transfer to the CPU.
    Write,
    /// `r` - read back from the CPU. Recognized, not implemented.
    Read,
    /// `s` - persist the current program to flash.
    Store,
    /// `l` - load from flash and transfer to the CPU.
    Load,
    /// `e` - run on the CPU. Recognized, not implemented.
    Run,
    Invalid,
}

impl Command {
    pub fn from_byte(c: u8) -> Self {
        match c.to_ascii_lowercase() {
            b'w' => Command::Write,
            b'r' => Command::Read,
            b's' => Command::Store,
            b'l' => Command::Load,
            b'e' => Command::Run,
            _ => Command::Invalid,
        }
    }
}

/// A completed console line, split into command and argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub command: Command,
    pub args: String,
}

impl ConsoleLine {
    fn parse(bytes: &[u8]) -> Self {
        let Some((&first, rest)) = bytes.split_first() else {
            return Self {
                command: Command::Invalid,
                args: String::new(),
            };
        };
        Self {
            command: Command::from_byte(first),
            args: String::from_utf8_lossy(rest).into_owned(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Console {
    line: LineBuffer,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes at most one byte from the transport. Returns the parsed line
    /// once a terminator arrives; the buffer is reset for the next line.
    pub fn poll<S: SerialPort>(&mut self, serial: &mut S) -> Option<ConsoleLine> {
        if !serial.ready() {
            return None;
        }
        let byte = serial.poll_byte()?;
        serial.write_byte(byte);

        match byte {
            b'\n' | b'\r' => {
                let line = ConsoleLine::parse(self.line.as_bytes());
                self.line.clear();
                Some(line)
            }
            0x08 => {
                self.line.pop();
                None
            }
            _ => {
                if !self.line.push(byte) {
                    // Overflow: silently reset, no command executes.
                    self.line.clear();
                }
                None
            }
        }
    }
}
