//! Diagnostic output for signal-handler context.
//!
//! Formatting happens into a fixed buffer on the stack and the result is emitted with a single
//! raw `write(2)` to standard error. No allocation, no locks and no TLS are involved, so these
//! functions are async-signal-safe.

use core::fmt::{self, Write as _};

use crate::{nr, raw};

/// Standard error file descriptor
const STDERR: usize = 2;

/// Size of the stack buffer used by [`write_fmt`]
const LINE_BUFFER_SIZE: usize = 256;

/// Formats `args` and writes the result to standard error.
///
/// Output longer than the internal line buffer is truncated. Short writes are retried; errors
/// are dropped since there is nowhere left to report them.
pub fn write_fmt(args: fmt::Arguments<'_>) {
    let mut buf = [0u8; LINE_BUFFER_SIZE];
    let mut cursor = Cursor::new(&mut buf);
    let _ = cursor.write_fmt(args);
    let len = cursor.position();
    write_bytes(&buf[..len]);
}

fn write_bytes(mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let ret = unsafe { raw::syscall3(nr::WRITE, STDERR, bytes.as_ptr() as usize, bytes.len()) };
        if ret <= 0 {
            return;
        }
        bytes = &bytes[ret as usize..];
    }
}

/// A cursor for formatting into a byte buffer in no_std environments.
///
/// Writes past the end of the buffer are silently dropped.
pub struct Cursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor wrapping the provided buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the current write position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len().saturating_sub(self.pos);
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use super::*;

    #[test]
    fn cursor_truncates_at_capacity() {
        let mut buf = [0u8; 8];
        let mut cursor = Cursor::new(&mut buf);
        write!(cursor, "stub error {:#x}", 0x0ead0001u32).unwrap();
        assert_eq!(cursor.position(), 8);
        assert_eq!(&buf, b"stub err");
    }

    #[test]
    fn cursor_formats_in_place() {
        let mut buf = [0u8; 32];
        let mut cursor = Cursor::new(&mut buf);
        write!(cursor, "{}-{}", 1, 2).unwrap();
        let len = cursor.position();
        assert_eq!(&buf[..len], b"1-2");
    }
}
