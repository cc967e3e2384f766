//! Byte stream surface exposed to the printer command layer

use crate::error::Result;

/// Duplex byte channel to a printer
///
/// Writes are synchronous hand-offs to the device, so `flush` has nothing to
/// do. Reads return whatever the device produced within the read timeout,
/// possibly nothing.
pub trait PrinterStream {
    /// Write `length` bytes of `bytes` starting at `offset`
    fn write_range(&mut self, bytes: &[u8], offset: usize, length: usize) -> Result<()>;

    /// Write all of `bytes`
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_range(bytes, 0, bytes.len())
    }

    /// Write a single byte
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Read one response from the device; empty when none arrived
    fn read(&mut self) -> Result<Vec<u8>>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the device. Idempotent.
    fn close(&mut self);
}
