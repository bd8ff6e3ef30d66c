//! Narrow transport contract between the capture core and the instrument.

use crate::error::CaptureError;

/// Command/response access to one oscilloscope.
///
/// A capture session owns the link for its whole duration and issues
/// commands strictly one at a time. Implementations supply their own
/// timeouts and handle instrument-specific block framing; a timeout is
/// reported as [`CaptureError::Timeout`], never swallowed.
/// [`crate::siglent::SiglentClient`] is the production implementation;
/// tests script their own.
pub trait InstrumentLink {
    /// Fire-and-forget command.
    fn send_command(&mut self, command: &str) -> Result<(), CaptureError>;

    /// Send a command and read one text response.
    fn query(&mut self, command: &str) -> Result<String, CaptureError>;

    /// Send a binary-block query and return the deframed payload bytes.
    fn read_block(&mut self, command: &str) -> Result<Vec<u8>, CaptureError>;
}
