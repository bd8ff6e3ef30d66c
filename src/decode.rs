//! Raw code block decoding.
//!
//! Turns the quantized codes read from waveform memory into calibrated
//! voltages using the channel's descriptor. Every code is decoded the same
//! way; sentinel or clipped-sample markers are not interpreted here.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CaptureError;
use crate::preamble::{ByteWidth, ChannelDescriptor};

/// Calibrated samples for one channel, paired with the descriptor they were
/// decoded with. Length always equals the descriptor's sample count.
#[derive(Debug, Clone)]
pub struct VoltageSeries {
    pub descriptor: ChannelDescriptor,
    pub volts: Vec<f64>,
}

impl VoltageSeries {
    pub fn len(&self) -> usize {
        self.volts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volts.is_empty()
    }
}

/// Convert one channel's raw code block into volts.
///
/// Per sample: `(code - code_offset) * voltage_gain - voltage_offset`.
/// Codes are unsigned and sized by the descriptor's byte width,
/// little-endian when two bytes wide.
pub fn decode_samples(
    descriptor: &ChannelDescriptor,
    raw: &[u8],
) -> Result<VoltageSeries, CaptureError> {
    let width = descriptor.byte_width.bytes();
    let expected = descriptor.sample_count * width;
    if raw.len() != expected {
        return Err(CaptureError::TruncatedBlock {
            channel: descriptor.channel,
            expected,
            actual: raw.len(),
        });
    }

    let mut volts = Vec::with_capacity(descriptor.sample_count);
    for code_bytes in raw.chunks_exact(width) {
        let code = match descriptor.byte_width {
            ByteWidth::One => code_bytes[0] as i64,
            ByteWidth::Two => LittleEndian::read_u16(code_bytes) as i64,
        };
        let value =
            (code - descriptor.code_offset) as f64 * descriptor.voltage_gain
                - descriptor.voltage_offset;
        volts.push(value);
    }

    Ok(VoltageSeries {
        descriptor: descriptor.clone(),
        volts,
    })
}
