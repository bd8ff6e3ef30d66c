//! Waveform descriptor ("preamble") decoding.
//!
//! Before transferring sample data the scope returns a fixed-size binary
//! descriptor per channel that carries everything needed to interpret the
//! raw codes: sample count, time base, vertical scaling and code width.
//! The vendor layout is kept as an explicit field table below instead of
//! scattered literal offsets, so it can be checked against a golden byte
//! sample in one place.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CaptureError;
use crate::types::Channel;

/// Total size of the descriptor block returned by `C<n>:WF? DESC`.
pub const PREAMBLE_LEN: usize = 346;

/// Size of a single raw code, from the descriptor's comm-type flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteWidth {
    One,
    Two,
}

impl ByteWidth {
    pub fn bytes(self) -> usize {
        match self {
            ByteWidth::One => 1,
            ByteWidth::Two => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    I16,
    I32,
    F32,
    F64,
}

/// One named field of the descriptor layout. Reads widen to i64/f64 so the
/// rest of the pipeline never deals in instrument-native widths.
#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    offset: usize,
    kind: FieldKind,
}

impl Field {
    fn read_int(&self, block: &[u8]) -> i64 {
        debug_assert!(matches!(self.kind, FieldKind::I16 | FieldKind::I32), "{}", self.name);
        match self.kind {
            FieldKind::I16 => LittleEndian::read_i16(&block[self.offset..]) as i64,
            _ => LittleEndian::read_i32(&block[self.offset..]) as i64,
        }
    }

    fn read_float(&self, block: &[u8]) -> f64 {
        debug_assert!(matches!(self.kind, FieldKind::F32 | FieldKind::F64), "{}", self.name);
        match self.kind {
            FieldKind::F64 => LittleEndian::read_f64(&block[self.offset..]),
            _ => LittleEndian::read_f32(&block[self.offset..]) as f64,
        }
    }
}

// Vendor-documented offsets within the WAVEDESC block, little-endian.
const COMM_TYPE: Field = Field {
    name: "comm_type",
    offset: 32,
    kind: FieldKind::I16,
};
const WAVE_ARRAY_COUNT: Field = Field {
    name: "wave_array_count",
    offset: 116,
    kind: FieldKind::I32,
};
const CODE_OFFSET: Field = Field {
    name: "code_offset",
    offset: 140,
    kind: FieldKind::I32,
};
const VERTICAL_GAIN: Field = Field {
    name: "vertical_gain",
    offset: 156,
    kind: FieldKind::F32,
};
const VERTICAL_OFFSET: Field = Field {
    name: "vertical_offset",
    offset: 160,
    kind: FieldKind::F32,
};
const HORIZ_INTERVAL: Field = Field {
    name: "horiz_interval",
    offset: 176,
    kind: FieldKind::F32,
};
const HORIZ_OFFSET: Field = Field {
    name: "horiz_offset",
    offset: 180,
    kind: FieldKind::F64,
};

/// Everything needed to turn one channel's raw code block into volts on a
/// time axis. Built once per channel per capture, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub channel: Channel,
    /// Number of codes in the raw data block.
    pub sample_count: usize,
    /// Seconds per sample.
    pub time_step: f64,
    /// Offset of the first sample from the trigger, in seconds. May be
    /// negative.
    pub time_origin: f64,
    /// Volts per code unit.
    pub voltage_gain: f64,
    /// Vertical offset applied after scaling, in volts.
    pub voltage_offset: f64,
    /// Subtracted from each raw code before scaling.
    pub code_offset: i64,
    pub byte_width: ByteWidth,
}

/// Decode one channel's descriptor block.
///
/// Any length mismatch or an unknown comm-type flag is a hard failure;
/// there is no best-effort partial decode.
pub fn decode_preamble(channel: Channel, block: &[u8]) -> Result<ChannelDescriptor, CaptureError> {
    if block.len() != PREAMBLE_LEN {
        return Err(CaptureError::MalformedPreamble {
            channel,
            reason: format!("descriptor is {} bytes, expected {}", block.len(), PREAMBLE_LEN),
        });
    }

    let byte_width = match COMM_TYPE.read_int(block) {
        0 => ByteWidth::One,
        1 => ByteWidth::Two,
        other => {
            return Err(CaptureError::MalformedPreamble {
                channel,
                reason: format!("comm_type flag {} outside {{0, 1}}", other),
            });
        }
    };

    let sample_count = WAVE_ARRAY_COUNT.read_int(block);
    if sample_count < 0 {
        return Err(CaptureError::MalformedPreamble {
            channel,
            reason: format!("negative wave_array_count {}", sample_count),
        });
    }

    Ok(ChannelDescriptor {
        channel,
        sample_count: sample_count as usize,
        time_step: HORIZ_INTERVAL.read_float(block),
        time_origin: HORIZ_OFFSET.read_float(block),
        voltage_gain: VERTICAL_GAIN.read_float(block),
        voltage_offset: VERTICAL_OFFSET.read_float(block),
        code_offset: CODE_OFFSET.read_int(block),
        byte_width,
    })
}
