//! SCPI command strings and response parsing for Siglent SDS scopes.
//!
//! The command syntax is a fixed protocol constant; nothing here is
//! configurable.

use crate::error::CaptureError;
use crate::types::Channel;

/// Freeze acquisition so waveform memory stays put during readout.
pub const STOP: &str = "STOP";
/// Identity query.
pub const IDN: &str = "*IDN?";
/// Seconds per horizontal division.
pub const TDIV: &str = "TDIV?";
/// Sample rate.
pub const SARA: &str = "SARA?";
/// Transfer every point, all points, starting at the first.
pub const WAVEFORM_SETUP: &str = "WFSU SP,1,NP,0,FP,0";

/// Display-state query, answered like `C1:TRA ON`.
pub fn trace_state(channel: Channel) -> String {
    format!("C{}:TRA?", channel.index())
}

/// Waveform descriptor block query.
pub fn preamble_query(channel: Channel) -> String {
    format!("C{}:WF? DESC", channel.index())
}

/// Raw waveform data block query.
pub fn data_query(channel: Channel) -> String {
    format!("C{}:WF? DAT2", channel.index())
}

pub fn trace_is_on(response: &str) -> bool {
    response.trim().to_ascii_uppercase().contains("ON")
}

// SI prefixes the scope appends to bare numeric responses like `500MSa/s`.
const SI_PREFIXES: [(char, f64); 7] = [
    ('G', 1e9),
    ('M', 1e6),
    ('k', 1e3),
    ('m', 1e-3),
    ('u', 1e-6),
    ('n', 1e-9),
    ('p', 1e-12),
];

// Longest first, so `Sa/s` is not consumed as a bare `s`.
const UNIT_SUFFIXES: [&str; 10] = [
    "Sa/s", "sa/s", "pts", "Pts", "Hz", "hz", "V", "v", "s", "S",
];

/// Parse the numeric payload of a Siglent text response.
///
/// Responses carry the echoed command plus a value with a unit suffix, e.g.
/// `C1:VDIV 2.00E-01V`, `TDIV 1.00E-03s` or `SARA 500MSa/s`.
pub fn parse_value(response: &str) -> Result<f64, CaptureError> {
    let token = response
        .split_whitespace()
        .last()
        .ok_or_else(|| CaptureError::Protocol(format!("empty response: {response:?}")))?;

    let mut value = token;
    for unit in UNIT_SUFFIXES {
        if let Some(stripped) = value.strip_suffix(unit) {
            value = stripped;
            break;
        }
    }

    let mut multiplier = 1.0;
    if let Some(last) = value.chars().last() {
        if let Some(&(_, factor)) = SI_PREFIXES.iter().find(|&&(prefix, _)| prefix == last) {
            multiplier = factor;
            value = &value[..value.len() - last.len_utf8()];
        }
    }

    value
        .parse::<f64>()
        .map(|v| v * multiplier)
        .map_err(|_| CaptureError::Protocol(format!("unparsable numeric response: {response:?}")))
}

/// Strip the IEEE 488.2 definite-length framing from a binary response.
///
/// The scope answers block queries as `C1:WF ALL,#9<9 digits><payload>`,
/// optionally followed by terminator bytes. Returns the payload only;
/// a payload cut short is a [`CaptureError::ShortRead`].
pub fn deframe_block(raw: &[u8]) -> Result<Vec<u8>, CaptureError> {
    let marker = raw
        .windows(2)
        .position(|w| w[0] == b'#' && w[1].is_ascii_digit())
        .ok_or_else(|| {
            CaptureError::Protocol("no definite-length block header in response".into())
        })?;

    let digits = (raw[marker + 1] - b'0') as usize;
    if digits == 0 {
        return Err(CaptureError::Protocol(
            "indefinite-length block not supported".into(),
        ));
    }

    let header_end = marker + 2 + digits;
    let length_bytes = raw
        .get(marker + 2..header_end)
        .ok_or(CaptureError::ShortRead {
            expected: header_end,
            actual: raw.len(),
        })?;
    let payload_len = std::str::from_utf8(length_bytes)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| CaptureError::Protocol("invalid block length digits".into()))?;

    let payload = raw
        .get(header_end..header_end + payload_len)
        .ok_or(CaptureError::ShortRead {
            expected: header_end + payload_len,
            actual: raw.len(),
        })?;
    Ok(payload.to_vec())
}

/// Total response size implied by a definite-length header, if one is
/// already visible in `raw`. Lets the link stop reading at the right byte.
pub fn framed_response_len(raw: &[u8]) -> Option<usize> {
    let marker = raw
        .windows(2)
        .position(|w| w[0] == b'#' && w[1].is_ascii_digit())?;
    let digits = (raw[marker + 1] - b'0') as usize;
    let header_end = marker + 2 + digits;
    let length_bytes = raw.get(marker + 2..header_end)?;
    let payload_len: usize = std::str::from_utf8(length_bytes).ok()?.parse().ok()?;
    Some(header_end + payload_len)
}
