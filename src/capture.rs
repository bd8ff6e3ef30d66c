//! Capture orchestration.
//!
//! Runs the fixed command sequence against the instrument link and drives
//! the pure decode/align/decimate stages. The sequence is strictly linear
//! with no retries: stop acquisition once, then per channel check state,
//! fetch the descriptor, fetch the data and decode it, then align and
//! optionally decimate. The first failure aborts the whole capture; there
//! is never a partial table, and the instrument is left stopped (resuming
//! acquisition is the caller's decision, not error-handling fallout).

use log::{debug, info};

use crate::decode::{decode_samples, VoltageSeries};
use crate::error::CaptureError;
use crate::link::InstrumentLink;
use crate::preamble::decode_preamble;
use crate::siglent::protocol;
use crate::table::CaptureTable;
use crate::types::Channel;

/// What one capture should read and how large the result may grow.
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    /// Explicit channels, used verbatim. `None` auto-selects every channel
    /// whose display trace reads ON.
    pub channels: Option<Vec<Channel>>,
    /// Row cap applied after alignment. `None` keeps every sample.
    pub max_rows: Option<usize>,
}

/// Sequences one capture session over an exclusively owned instrument
/// link. This is the only component that talks to the link.
pub struct CaptureOrchestrator<L: InstrumentLink> {
    link: L,
}

impl<L: InstrumentLink> CaptureOrchestrator<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Give the link back, e.g. to restart acquisition after a capture.
    pub fn into_link(self) -> L {
        self.link
    }

    /// Run one full capture.
    pub fn capture(&mut self, request: &CaptureRequest) -> Result<CaptureTable, CaptureError> {
        // Freeze acquisition once, before any per-channel read, so memory
        // cannot change between channel transfers.
        self.link.send_command(protocol::STOP)?;

        let channels = match &request.channels {
            Some(list) => list.clone(),
            None => self.displayed_channels()?,
        };
        if channels.is_empty() {
            return Err(CaptureError::NoChannelsSelected);
        }
        info!(
            "capturing {}",
            channels
                .iter()
                .map(Channel::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut series = Vec::with_capacity(channels.len());
        for &channel in &channels {
            series.push(self.capture_channel(channel)?);
        }

        // Channels share the acquisition time base; the first descriptor is
        // as representative as any.
        let time_step = series[0].descriptor.time_step;
        let mut table = CaptureTable::align(series, time_step);
        if let Some(max_rows) = request.max_rows {
            let before = table.row_count();
            table = table.decimate(max_rows);
            if table.row_count() < before {
                info!("decimated {} -> {} rows", before, table.row_count());
            }
        }
        Ok(table)
    }

    /// Channels whose display trace reads ON.
    fn displayed_channels(&mut self) -> Result<Vec<Channel>, CaptureError> {
        let mut displayed = Vec::new();
        for channel in Channel::all() {
            let response = self.link.query(&protocol::trace_state(channel))?;
            if protocol::trace_is_on(&response) {
                displayed.push(channel);
            }
        }
        if displayed.is_empty() {
            return Err(CaptureError::NoChannelsSelected);
        }
        Ok(displayed)
    }

    fn capture_channel(&mut self, channel: Channel) -> Result<VoltageSeries, CaptureError> {
        debug!("fetching descriptor for {channel}");
        let block = self.link.read_block(&protocol::preamble_query(channel))?;
        let descriptor = decode_preamble(channel, &block)?;
        if descriptor.sample_count == 0 {
            return Err(CaptureError::ChannelUnavailable(channel));
        }
        debug!(
            "{channel}: {} samples, {}-byte codes, {} s/sample",
            descriptor.sample_count,
            descriptor.byte_width.bytes(),
            descriptor.time_step
        );

        // Transfer every point from the first one.
        self.link.send_command(protocol::WAVEFORM_SETUP)?;
        let raw = self.link.read_block(&protocol::data_query(channel))?;
        decode_samples(&descriptor, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::test_support::preamble_block;
    use std::collections::HashMap;

    fn ch(index: u8) -> Channel {
        Channel::new(index).unwrap()
    }

    /// Scripted link: canned responses per command, plus a log of every
    /// command sent.
    #[derive(Default)]
    struct ScriptedLink {
        sent: Vec<String>,
        queries: HashMap<String, String>,
        blocks: HashMap<String, Vec<u8>>,
    }

    impl ScriptedLink {
        /// Wire up a channel with a one-byte-code descriptor and a raw
        /// block derived from `codes`.
        fn with_channel(mut self, channel: u8, codes: &[u8]) -> Self {
            let preamble = preamble_block(0, codes.len() as i32, 128, 0.008, 0.0, 1e-6, 0.0);
            self.queries
                .insert(format!("C{channel}:TRA?"), format!("C{channel}:TRA ON"));
            self.blocks
                .insert(format!("C{channel}:WF? DESC"), preamble);
            self.blocks
                .insert(format!("C{channel}:WF? DAT2"), codes.to_vec());
            self
        }
    }

    impl InstrumentLink for ScriptedLink {
        fn send_command(&mut self, command: &str) -> Result<(), CaptureError> {
            self.sent.push(command.to_string());
            Ok(())
        }

        fn query(&mut self, command: &str) -> Result<String, CaptureError> {
            self.sent.push(command.to_string());
            self.queries
                .get(command)
                .cloned()
                .ok_or_else(|| CaptureError::Protocol(format!("unscripted query {command:?}")))
        }

        fn read_block(&mut self, command: &str) -> Result<Vec<u8>, CaptureError> {
            self.sent.push(command.to_string());
            self.blocks
                .get(command)
                .cloned()
                .ok_or_else(|| CaptureError::Protocol(format!("unscripted block {command:?}")))
        }
    }

    #[test]
    fn captures_two_displayed_channels() {
        let mut link = ScriptedLink::default()
            .with_channel(1, &[128; 100])
            .with_channel(3, &[130; 80]);
        // Undisplayed slots answer OFF.
        link.queries
            .insert("C2:TRA?".into(), "C2:TRA OFF".into());
        link.queries
            .insert("C4:TRA?".into(), "C4:TRA OFF".into());

        let mut orchestrator = CaptureOrchestrator::new(link);
        let table = orchestrator
            .capture(&CaptureRequest::default())
            .unwrap();

        assert_eq!(table.row_count(), 100);
        assert_eq!(table.channels().collect::<Vec<_>>(), vec![ch(1), ch(3)]);
        assert_eq!(table.value(ch(1), 0), Some(0.0));
        // (130 - 128) * 0.008, within f32 gain precision
        assert!((table.value(ch(3), 0).unwrap() - 0.016).abs() < 1e-8);
        // CH3 ran out of samples at row 80.
        assert_eq!(table.value(ch(3), 99), None);
    }

    #[test]
    fn stops_acquisition_before_any_read() {
        let link = ScriptedLink::default().with_channel(1, &[128; 10]);
        let mut orchestrator = CaptureOrchestrator::new(link);
        orchestrator
            .capture(&CaptureRequest {
                channels: Some(vec![ch(1)]),
                max_rows: None,
            })
            .unwrap();

        let sent = &orchestrator.into_link().sent;
        assert_eq!(sent[0], "STOP");
    }

    #[test]
    fn explicit_channel_list_skips_display_checks() {
        let link = ScriptedLink::default().with_channel(2, &[128; 10]);
        let mut orchestrator = CaptureOrchestrator::new(link);
        orchestrator
            .capture(&CaptureRequest {
                channels: Some(vec![ch(2)]),
                max_rows: None,
            })
            .unwrap();

        let sent = orchestrator.into_link().sent;
        assert!(!sent.iter().any(|c| c.ends_with("TRA?")));
    }

    #[test]
    fn aborts_whole_capture_on_truncated_channel() {
        let mut link = ScriptedLink::default()
            .with_channel(1, &[128; 100])
            .with_channel(2, &[128; 100]);
        // CH2's data block loses its tail.
        link.blocks.insert("C2:WF? DAT2".into(), vec![128; 60]);

        let mut orchestrator = CaptureOrchestrator::new(link);
        let err = orchestrator
            .capture(&CaptureRequest {
                channels: Some(vec![ch(1), ch(2)]),
                max_rows: None,
            })
            .unwrap_err();

        assert!(matches!(
            err,
            CaptureError::TruncatedBlock { channel, .. } if channel == ch(2)
        ));
    }

    #[test]
    fn failure_stops_the_command_sequence() {
        let mut link = ScriptedLink::default()
            .with_channel(1, &[128; 100])
            .with_channel(2, &[128; 100]);
        link.blocks.insert("C1:WF? DESC".into(), vec![0; 10]);

        let mut orchestrator = CaptureOrchestrator::new(link);
        let err = orchestrator
            .capture(&CaptureRequest {
                channels: Some(vec![ch(1), ch(2)]),
                max_rows: None,
            })
            .unwrap_err();
        assert!(matches!(err, CaptureError::MalformedPreamble { .. }));

        // Nothing was asked of CH2 after CH1 failed.
        let sent = orchestrator.into_link().sent;
        assert!(!sent.iter().any(|c| c.starts_with("C2:")));
    }

    #[test]
    fn empty_channel_reports_unavailable() {
        let mut link = ScriptedLink::default().with_channel(1, &[]);
        link.blocks
            .insert("C1:WF? DAT2".into(), Vec::new());

        let mut orchestrator = CaptureOrchestrator::new(link);
        let err = orchestrator
            .capture(&CaptureRequest {
                channels: Some(vec![ch(1)]),
                max_rows: None,
            })
            .unwrap_err();
        assert!(matches!(err, CaptureError::ChannelUnavailable(c) if c == ch(1)));
    }

    #[test]
    fn no_displayed_channels_is_an_error_not_an_empty_table() {
        let mut link = ScriptedLink::default();
        for slot in 1..=4 {
            link.queries
                .insert(format!("C{slot}:TRA?"), format!("C{slot}:TRA OFF"));
        }

        let mut orchestrator = CaptureOrchestrator::new(link);
        let err = orchestrator.capture(&CaptureRequest::default()).unwrap_err();
        assert!(matches!(err, CaptureError::NoChannelsSelected));
    }

    #[test]
    fn applies_row_cap_after_alignment() {
        let link = ScriptedLink::default().with_channel(1, &[128; 1000]);
        let mut orchestrator = CaptureOrchestrator::new(link);
        let table = orchestrator
            .capture(&CaptureRequest {
                channels: Some(vec![ch(1)]),
                max_rows: Some(100),
            })
            .unwrap();
        assert!(table.row_count() <= 101);
        assert!(table.row_count() < 1000);
    }
}
