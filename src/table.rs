//! Row-oriented capture table: channel alignment and decimation.

use std::collections::BTreeMap;

use crate::decode::VoltageSeries;
use crate::types::Channel;

/// The final product of a capture: per-channel voltages on a shared time
/// axis. A channel shorter than the table leaves its trailing rows absent;
/// an absent cell is genuine missing data, never zero and never
/// interpolated.
#[derive(Debug, Clone)]
pub struct CaptureTable {
    times: Vec<f64>,
    columns: BTreeMap<Channel, Vec<Option<f64>>>,
}

impl CaptureTable {
    /// Combine per-channel series of possibly unequal length onto one time
    /// axis.
    ///
    /// The row count is the longest series. Row `i` sits at
    /// `(i - row_count / 2) * time_step` (integer centre index), so the axis
    /// is centred on the middle row. All channels are assumed to share one
    /// acquisition time base; passing series with differing time steps is a
    /// caller error and is not corrected here.
    pub fn align(series: Vec<VoltageSeries>, time_step: f64) -> Self {
        let row_count = series.iter().map(VoltageSeries::len).max().unwrap_or(0);
        let center = (row_count / 2) as i64;
        let times = (0..row_count)
            .map(|i| (i as i64 - center) as f64 * time_step)
            .collect();

        let mut columns = BTreeMap::new();
        for s in series {
            let channel = s.descriptor.channel;
            let mut column: Vec<Option<f64>> = s.volts.into_iter().map(Some).collect();
            column.resize(row_count, None);
            columns.insert(channel, column);
        }

        Self { times, columns }
    }

    pub fn row_count(&self) -> usize {
        self.times.len()
    }

    /// Time value of every row, in seconds.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Channels present in the table, in front-panel order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.columns.keys().copied()
    }

    /// Voltage of `channel` at `row`, or `None` where the channel's series
    /// ended before the table did (or the row/channel does not exist).
    pub fn value(&self, channel: Channel, row: usize) -> Option<f64> {
        self.columns
            .get(&channel)
            .and_then(|column| column.get(row).copied().flatten())
    }

    /// Bound the table to roughly `max_rows` rows by uniform stride
    /// selection.
    ///
    /// Tables already within the budget come back unchanged. Otherwise rows
    /// are kept every `ceil(row_count / max_rows)` rows starting at row 0,
    /// and the final row is always kept so the visible time span survives.
    /// This is a display-size reducer and lossy by design: no averaging, no
    /// filtering, and no fidelity finer than the stride.
    pub fn decimate(self, max_rows: usize) -> Self {
        let row_count = self.row_count();
        if row_count <= max_rows {
            return self;
        }

        let step = row_count.div_ceil(max_rows.max(1));
        let mut keep: Vec<usize> = (0..row_count).step_by(step).collect();
        if keep.last() != Some(&(row_count - 1)) {
            keep.push(row_count - 1);
        }

        let times = keep.iter().map(|&i| self.times[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|(&channel, column)| {
                (channel, keep.iter().map(|&i| column[i]).collect())
            })
            .collect();

        Self { times, columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::{ByteWidth, ChannelDescriptor};

    fn series(channel: u8, volts: Vec<f64>) -> VoltageSeries {
        let descriptor = ChannelDescriptor {
            channel: Channel::new(channel).unwrap(),
            sample_count: volts.len(),
            time_step: 1e-6,
            time_origin: 0.0,
            voltage_gain: 1.0,
            voltage_offset: 0.0,
            code_offset: 0,
            byte_width: ByteWidth::One,
        };
        VoltageSeries { descriptor, volts }
    }

    fn ch(index: u8) -> Channel {
        Channel::new(index).unwrap()
    }

    #[test]
    fn pads_shorter_channels_with_absent_cells() {
        let a = series(1, vec![1.0; 1000]);
        let b = series(2, vec![2.0; 800]);
        let table = CaptureTable::align(vec![a, b], 1e-6);

        assert_eq!(table.row_count(), 1000);
        for row in 0..800 {
            assert_eq!(table.value(ch(1), row), Some(1.0));
            assert_eq!(table.value(ch(2), row), Some(2.0));
        }
        for row in 800..1000 {
            assert_eq!(table.value(ch(1), row), Some(1.0));
            assert_eq!(table.value(ch(2), row), None);
        }
    }

    #[test]
    fn centers_time_axis_on_middle_row() {
        let table = CaptureTable::align(vec![series(1, vec![0.0; 1000])], 1e-6);
        assert_eq!(table.times()[500], 0.0);
        assert!((table.times()[0] - -500e-6).abs() < 1e-15);
        assert!((table.times()[999] - 499e-6).abs() < 1e-15);
    }

    #[test]
    fn aligns_empty_input_to_empty_table() {
        let table = CaptureTable::align(vec![], 1e-6);
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.channels().count(), 0);
    }

    #[test]
    fn decimation_keeps_first_and_last_rows() {
        for (rows, budget) in [(1000, 100), (1000, 7), (10, 3), (2, 1)] {
            let table = CaptureTable::align(vec![series(1, vec![0.5; rows])], 1e-6);
            let first = table.times()[0];
            let last = table.times()[rows - 1];

            let decimated = table.decimate(budget);
            assert_eq!(decimated.times()[0], first, "rows={rows} budget={budget}");
            assert_eq!(
                *decimated.times().last().unwrap(),
                last,
                "rows={rows} budget={budget}"
            );
        }
    }

    #[test]
    fn decimation_strides_uniformly() {
        let table = CaptureTable::align(vec![series(1, vec![0.5; 1000])], 1e-6);
        let decimated = table.decimate(100);

        // step = ceil(1000 / 100) = 10, plus the forced final row.
        assert_eq!(decimated.row_count(), 101);
        let spacing = decimated.times()[1] - decimated.times()[0];
        assert!((spacing - 10e-6).abs() < 1e-15);
    }

    #[test]
    fn decimation_is_idempotent_once_within_budget() {
        // 901 rows at stride 10 end exactly on the final row, so one pass
        // lands within the budget and a second pass with the same budget
        // must be a no-op.
        let table = CaptureTable::align(vec![series(1, (0..901).map(f64::from).collect())], 1e-6);
        let once = table.decimate(100);
        assert!(once.row_count() <= 100);
        let times_once = once.times().to_vec();

        let twice = once.decimate(100);
        assert_eq!(twice.times(), times_once.as_slice());
    }

    #[test]
    fn decimation_preserves_absent_cells() {
        let a = series(1, vec![1.0; 1000]);
        let b = series(2, vec![2.0; 10]);
        let decimated = CaptureTable::align(vec![a, b], 1e-6).decimate(20);

        let last = decimated.row_count() - 1;
        assert_eq!(decimated.value(ch(1), last), Some(1.0));
        assert_eq!(decimated.value(ch(2), last), None);
    }
}
