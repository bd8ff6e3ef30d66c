//! CSV export of a capture table.
//!
//! One row per time value, one column per channel. A cell where the
//! channel's series ended early is written as an empty field, never zero:
//! blank means "no sample", and downstream tooling relies on that.

use std::io::Write;
use std::path::Path;

use csv::Writer;
use log::info;

use crate::table::CaptureTable;

/// Write `table` to `path`, headers included.
pub fn write_csv(table: &CaptureTable, path: &Path) -> Result<(), csv::Error> {
    let writer = Writer::from_path(path)?;
    write_to(table, writer)?;
    info!(
        "saved {} rows x {} channel(s) to {}",
        table.row_count(),
        table.channels().count(),
        path.display()
    );
    Ok(())
}

fn write_to<W: Write>(table: &CaptureTable, mut writer: Writer<W>) -> Result<(), csv::Error> {
    let channels: Vec<_> = table.channels().collect();

    let mut header = vec!["Time (s)".to_string()];
    header.extend(channels.iter().map(|ch| format!("{ch} (V)")));
    writer.write_record(&header)?;

    for (row, &time) in table.times().iter().enumerate() {
        let mut record = vec![format!("{time:.10e}")];
        for &channel in &channels {
            record.push(match table.value(channel, row) {
                Some(volts) => format!("{volts:.6e}"),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
