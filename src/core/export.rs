// corpusboard - core/export.rs
//
// CSV export of the activity log and JSON export of a full store snapshot.
// Core layer: writes to any Write trait object; the path is for errors only.

use crate::core::model::{ActivityEntry, Snapshot};
use crate::util::error::ExportError;
use std::io::Write;
use std::path::Path;

/// Export activity entries to CSV.
///
/// Writes: timestamp, status, action, details
pub fn export_activity_csv<W: Write>(
    entries: &[ActivityEntry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_error = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["timestamp", "status", "action", "details"])
        .map_err(csv_error)?;

    let mut count = 0;
    for entry in entries {
        csv_writer
            .write_record([
                entry.timestamp.to_rfc3339().as_str(),
                entry.status.label(),
                entry.action.as_str(),
                entry.details.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export a full snapshot as pretty-printed JSON.
pub fn export_snapshot_json<W: Write>(
    snapshot: &Snapshot<'_>,
    writer: W,
    export_path: &Path,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, snapshot).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })
}
