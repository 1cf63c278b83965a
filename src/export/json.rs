use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ExportError;
use crate::walk::WalkReport;

/// Writes the whole report: metrics, materials, unknown names and counts.
pub fn export_json<P: AsRef<Path>>(report: &WalkReport, path: P) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| ExportError::FileCreate {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;

    let write_error = |e: std::io::Error| ExportError::WriteError {
        message: e.to_string(),
    };
    writer.write_all(b"\n").map_err(write_error)?;
    writer.flush().map_err(write_error)
}
