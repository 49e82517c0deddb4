//! Canonical CSV output: UTF-8, comma-separated, one header row, missing as empty.

use std::io::Write;
use std::path::Path;

use crate::error::{OutputError, OutputResult};
use crate::models::Table;

/// Write a table to any writer.
pub fn write_table_to<W: Write>(table: &Table, writer: W) -> csv::Result<()> {
    let mut out = csv::WriterBuilder::new().delimiter(b',').from_writer(writer);

    out.write_record(table.column_names())?;
    for idx in 0..table.height() {
        out.write_record(table.row(idx).iter().map(|cell| cell.to_field()))?;
    }
    out.flush()?;
    Ok(())
}

/// Write a table to `path`, creating parent directories as needed.
pub fn write_table(table: &Table, path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = std::fs::File::create(path).map_err(|e| OutputError::Write {
        path: path.to_path_buf(),
        source: e.into(),
    })?;

    write_table_to(table, file).map_err(|e| OutputError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "cleaned table written"
    );
    Ok(())
}
