//! Trace export
//!
//! Both the save command and the renderer's side data file use the same
//! plain text layout: one row per point, `time<TAB>ch1<TAB>ch2`, newline
//! terminated, no header.

use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, ResultExt};
use crate::types::Trace;

/// Write `trace` as tab-separated rows
pub fn write_trace<W: Write>(writer: &mut W, trace: &Trace) -> std::io::Result<()> {
    for point in trace {
        writeln!(writer, "{}\t{}\t{}", point.time, point.ch1, point.ch2)?;
    }
    Ok(())
}

/// Replace the file at `path` with `trace`
///
/// The rows go to a temporary file in the same directory which is then
/// renamed over `path`. A reader that already opened the old file keeps
/// reading the old contents; anyone opening `path` sees a complete trace.
///
/// Returns the number of rows written.
pub fn write_trace_file(path: &Path, trace: &Trace) -> Result<usize> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {:?}", dir))?;

    let mut writer = BufWriter::new(temp);
    write_trace(&mut writer, trace).with_context(|| format!("Failed to write {:?}", path))?;
    let temp = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {:?}", path))?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(trace.len())
}

/// Save the most recent trace for the user
pub fn save_trace(path: &Path, trace: &Trace) -> Result<usize> {
    let rows = write_trace_file(path, trace)?;
    tracing::info!("Data saved at '{}'", path.display());
    Ok(rows)
}
