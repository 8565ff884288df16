use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use readalong_sync::TimelineReport;

pub fn write_report(path: &Path, report: &TimelineReport) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    let file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    emit(BufWriter::new(file), report, &format!("'{}'", path.display()))
}

pub fn print_report(report: &TimelineReport) -> Result<(), String> {
    emit(io::stdout().lock(), report, "stdout")
}

/// Pretty JSON plus a trailing newline, flushed before returning.
fn emit<W: Write>(mut sink: W, report: &TimelineReport, target: &str) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut sink, report)
        .map_err(|err| format!("Failed to serialize timeline report to {target}: {err}"))?;
    sink.write_all(b"\n")
        .and_then(|()| sink.flush())
        .map_err(|err| format!("Failed to write timeline report to {target}: {err}"))
}
