use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use pronunciation_rs::Report;

/// Where the report goes; `-` on the command line selects stdout.
#[derive(Debug, Clone)]
pub enum ReportSink {
    Stdout,
    File(PathBuf),
}

impl ReportSink {
    pub fn describe(&self) -> String {
        match self {
            Self::Stdout => "<stdout>".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

pub fn write_report(sink: &ReportSink, report: &Report) -> Result<(), String> {
    match sink {
        ReportSink::Stdout => {
            let stdout = io::stdout();
            write_json(&mut stdout.lock(), report, "<stdout>")
        }
        ReportSink::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|err| {
                    format!(
                        "Failed to create report output directory '{}': {err}",
                        parent.display()
                    )
                })?;
            }
            let file = File::create(path).map_err(|err| {
                format!("Failed to create report file '{}': {err}", path.display())
            })?;
            write_json(&mut BufWriter::new(file), report, &path.display().to_string())
        }
    }
}

fn write_json<W: Write>(writer: &mut W, report: &Report, target: &str) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut *writer, report)
        .map_err(|err| format!("Failed to serialize report to '{target}': {err}"))?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|err| format!("Failed to finalize report '{target}': {err}"))
}
