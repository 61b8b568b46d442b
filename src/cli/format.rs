//! Output formatting for CLI display.

use crate::model::CaptureRecord;
use crate::sequence::SequenceReport;

/// One line per capture: time, id, position and stored formats.
pub(super) fn format_capture_row(record: &CaptureRecord) -> String {
    let formats = record
        .files
        .iter()
        .map(|f| f.format.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}  {}  {}  [{formats}]",
        record.captured_at.strftime("%Y-%m-%d %H:%M:%S"),
        record.id,
        record.position
    )
}

/// Full detail for a single capture.
pub(super) fn format_capture_detail(record: &CaptureRecord) -> String {
    let mut out = format!(
        "id:       {}\ncaptured: {}\nprofile:  {}\nposition: {}\n",
        record.id, record.captured_at, record.profile, record.position
    );
    for file in &record.files {
        out.push_str(&format!(
            "  {}  {} bytes  sha256 {}\n",
            file.file_name, file.size_bytes, file.sha256
        ));
    }
    out
}

pub(super) fn format_sequence_report(report: &SequenceReport) -> String {
    let mut out = format!(
        "{} commands sent, {} captures",
        report.commands_sent,
        report.captures.len()
    );
    for error in &report.capture_errors {
        out.push_str(&format!("\n  capture: {error}"));
    }
    if let Some(reason) = &report.aborted {
        out.push_str(&format!("\n  aborted: {reason}"));
    }
    out
}
