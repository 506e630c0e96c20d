//! Output writing: per-page feedback files and the aggregate report.
//!
//! Layout on disk:
//!
//! ```text
//! <feedback_dir>/page_001.txt   "=== Page 1 Feedback ===\n\n<feedback>\n"
//! <feedback_dir>/page_002.txt
//! …
//! <output_path>                 header, every page file verbatim, footer
//! ```
//!
//! The report embeds each page file byte-for-byte, so cutting the report at
//! the `=== Page N Feedback ===` lines gives back the page files (see
//! [`split_report_pages`]). Nothing time-dependent is written, which keeps
//! re-runs byte-identical.

use crate::error::CheckError;
use std::path::{Path, PathBuf};
use tracing::debug;

const RULE_WIDTH: usize = 60;

/// Default feedback directory: `<anchor>/<pdf_stem>_feedback`.
pub fn default_feedback_dir(anchor: &Path, pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    anchor.join(format!("{stem}_feedback"))
}

/// `page_007.txt` for page 7.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num:03}.txt")
}

/// The line that opens every page's feedback block.
pub fn page_marker(page_num: usize) -> String {
    format!("=== Page {page_num} Feedback ===")
}

/// Page number of a marker line, if `line` is one.
fn marker_page_number(line: &str) -> Option<usize> {
    line.strip_prefix("=== Page ")
        .and_then(|rest| rest.strip_suffix(" Feedback ==="))
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|n| n.parse().ok())
}

/// Contents of one per-page file.
pub fn render_page_file(page_num: usize, feedback: &str, warning: Option<&str>) -> String {
    let mut out = page_marker(page_num);
    out.push_str("\n\n");
    if let Some(w) = warning {
        out.push_str(&format!("[VALIDATION WARNING: {w}]\n\n"));
    }
    out.push_str(feedback);
    out.push('\n');
    out
}

/// What the report header says about the run.
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    pub pdf: &'a str,
    pub model: &'a str,
    pub total_pages: usize,
    pub open_questions: &'a [String],
}

/// Assemble the aggregate report from the per-page file contents, in page order.
pub fn render_report(header: &ReportHeader<'_>, page_files: &[String]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let open = if header.open_questions.is_empty() {
        "None".to_string()
    } else {
        header.open_questions.join(", ")
    };

    let mut out = String::new();
    out.push_str(&format!("{rule}\nHOMEWORK FEEDBACK REPORT\n{rule}\n"));
    out.push_str(&format!("PDF: {}\n", header.pdf));
    out.push_str(&format!("Model: {}\n", header.model));
    out.push_str(&format!("Total Pages: {}\n", header.total_pages));
    out.push_str(&format!("Open Questions: {open}\n"));
    out.push_str(&format!("{rule}\n\n"));
    for page in page_files {
        out.push_str(page);
        out.push('\n');
    }
    out.push_str(&format!("{rule}\nEND OF REPORT\n{rule}\n"));
    out
}

/// Cut a report back into its per-page blocks.
///
/// Only the marker for the next expected page (1, 2, 3, …) starts a block.
pub fn split_report_pages(report: &str) -> Vec<String> {
    let footer = format!("{}\nEND OF REPORT\n", "=".repeat(RULE_WIDTH));
    let body_end = report.rfind(&footer).unwrap_or(report.len());
    let body = &report[..body_end];

    let mut starts = Vec::new();
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if marker_page_number(line.trim_end_matches('\n')) == Some(starts.len() + 1) {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(body.len());
            let block = &body[start..end];
            // Blocks are separated by one blank line.
            block.strip_suffix('\n').unwrap_or(block).to_string()
        })
        .collect()
}

/// Create `dir` and its parents if missing.
pub async fn ensure_dir(dir: &Path) -> Result<(), CheckError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CheckError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Write `contents` to `path` via a sibling temp file and a rename, so an
/// interrupted run never leaves a half-written file behind.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), CheckError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent).await?;
        }
    }

    let write_failed = |e: std::io::Error| CheckError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
