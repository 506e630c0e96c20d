//! Result types produced by a review run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Feedback for one page, as written to its per-page file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFeedback {
    /// 1-based page number.
    pub page_num: usize,
    /// Normalised feedback text from the model (without the page marker).
    pub text: String,
    /// Format-validation warning, if the response failed the check.
    pub warning: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Where the per-page file was written.
    pub file: PathBuf,
}

/// Aggregate timing and token counts for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total_pages: usize,
    /// Pages whose response failed format validation.
    pub warned_pages: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub render_duration_ms: u64,
    pub review_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    /// The aggregate report, byte-identical to the aggregate file.
    pub report: String,
    /// One entry per page, in page order.
    pub pages: Vec<PageFeedback>,
    /// Questions opened with START but never closed with END.
    pub open_questions: Vec<String>,
    /// Directory holding the per-page files.
    pub feedback_dir: PathBuf,
    pub stats: ReviewStats,
}
