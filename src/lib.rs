//! # homework-check
//!
//! Review homework PDFs page by page with a Vision Language Model.
//!
//! Every page is rendered to a PNG and sent, in order, to a strict-grader
//! prompt. The model's feedback for each page is saved to its own file and
//! all of it is combined into one report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Render   rasterise pages via pdfium (spawn_blocking)
//!  ├─ 3. Review   one VLM call per page, strictly in page order
//!  ├─ 4. Validate START/END question markers and 0–5 scores
//!  └─ 5. Output   <pdf>_feedback/page_NNN.txt + aggregate report
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use homework_check::{check_to_file, ReviewConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider picked from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = ReviewConfig::default();
//!     let output = check_to_file("homework.pdf", "feedback.txt", &config).await?;
//!     eprintln!(
//!         "{} pages reviewed, open questions: {:?}",
//!         output.stats.total_pages, output.open_questions
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! A page whose review call fails aborts the run with
//! [`CheckError::Review`]. Feedback already written for earlier pages stays
//! on disk; no report is written. A response that merely breaks the grading
//! format is kept and flagged with a `[VALIDATION WARNING: …]` line.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `homework-check` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod check;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use check::{check, check_sync, check_to_file, review_document, review_pages, OutputPaths};
pub use config::{ReviewConfig, ReviewConfigBuilder, DEFAULT_MODEL};
pub use error::{CheckError, PageError};
pub use output::{PageFeedback, ReviewOutput, ReviewStats};
pub use pipeline::llm::{PageReviewer, Review};
pub use pipeline::render::{Page, PageSource};
pub use pipeline::validate::ValidationError;
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback};
