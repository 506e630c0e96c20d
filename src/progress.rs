//! Progress-callback trait for per-page review events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::ReviewConfigBuilder::progress_callback`] to receive
//! events as the driver works through the document. The CLI uses it to drive
//! an `indicatif` progress bar; tests use it to observe call order.
//!
//! # Example
//!
//! ```rust
//! use homework_check::{ReviewProgressCallback, ReviewConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     reviewed: AtomicUsize,
//! }
//!
//! impl ReviewProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, feedback_len: usize) {
//!         self.reviewed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} reviewed ({} bytes)", page_num, total_pages, feedback_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { reviewed: AtomicUsize::new(0) });
//!
//! let config = ReviewConfig::builder()
//!     .progress_callback(counter as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the driver as it reviews each page.
///
/// Pages are reviewed one at a time, so events for a given run arrive in
/// page order. The trait is still `Send + Sync` because the config that holds
/// it is shared with the async runtime. All methods default to no-ops.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called once after the PDF has been rendered, before the first review call.
    fn on_review_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the review request is sent for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's feedback has been written to disk.
    ///
    /// `feedback_len` is the byte length of the feedback text.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, feedback_len: usize) {
        let _ = (page_num, total_pages, feedback_len);
    }

    /// Called when a response fails the grading-format check.
    ///
    /// The page is still written; this is a warning, not a failure.
    fn on_page_warning(&self, page_num: usize, total_pages: usize, warning: &str) {
        let _ = (page_num, total_pages, warning);
    }

    /// Called when a page's review call fails. The run stops after this.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page was reviewed and the report was assembled.
    fn on_review_complete(&self, total_pages: usize, warned_pages: usize) {
        let _ = (total_pages, warned_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReviewConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;
