//! Error types for the homework-check library.
//!
//! Two error types cover the two places a run can go wrong:
//!
//! * [`CheckError`] — **Fatal**: the review cannot continue (unreadable PDF,
//!   empty document, provider not configured, output not writable, or a page
//!   whose review call failed). Returned as `Err(CheckError)` from the
//!   top-level `check*` functions.
//!
//! * [`PageError`] — the reason a single page's review call failed. It is
//!   wrapped in [`CheckError::Review`] because a failed page aborts the run;
//!   pages already written stay on disk.
//!
//! Format-validation problems are not errors at this level: see
//! [`crate::pipeline::validate::ValidationError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the homework-check library.
#[derive(Debug, Error)]
pub enum CheckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened fine but has no pages to review.
    #[error("PDF '{path}' has no pages to review")]
    EmptyDocument { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium or place it next to the executable."
    )]
    PdfiumBindingFailed(String),

    // ── Review errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A page's review call failed; the run stops at that page.
    #[error("Review aborted: {0}")]
    Review(#[from] PageError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a feedback file or directory.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckError {
    /// True for errors raised while opening or rasterising the document,
    /// i.e. before any review call was made.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            CheckError::FileNotFound { .. }
                | CheckError::PermissionDenied { .. }
                | CheckError::InvalidInput { .. }
                | CheckError::DownloadFailed { .. }
                | CheckError::DownloadTimeout { .. }
                | CheckError::NotAPdf { .. }
                | CheckError::CorruptPdf { .. }
                | CheckError::PasswordRequired { .. }
                | CheckError::WrongPassword { .. }
                | CheckError::EmptyDocument { .. }
                | CheckError::RasterisationFailed { .. }
                | CheckError::PdfiumBindingFailed(_)
        )
    }
}

/// Why a single page's review call failed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The provider returned an error (network, auth, rate limit, …).
    #[error("Page {page}: LLM call failed: {detail}")]
    LlmFailed { page: usize, detail: String },

    /// The provider did not answer within the configured timeout.
    #[error("Page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The rendered page could not be PNG-encoded for the request.
    #[error("Page {page}: image encoding failed: {detail}")]
    ImageEncoding { page: usize, detail: String },
}

impl PageError {
    /// The 1-based page number the failure belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::LlmFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::ImageEncoding { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_error_wraps_page_error() {
        let e: CheckError = PageError::LlmFailed {
            page: 4,
            detail: "401 Unauthorized".into(),
        }
        .into();
        let msg = e.to_string();
        assert!(msg.contains("Page 4"), "got: {msg}");
        assert!(msg.contains("401"), "got: {msg}");
        assert!(!e.is_extraction());
    }

    #[test]
    fn timeout_display() {
        let e = PageError::Timeout { page: 2, secs: 30 };
        assert!(e.to_string().contains("30s"));
        assert_eq!(e.page(), 2);
    }

    #[test]
    fn empty_document_is_extraction_error() {
        let e = CheckError::EmptyDocument {
            path: PathBuf::from("blank.pdf"),
        };
        assert!(e.is_extraction());
        assert!(e.to_string().contains("blank.pdf"));
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = CheckError::OutputWriteFailed {
            path: PathBuf::from("/ro/page_001.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("page_001.txt"));
    }
}
