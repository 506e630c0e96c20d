//! Pipeline stages for reviewing a homework PDF.
//!
//! Each submodule implements one step; the driver in [`crate::check`] strings
//! them together page by page.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ postprocess ──▶ validate ──▶ write
//! (path/URL) (pdfium)  (base64)  (VLM)   (cleanup)       (markers)    (files)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`] — rasterise every page; [`render::PageSource`] is the seam
//! 3. [`encode`] — PNG-encode and base64-wrap a page for the request body
//! 4. [`llm`]    — the review call; [`llm::PageReviewer`] is the seam
//! 5. [`postprocess`] — deterministic cleanup of the feedback text
//! 6. [`validate`] — grading-format check and open-question tracking
//! 7. [`write`]  — per-page files and the aggregate report

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod validate;
pub mod write;
