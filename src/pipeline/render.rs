//! PDF page extraction: rasterise every page to a `DynamicImage` via pdfium.
//!
//! The driver only sees the [`PageSource`] trait, so tests can feed it an
//! in-memory document instead of a real PDF.
//!
//! pdfium keeps thread-local state and is not async-safe, so rendering runs
//! on the blocking pool via `tokio::task::spawn_blocking`.

use crate::config::ReviewConfig;
use crate::error::CheckError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One rendered page of the document.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub image: DynamicImage,
}

/// Produces the ordered pages of a document.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Return every page of the PDF at `pdf_path`, in document order,
    /// numbered from 1.
    async fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<Page>, CheckError>;
}

/// [`PageSource`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumExtractor {
    pub fn new(config: &ReviewConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }
}

#[async_trait]
impl PageSource for PdfiumExtractor {
    async fn extract_pages(&self, pdf_path: &Path) -> Result<Vec<Page>, CheckError> {
        let path = pdf_path.to_path_buf();
        let this = self.clone();

        tokio::task::spawn_blocking(move || this.render_all_blocking(&path))
            .await
            .map_err(|e| CheckError::Internal(format!("Render task panicked: {}", e)))?
    }
}

impl PdfiumExtractor {
    fn render_all_blocking(&self, pdf_path: &Path) -> Result<Vec<Page>, CheckError> {
        let pdfium = bind_pdfium()?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| classify_load_error(pdf_path, password.is_some(), &e))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        info!("PDF loaded: {} pages", total);

        if total == 0 {
            return Err(CheckError::EmptyDocument {
                path: pdf_path.to_path_buf(),
            });
        }

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut results = Vec::with_capacity(total);
        for (idx, page) in pages.iter().enumerate() {
            let number = idx + 1;
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                CheckError::RasterisationFailed {
                    page: number,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                number,
                image.width(),
                image.height()
            );
            results.push(Page { number, image });
        }

        Ok(results)
    }
}

/// Bind pdfium from `PDFIUM_LIB_PATH`, the executable's directory, or the system.
fn bind_pdfium() -> Result<Pdfium, CheckError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => Pdfium::bind_to_library(PathBuf::from(p)),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| CheckError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn classify_load_error(pdf_path: &Path, had_password: bool, e: &PdfiumError) -> CheckError {
    let err_str = format!("{:?}", e);
    if err_str.to_ascii_lowercase().contains("password") {
        if had_password {
            CheckError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            CheckError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        CheckError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}
