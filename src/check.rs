//! Review entry points and the sequential page driver.
//!
//! [`check`] / [`check_to_file`] are the batteries-included API: resolve the
//! input, render it with pdfium, review it with the configured provider.
//! [`review_document`] and [`review_pages`] are the same driver with the
//! extractor and reviewer injected, which is what the integration tests use.
//!
//! Pages are reviewed strictly one after another: page N+1 is not sent until
//! page N's feedback is on disk. The first failed review call aborts the run;
//! per-page files written up to that point are left in place and no report is
//! written.

use crate::config::{ReviewConfig, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::error::CheckError;
use crate::output::{PageFeedback, ReviewOutput, ReviewStats};
use crate::pipeline::llm::{PageReviewer, VlmReviewer};
use crate::pipeline::render::{Page, PageSource, PdfiumExtractor};
use crate::pipeline::validate::FeedbackValidator;
use crate::pipeline::{input, postprocess, write};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a run writes its files.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// Directory receiving one `page_NNN.txt` per page.
    pub feedback_dir: PathBuf,
    /// Aggregate report file. When None the report is only returned.
    pub report_path: Option<PathBuf>,
}

/// Review a homework PDF (local path or URL).
///
/// Per-page files go to `config.output_dir`, or `<pdf_stem>_feedback/` next
/// to the PDF. The aggregate report is returned in [`ReviewOutput::report`]
/// but not written; use [`check_to_file`] for that.
pub async fn check(
    input_str: impl AsRef<str>,
    config: &ReviewConfig,
) -> Result<ReviewOutput, CheckError> {
    run(input_str.as_ref(), None, config).await
}

/// Review a homework PDF and write the aggregate report to `output_path`.
pub async fn check_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ReviewConfig,
) -> Result<ReviewOutput, CheckError> {
    run(
        input_str.as_ref(),
        Some(output_path.as_ref().to_path_buf()),
        config,
    )
    .await
}

/// Synchronous wrapper around [`check`].
///
/// Creates a temporary tokio runtime internally.
pub fn check_sync(
    input_str: impl AsRef<str>,
    config: &ReviewConfig,
) -> Result<ReviewOutput, CheckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CheckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(check(input_str, config))
}

async fn run(
    input_str: &str,
    report_path: Option<PathBuf>,
    config: &ReviewConfig,
) -> Result<ReviewOutput, CheckError> {
    info!("Starting review: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    let (provider, model) = resolve_provider(config)?;
    // The report header names the model that was actually used.
    let mut config = config.clone();
    config.model.get_or_insert(model);
    let config = &config;

    let outputs = OutputPaths {
        feedback_dir: config
            .output_dir
            .clone()
            .unwrap_or_else(|| write::default_feedback_dir(&resolved.anchor_dir(), &pdf_path)),
        report_path,
    };

    let extractor = PdfiumExtractor::new(config);
    let mut reviewer = VlmReviewer::new(provider, config);

    // `resolved` must outlive the run: for URL input it owns the temp file.
    let output = review_document(
        &extractor,
        &mut reviewer,
        &pdf_path,
        input_str,
        &outputs,
        config,
    )
    .await?;
    drop(resolved);
    Ok(output)
}

/// Extract the pages of `pdf_path` with `source` and review them in order.
///
/// `pdf_label` is what the report header shows as the PDF (usually the
/// path or URL the user passed).
pub async fn review_document<S, R>(
    source: &S,
    reviewer: &mut R,
    pdf_path: &Path,
    pdf_label: &str,
    outputs: &OutputPaths,
    config: &ReviewConfig,
) -> Result<ReviewOutput, CheckError>
where
    S: PageSource + ?Sized,
    R: PageReviewer + ?Sized,
{
    let total_start = Instant::now();

    let render_start = Instant::now();
    let pages = source.extract_pages(pdf_path).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Extracted {} pages in {}ms", pages.len(), render_duration_ms);

    if pages.is_empty() {
        return Err(CheckError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }

    let mut output = review_pages(pages, reviewer, pdf_label, outputs, config).await?;
    output.stats.render_duration_ms = render_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// The sequential driver: review each page in order and write the results.
///
/// Writes one file per page into `outputs.feedback_dir` (created if absent)
/// and, when `outputs.report_path` is set, the aggregate report. A document
/// with no pages is rejected before anything is written.
pub async fn review_pages<R>(
    pages: Vec<Page>,
    reviewer: &mut R,
    pdf_label: &str,
    outputs: &OutputPaths,
    config: &ReviewConfig,
) -> Result<ReviewOutput, CheckError>
where
    R: PageReviewer + ?Sized,
{
    let total = pages.len();
    if total == 0 {
        return Err(CheckError::EmptyDocument {
            path: PathBuf::from(pdf_label),
        });
    }

    write::ensure_dir(&outputs.feedback_dir).await?;
    info!("Saving per-page feedback to: {}", outputs.feedback_dir.display());

    let progress = config.progress_callback.as_ref();
    if let Some(cb) = progress {
        cb.on_review_start(total);
    }

    let mut validator = FeedbackValidator::new();
    let mut results: Vec<PageFeedback> = Vec::with_capacity(total);
    let mut page_files: Vec<String> = Vec::with_capacity(total);
    let review_start = Instant::now();

    for (i, page) in pages.iter().enumerate() {
        let page_num = i + 1;
        if page.number != page_num {
            return Err(CheckError::Internal(format!(
                "page source yielded page {} at position {}",
                page.number, page_num
            )));
        }

        debug!("Reviewing page {}/{}", page_num, total);
        if let Some(cb) = progress {
            cb.on_page_start(page_num, total);
        }

        let started = Instant::now();
        let review = match reviewer.review(page).await {
            Ok(r) => r,
            Err(e) => {
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                return Err(CheckError::Review(e));
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let text = postprocess::clean_feedback(&review.text);

        let warning = if config.validate {
            validator.check(&text).err().map(|e| e.to_string())
        } else {
            None
        };
        if let Some(ref w) = warning {
            warn!("Page {}: validation warning — {}", page_num, w);
            if let Some(cb) = progress {
                cb.on_page_warning(page_num, total, w);
            }
        }

        let contents = write::render_page_file(page_num, &text, warning.as_deref());
        let file = outputs.feedback_dir.join(write::page_file_name(page_num));
        write::write_atomic(&file, &contents).await?;
        debug!("Page {}: saved to {}", page_num, file.display());

        if let Some(cb) = progress {
            cb.on_page_complete(page_num, total, text.len());
        }

        page_files.push(contents);
        results.push(PageFeedback {
            page_num,
            text,
            warning,
            input_tokens: review.input_tokens,
            output_tokens: review.output_tokens,
            duration_ms,
            file,
        });
    }
    let review_duration_ms = review_start.elapsed().as_millis() as u64;

    let open_questions = validator.open_questions();
    if !open_questions.is_empty() {
        warn!(
            "Questions still open at end of document: {}",
            open_questions.join(", ")
        );
    }

    let header = write::ReportHeader {
        pdf: pdf_label,
        model: config.model_label(),
        total_pages: total,
        open_questions: &open_questions,
    };
    let report = write::render_report(&header, &page_files);

    if let Some(ref path) = outputs.report_path {
        write::write_atomic(path, &report).await?;
        info!("Feedback report saved to: {}", path.display());
    }

    let warned_pages = results.iter().filter(|p| p.warning.is_some()).count();
    let stats = ReviewStats {
        total_pages: total,
        warned_pages,
        total_input_tokens: results.iter().map(|p| p.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|p| p.output_tokens as u64).sum(),
        render_duration_ms: 0,
        review_duration_ms,
        total_duration_ms: review_duration_ms,
    };

    info!(
        "Review complete: {} pages, {} with warnings, {}ms",
        total, warned_pages, review_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_review_complete(total, warned_pages);
    }

    Ok(ReviewOutput {
        report,
        pages: results,
        open_questions,
        feedback_dir: outputs.feedback_dir.clone(),
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, CheckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        CheckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Model to request from a named provider.
///
/// [`DEFAULT_MODEL`] is a Gemini model, so any other provider needs an
/// explicit model.
fn model_for_provider(provider_name: &str, model: Option<&str>) -> Result<String, CheckError> {
    match model {
        Some(m) => Ok(m.to_string()),
        None if provider_name.eq_ignore_ascii_case(DEFAULT_PROVIDER) => {
            Ok(DEFAULT_MODEL.to_string())
        }
        None => Err(CheckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!(
                "No model given for provider '{provider_name}'.\n\
                Pass --model (e.g. --provider openai --model gpt-4.1)."
            ),
        }),
    }
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`;
///    only Gemini falls back to [`DEFAULT_MODEL`].
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini** when `GEMINI_API_KEY` is set, with `config.model` or
///    [`DEFAULT_MODEL`].
/// 5. **Auto-detection** via `ProviderFactory::from_env`.
///
/// Returns the provider together with the model name it was built for.
fn resolve_provider(
    config: &ReviewConfig,
) -> Result<(Arc<dyn LLMProvider>, String), CheckError> {
    if let Some(ref provider) = config.provider {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| provider.model().to_string());
        return Ok((Arc::clone(provider), model));
    }

    if let Some(ref name) = config.provider_name {
        let model = model_for_provider(name, config.model.as_deref())?;
        return Ok((create_vision_provider(name, &model)?, model));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return Ok((create_vision_provider(&prov, &model)?, model));
        }
    }

    if std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return Ok((create_vision_provider(DEFAULT_PROVIDER, model)?, model.to_string()));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| CheckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    // The detected provider picks its own model; report that one.
    let model = llm_provider.model().to_string();
    Ok((llm_provider, model))
}
