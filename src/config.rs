//! Configuration types for a homework review run.
//!
//! All review behaviour is controlled through [`ReviewConfig`], built via its
//! [`ReviewConfigBuilder`]. The CLI maps its flags onto the builder; library
//! callers set only what they care about and rely on the defaults for the rest.

use crate::error::CheckError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Provider used together with [`DEFAULT_MODEL`] when `GEMINI_API_KEY` is set.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Configuration for reviewing one PDF.
///
/// # Example
/// ```rust
/// use homework_check::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .dpi(300)
///     .model("gemini-2.5-flash")
///     .validate(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 200.
    ///
    /// Handwritten working needs more pixels than typeset text; 200 keeps
    /// pencil strokes legible while staying well under upload limits.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2400.
    ///
    /// Caps the longest edge independent of DPI so oversized pages cannot
    /// exhaust memory.
    pub max_rendered_pixels: u32,

    /// LLM model identifier. If None, [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the LLM completion. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Per-review-call timeout in seconds. Default: 120.
    ///
    /// An elapsed timeout is a review failure and aborts the run.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses [`crate::prompts::GRADER_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Check every response against the grading format. Default: true.
    ///
    /// A response that fails the check is still written, prefixed with a
    /// `[VALIDATION WARNING: …]` line.
    pub validate: bool,

    /// Send the feedback of earlier pages along with each page. Default: true.
    ///
    /// Answers regularly span a page break; without the earlier feedback the
    /// model cannot tell that page 3 finishes the question started on page 2.
    pub carry_context: bool,

    /// Directory for per-page feedback files.
    ///
    /// If None, `<pdf_stem>_feedback/` next to the PDF is used.
    pub output_dir: Option<PathBuf>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 2400,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            system_prompt: None,
            validate: true,
            carry_context: true,
            output_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("validate", &self.validate)
            .field("carry_context", &self.carry_context)
            .field("output_dir", &self.output_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReviewProgressCallback>"),
            )
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model name recorded in the report header.
    pub fn model_label(&self) -> &str {
        match (&self.model, &self.provider) {
            (Some(m), _) => m,
            (None, Some(_)) => "custom provider",
            (None, None) => DEFAULT_MODEL,
        }
    }
}

/// Builder for [`ReviewConfig`].
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl fmt::Debug for ReviewConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ReviewConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn validate(mut self, v: bool) -> Self {
        self.config.validate = v;
        self
    }

    pub fn carry_context(mut self, v: bool) -> Self {
        self.config.carry_context = v;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, CheckError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(CheckError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_tokens == 0 {
            return Err(CheckError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(CheckError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref prompt) = c.system_prompt {
            if prompt.trim().is_empty() {
                return Err(CheckError::InvalidConfig(
                    "System prompt must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}
