//! CLI binary for homework-check.
//!
//! A thin shim over the library crate that maps CLI flags to `ReviewConfig`,
//! shows progress, and prints or saves the report.

use anyhow::{Context, Result};
use clap::Parser;
use homework_check::{
    check, check_to_file, CheckError, ProgressCallback, ReviewConfig, ReviewOutput,
    ReviewProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a bar at the bottom plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the page currently under review.
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Start as a spinner; `on_review_start` switches to a bar once the
    /// page count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering PDF pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut g| g.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_review_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reviewing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reviewing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut g) = self.page_started.lock() {
            *g = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_warning(&self, page_num: usize, total: usize, warning: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("⚠"),
            page_num,
            total,
            yellow(&truncate(warning, 80)),
        ));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, feedback_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{feedback_len:>5} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&truncate(error, 80)),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.abandon();
    }

    fn on_review_complete(&self, total_pages: usize, warned_pages: usize) {
        self.bar.finish_and_clear();
        if warned_pages == 0 {
            eprintln!(
                "{} {} pages reviewed",
                green("✔"),
                bold(&total_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages reviewed  ({} with format warnings)",
                yellow("⚠"),
                bold(&total_pages.to_string()),
                yellow(&warned_pages.to_string()),
            );
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review and print the report to stdout
  homework-check --pdf_path homework.pdf

  # Save the report; per-page files go to homework_feedback/
  homework-check --pdf_path homework.pdf --output_path feedback.txt

  # Another model, no format validation
  homework-check -p homework.pdf -m gpt-4.1 --provider openai --no-validate

  # Per-page files somewhere else
  homework-check -p hw3.pdf -o out/report.txt --output_dir out/pages

OUTPUT:
  <output_dir>/page_001.txt … page_NNN.txt   feedback for each page
  <output_path>                              all pages combined, in order

  The run stops at the first page whose review call fails; pages already
  reviewed keep their files.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Provider override (with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL         Model override
  PDFIUM_LIB_PATH         Path to libpdfium
"#;

/// Check homework PDFs for mistakes using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "homework-check",
    version,
    about = "Check homework PDFs for mistakes using Vision LLMs, one page at a time",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path (or HTTP/HTTPS URL) of the homework PDF.
    #[arg(short = 'p', long = "pdf_path", visible_alias = "pdf-path")]
    pdf_path: String,

    /// Save the combined feedback report here instead of printing it.
    #[arg(short = 'o', long = "output_path", visible_alias = "output-path", env = "HOMEWORK_CHECK_OUTPUT")]
    output_path: Option<PathBuf>,

    /// Directory for per-page feedback files (default: <pdf_name>_feedback/).
    #[arg(long = "output_dir", visible_alias = "output-dir", env = "HOMEWORK_CHECK_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// LLM model ID (default: gemini-3-flash-preview; required with --provider other than gemini).
    #[arg(short, long, env = "HOMEWORK_CHECK_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "HOMEWORK_CHECK_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI (72–600). Higher = sharper but larger images.
    #[arg(long, env = "HOMEWORK_CHECK_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "HOMEWORK_CHECK_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long = "system_prompt", visible_alias = "system-prompt", env = "HOMEWORK_CHECK_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long = "max_tokens", visible_alias = "max-tokens", env = "HOMEWORK_CHECK_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "HOMEWORK_CHECK_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Per-page LLM call timeout in seconds.
    #[arg(long = "api_timeout", visible_alias = "api-timeout", env = "HOMEWORK_CHECK_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable response format validation.
    #[arg(long = "no-validate")]
    no_validate: bool,

    /// Review each page without the feedback given on earlier pages.
    #[arg(long = "no-context")]
    no_context: bool,

    /// Print the structured result (JSON) instead of the report.
    #[arg(long, env = "HOMEWORK_CHECK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long = "no-progress", env = "HOMEWORK_CHECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HOMEWORK_CHECK_VERBOSE")]
    verbose: bool,

    /// Suppress progress output.
    #[arg(short, long, env = "HOMEWORK_CHECK_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", red("Error:"), e);
        if extraction_failed(&e) {
            eprintln!("{}", dim("The PDF could not be read; nothing was sent for review."));
        }
        std::process::exit(1);
    }
}

/// True when the run stopped before any page reached the model.
fn extraction_failed(e: &anyhow::Error) -> bool {
    e.downcast_ref::<CheckError>()
        .is_some_and(CheckError::is_extraction)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the per-page feedback, so library INFO logs
    // are muted while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ReviewProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run review ───────────────────────────────────────────────────────
    let output = match cli.output_path {
        Some(ref path) => check_to_file(&cli.pdf_path, path, &config)
            .await
            .context("Review failed")?,
        None => check(&cli.pdf_path, &config)
            .await
            .context("Review failed")?,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output_path.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.report.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_summary(&output, cli.output_path.as_ref());
    }

    Ok(())
}

fn print_summary(output: &ReviewOutput, report_path: Option<&PathBuf>) {
    eprintln!(
        "   per-page feedback  →  {}",
        bold(&output.feedback_dir.display().to_string())
    );
    if let Some(path) = report_path {
        eprintln!("   report             →  {}", bold(&path.display().to_string()));
    }
    if !output.open_questions.is_empty() {
        eprintln!(
            "{} Questions still open at end of document: {}",
            yellow("⚠"),
            output.open_questions.join(", ")
        );
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms total",
        dim(&output.stats.total_input_tokens.to_string()),
        dim(&output.stats.total_output_tokens.to_string()),
        output.stats.total_duration_ms,
    );
}

/// Map CLI args to `ReviewConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReviewConfig> {
    let mut builder = ReviewConfig::builder()
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .validate(!cli.no_validate)
        .carry_context(!cli.no_context);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
