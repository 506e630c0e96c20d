//! Driver integration tests with an in-memory document and a scripted reviewer.
//!
//! No pdfium library or API key is needed: [`MemorySource`] stands in for the
//! PDF extractor and [`ScriptedReviewer`] for the model.

use async_trait::async_trait;
use homework_check::pipeline::write::split_report_pages;
use homework_check::{
    review_document, review_pages, CheckError, OutputPaths, Page, PageError, PageReviewer,
    PageSource, Review, ReviewConfig, ReviewProgressCallback,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test doubles ─────────────────────────────────────────────────────────────

fn blank_page(number: usize) -> Page {
    Page {
        number,
        image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 6, Rgba([255, 255, 255, 255]))),
    }
}

struct MemorySource {
    pages: usize,
}

#[async_trait]
impl PageSource for MemorySource {
    async fn extract_pages(&self, _pdf_path: &Path) -> Result<Vec<Page>, CheckError> {
        Ok((1..=self.pages).map(blank_page).collect())
    }
}

type Script = Box<dyn Fn(usize) -> Result<String, PageError> + Send>;

/// Answers each page from a script and records the order of calls.
struct ScriptedReviewer {
    script: Script,
    calls: Vec<usize>,
}

impl ScriptedReviewer {
    fn new(script: impl Fn(usize) -> Result<String, PageError> + Send + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Vec::new(),
        }
    }

    fn ok_per_page() -> Self {
        Self::new(|n| Ok(format!("OK-{n}")))
    }
}

#[async_trait]
impl PageReviewer for ScriptedReviewer {
    async fn review(&mut self, page: &Page) -> Result<Review, PageError> {
        self.calls.push(page.number);
        (self.script)(page.number).map(|text| Review {
            text,
            input_tokens: 100,
            output_tokens: 10,
        })
    }
}

struct Workspace {
    _tmp: TempDir,
    outputs: OutputPaths,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let outputs = OutputPaths {
            feedback_dir: tmp.path().join("hw_feedback"),
            report_path: Some(tmp.path().join("feedback.txt")),
        };
        Self { _tmp: tmp, outputs }
    }

    fn page_file(&self, n: usize) -> PathBuf {
        self.outputs.feedback_dir.join(format!("page_{n:03}.txt"))
    }

    fn report_path(&self) -> &Path {
        self.outputs.report_path.as_deref().unwrap()
    }

    fn feedback_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.outputs.feedback_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn config() -> ReviewConfig {
    ReviewConfig::builder().model("stub-model").build().unwrap()
}

async fn run(
    pages: usize,
    reviewer: &mut ScriptedReviewer,
    ws: &Workspace,
    config: &ReviewConfig,
) -> Result<homework_check::ReviewOutput, CheckError> {
    review_document(
        &MemorySource { pages },
        reviewer,
        Path::new("hw.pdf"),
        "hw.pdf",
        &ws.outputs,
        config,
    )
    .await
}

// ── Ordering and file layout ─────────────────────────────────────────────────

#[tokio::test]
async fn three_pages_yield_ordered_files_and_report() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::ok_per_page();

    let output = run(3, &mut reviewer, &ws, &config()).await.unwrap();

    assert_eq!(reviewer.calls, vec![1, 2, 3]);
    for n in 1..=3 {
        let body = std::fs::read_to_string(ws.page_file(n)).unwrap();
        assert!(body.contains(&format!("OK-{n}")), "page {n}: {body:?}");
        assert!(body.starts_with(&format!("=== Page {n} Feedback ===")));
    }

    let report = std::fs::read_to_string(ws.report_path()).unwrap();
    assert_eq!(report, output.report);
    let p1 = report.find("OK-1").unwrap();
    let p2 = report.find("OK-2").unwrap();
    let p3 = report.find("OK-3").unwrap();
    assert!(p1 < p2 && p2 < p3);
    assert!(report.contains("Model: stub-model\n"));
    assert!(report.contains("Total Pages: 3\n"));

    assert_eq!(output.pages.len(), 3);
    assert_eq!(output.stats.total_pages, 3);
    assert_eq!(output.stats.total_input_tokens, 300);
    assert_eq!(output.stats.total_output_tokens, 30);
}

#[tokio::test]
async fn writes_exactly_one_file_per_page() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::ok_per_page();

    run(7, &mut reviewer, &ws, &config()).await.unwrap();

    let expected: Vec<String> = (1..=7).map(|n| format!("page_{n:03}.txt")).collect();
    assert_eq!(ws.feedback_files(), expected);
}

#[tokio::test]
async fn report_splits_back_into_page_files() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::new(|n| {
        Ok(format!("START Question {n}\n\nSome remarks.\nEND Question {n}\nScore: 4/5"))
    });

    let output = run(4, &mut reviewer, &ws, &config()).await.unwrap();

    let files: Vec<String> = (1..=4)
        .map(|n| std::fs::read_to_string(ws.page_file(n)).unwrap())
        .collect();
    assert_eq!(split_report_pages(&output.report), files);
}

#[tokio::test]
async fn marker_lines_in_feedback_do_not_break_the_split() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::new(|n| match n {
        1 => Ok("Continuing.\n=== Page 7 Feedback ===\nstill page one".into()),
        2 => Ok("=== Page 3 Feedback ===\nOK-2".into()),
        _ => Ok(format!("OK-{n}")),
    });

    let output = run(3, &mut reviewer, &ws, &config()).await.unwrap();

    let files: Vec<String> = (1..=3)
        .map(|n| std::fs::read_to_string(ws.page_file(n)).unwrap())
        .collect();
    assert!(files[0].contains("\n === Page 7 Feedback ===\nstill page one"));
    assert_eq!(split_report_pages(&output.report), files);
}

#[tokio::test]
async fn feedback_dir_is_created_when_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let outputs = OutputPaths {
        feedback_dir: tmp.path().join("a/b/c_feedback"),
        report_path: None,
    };
    let mut reviewer = ScriptedReviewer::ok_per_page();

    let output = review_pages(
        vec![blank_page(1)],
        &mut reviewer,
        "c.pdf",
        &outputs,
        &config(),
    )
    .await
    .unwrap();

    assert!(outputs.feedback_dir.join("page_001.txt").is_file());
    assert_eq!(output.feedback_dir, outputs.feedback_dir);
}

// ── Edge cases ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_document_is_rejected_before_any_call() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::ok_per_page();

    let err = run(0, &mut reviewer, &ws, &config()).await.unwrap_err();

    assert!(matches!(err, CheckError::EmptyDocument { .. }), "got {err:?}");
    assert!(reviewer.calls.is_empty());
    assert!(!ws.outputs.feedback_dir.exists());
    assert!(!ws.report_path().exists());
}

#[tokio::test]
async fn rerun_is_byte_identical() {
    let ws = Workspace::new();
    let cfg = config();

    let mut first = ScriptedReviewer::ok_per_page();
    run(3, &mut first, &ws, &cfg).await.unwrap();
    let snapshot: Vec<Vec<u8>> = (1..=3)
        .map(|n| std::fs::read(ws.page_file(n)).unwrap())
        .chain(std::iter::once(std::fs::read(ws.report_path()).unwrap()))
        .collect();

    let mut second = ScriptedReviewer::ok_per_page();
    run(3, &mut second, &ws, &cfg).await.unwrap();
    let again: Vec<Vec<u8>> = (1..=3)
        .map(|n| std::fs::read(ws.page_file(n)).unwrap())
        .chain(std::iter::once(std::fs::read(ws.report_path()).unwrap()))
        .collect();

    assert_eq!(snapshot, again);
    assert_eq!(ws.feedback_files().len(), 3);
}

#[tokio::test]
async fn review_failure_aborts_and_keeps_earlier_pages() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::new(|n| {
        if n == 2 {
            Err(PageError::LlmFailed {
                page: n,
                detail: "429 Too Many Requests".into(),
            })
        } else {
            Ok(format!("OK-{n}"))
        }
    });

    let err = run(3, &mut reviewer, &ws, &config()).await.unwrap_err();

    match err {
        CheckError::Review(ref e) => assert_eq!(e.page(), 2),
        other => panic!("expected Review error, got {other:?}"),
    }
    assert_eq!(reviewer.calls, vec![1, 2], "page 3 must not be reviewed");
    assert!(ws.page_file(1).is_file());
    assert!(!ws.page_file(2).exists());
    assert!(!ws.report_path().exists());
}

#[tokio::test]
async fn misnumbered_pages_are_rejected() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::ok_per_page();

    let err = review_pages(
        vec![blank_page(1), blank_page(3)],
        &mut reviewer,
        "hw.pdf",
        &ws.outputs,
        &config(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CheckError::Internal(_)));
    assert_eq!(reviewer.calls, vec![1]);
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_score_is_a_warning_not_a_failure() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::new(|n| match n {
        1 => Ok("START Question 1\nEND Question 1\nLooks fine.".into()),
        _ => Ok("START Question 2\nEND Question 2\nScore: 5/5".into()),
    });

    let output = run(2, &mut reviewer, &ws, &config()).await.unwrap();

    let page1 = std::fs::read_to_string(ws.page_file(1)).unwrap();
    assert!(page1.contains("[VALIDATION WARNING:"), "{page1}");
    assert!(page1.contains("Looks fine."));
    let page2 = std::fs::read_to_string(ws.page_file(2)).unwrap();
    assert!(!page2.contains("VALIDATION WARNING"));

    assert_eq!(output.stats.warned_pages, 1);
    assert!(output.pages[0].warning.is_some());
    assert!(output.report.contains("[VALIDATION WARNING:"));
}

#[tokio::test]
async fn validation_can_be_disabled() {
    let ws = Workspace::new();
    let cfg = ReviewConfig::builder().validate(false).build().unwrap();
    let mut reviewer = ScriptedReviewer::new(|_| Ok("END Question 1 without a grade".into()));

    let output = run(1, &mut reviewer, &ws, &cfg).await.unwrap();

    assert_eq!(output.stats.warned_pages, 0);
    assert!(!std::fs::read_to_string(ws.page_file(1))
        .unwrap()
        .contains("VALIDATION WARNING"));
}

#[tokio::test]
async fn questions_spanning_pages_are_tracked() {
    let ws = Workspace::new();
    let mut reviewer = ScriptedReviewer::new(|n| match n {
        1 => Ok("START Question 1\nSetup is correct so far.".into()),
        2 => Ok("END Question 1\nScore: 4/5\nSTART Question 2".into()),
        _ => Ok("Working continues.".into()),
    });

    let output = run(3, &mut reviewer, &ws, &config()).await.unwrap();

    assert_eq!(output.open_questions, vec!["2".to_string()]);
    assert!(output.report.contains("Open Questions: 2\n"));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl ReviewProgressCallback for EventLog {
    fn on_review_start(&self, total_pages: usize) {
        self.0.lock().unwrap().push(format!("start {total_pages}"));
    }
    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.0.lock().unwrap().push(format!("begin {page_num}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, _len: usize) {
        self.0.lock().unwrap().push(format!("done {page_num}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.0.lock().unwrap().push(format!("error {page_num}"));
    }
    fn on_review_complete(&self, total_pages: usize, warned: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("complete {total_pages} {warned}"));
    }
}

#[tokio::test]
async fn progress_events_follow_page_order() {
    let ws = Workspace::new();
    let log = Arc::new(EventLog::default());
    let cfg = ReviewConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let mut reviewer = ScriptedReviewer::ok_per_page();

    run(2, &mut reviewer, &ws, &cfg).await.unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        vec!["start 2", "begin 1", "done 1", "begin 2", "done 2", "complete 2 0"]
    );
}

#[tokio::test]
async fn progress_reports_the_failing_page() {
    let ws = Workspace::new();
    let log = Arc::new(EventLog::default());
    let cfg = ReviewConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let mut reviewer = ScriptedReviewer::new(|n| Err(PageError::Timeout { page: n, secs: 5 }));

    assert!(run(2, &mut reviewer, &ws, &cfg).await.is_err());

    assert_eq!(*log.0.lock().unwrap(), vec!["start 2", "begin 1", "error 1"]);
}
