//! Grading-format validation of model responses.
//!
//! The grader prompt asks the model to bracket each question with
//! `START Question N` / `END Question N` and to score every question it ends.
//! A page can legitimately contain neither marker (instructions, or the middle
//! of a long answer), only a START, only an END, or both, so the only hard rule
//! is: a response that ENDs a question must carry a 0–5 score.
//!
//! [`FeedbackValidator`] also tracks which questions were started but not yet
//! ended across the whole document.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

static RE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)START Question (\d+)").expect("valid regex"));

static RE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)END Question (\d+)").expect("valid regex"));

/// Accepts `3/5`, `3 / 5`, `Score: 3`, `score 3` and `3 out of 5`.
static RE_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-5])\s*/\s*5\b|\bscore[:\s]+([0-5])\b|\b([0-5])\s+out\s+of\s+5\b")
        .expect("valid regex")
});

/// A response that does not follow the grading format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "response ends question(s) {} but has no score (0-5); expected e.g. '3/5', 'Score: 3' or '3 out of 5'",
        .questions.join(", ")
    )]
    MissingScore { questions: Vec<String> },
}

/// Tracks question markers across the pages of one document.
#[derive(Debug, Default)]
pub struct FeedbackValidator {
    open: BTreeSet<u32>,
}

impl FeedbackValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the markers in `response` and check the score rule.
    ///
    /// Markers are recorded even when the check fails, so a missing score on
    /// one page does not leave the question dangling for the rest of the run.
    pub fn check(&mut self, response: &str) -> Result<(), ValidationError> {
        for n in question_numbers(&RE_START, response) {
            self.open.insert(n);
        }

        let ended = question_numbers(&RE_END, response);
        for n in &ended {
            self.open.remove(n);
        }

        if !ended.is_empty() && !RE_SCORE.is_match(response) {
            return Err(ValidationError::MissingScore {
                questions: ended.iter().map(|n| n.to_string()).collect(),
            });
        }
        Ok(())
    }

    /// Questions that have been started but not ended, in numeric order.
    pub fn open_questions(&self) -> Vec<String> {
        self.open.iter().map(|n| n.to_string()).collect()
    }
}

fn question_numbers(re: &Regex, text: &str) -> Vec<u32> {
    re.captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}
