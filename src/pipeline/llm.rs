//! Page review: send one page image to the grading model.
//!
//! The driver talks to the [`PageReviewer`] trait; [`VlmReviewer`] is the
//! implementation backed by an `edgequake-llm` provider. Prompt text lives in
//! [`crate::prompts`].
//!
//! ## Message Layout
//!
//! Each request is one growing conversation:
//! 1. **System message**: the grader prompt (or the user-supplied override)
//! 2. **Earlier turns** *(carry_context only)*: for every page already
//!    reviewed, its `[Page N]` user message with the page image, then the
//!    model's reply
//! 3. **User message**: `[Page N]` plus the current page PNG
//!
//! Replaying earlier images lets the model grade an answer that started on
//! a previous page, since the grader defers feedback until `END Question X`.
//!
//! There is no retry: a failed or timed-out call is returned as a
//! [`PageError`] and the driver aborts the run.

use crate::config::ReviewConfig;
use crate::error::PageError;
use crate::pipeline::encode;
use crate::pipeline::render::Page;
use crate::prompts::{page_label, GRADER_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw output of one review call.
#[derive(Debug, Clone, Default)]
pub struct Review {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Review {
    /// A review with no token accounting.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Turns one page into feedback text.
///
/// Called once per page, in page order. Takes `&mut self` so an
/// implementation can remember earlier pages of the same document.
#[async_trait]
pub trait PageReviewer: Send {
    async fn review(&mut self, page: &Page) -> Result<Review, PageError>;
}

/// [`PageReviewer`] backed by a vision-capable LLM provider.
pub struct VlmReviewer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    carry_context: bool,
    timeout: Duration,
    /// Conversation so far: alternating page and reply messages.
    history: Vec<ChatMessage>,
}

impl VlmReviewer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ReviewConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| GRADER_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
            carry_context: config.carry_context,
            timeout: Duration::from_secs(config.api_timeout_secs),
            history: Vec::new(),
        }
    }

    fn build_messages(&self, page_message: &ChatMessage) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        if self.carry_context {
            messages.extend(self.history.iter().cloned());
        }
        messages.push(page_message.clone());
        messages
    }
}

fn page_message(page_num: usize, image: ImageData) -> ChatMessage {
    ChatMessage::user_with_images(page_label(page_num), vec![image])
}

#[async_trait]
impl PageReviewer for VlmReviewer {
    async fn review(&mut self, page: &Page) -> Result<Review, PageError> {
        let page_num = page.number;
        let image = encode::encode_page(&page.image).map_err(|e| PageError::ImageEncoding {
            page: page_num,
            detail: e.to_string(),
        })?;

        let user = page_message(page_num, image);
        let messages = self.build_messages(&user);
        debug!("Page {}: sending {} messages", page_num, messages.len());

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Page {}: review call failed: {}", page_num, e);
                return Err(PageError::LlmFailed {
                    page: page_num,
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Page {}: review call timed out", page_num);
                return Err(PageError::Timeout {
                    page: page_num,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        debug!(
            "Page {}: {} input tokens, {} output tokens",
            page_num, response.prompt_tokens, response.completion_tokens
        );

        if self.carry_context {
            self.history.push(user);
            self.history.push(ChatMessage::assistant(response.content.clone()));
        }

        Ok(Review {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the review config.
fn build_options(config: &ReviewConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
