//! Chat over scraped blog content, with a bounded transcript.
//!
//! Once the transcript grows past the compaction threshold, the whole
//! transcript is folded into a running summary and only the most recent
//! messages are kept. The summary is sent back to the model as a system
//! message on every later turn.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::llm::{ChatMessage, LlmProvider, LlmRequest};

pub mod websocket;

/// Transcript plus running summary for one chat session.
///
/// Every message ever appended is either still in `messages` or folded into
/// `summary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    summary: String,
}

impl ConversationState {
    /// Restore a session from a saved transcript and summary
    pub fn from_parts(messages: Vec<ChatMessage>, summary: impl Into<String>) -> Self {
        Self {
            messages,
            summary: summary.into(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// When to compact and how much to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Compact once the transcript holds strictly more messages than this
    pub threshold: usize,
    /// Most recent messages kept after compaction
    pub retained: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            threshold: 10,
            retained: 2,
        }
    }
}

impl From<&common::ChatConfig> for CompactionPolicy {
    fn from(cfg: &common::ChatConfig) -> Self {
        Self {
            threshold: cfg.compaction_threshold,
            retained: cfg.retained_messages,
        }
    }
}

impl CompactionPolicy {
    pub fn should_compact(&self, message_count: usize) -> bool {
        message_count > self.threshold
    }
}

fn context_prompt(blog_content: &str) -> String {
    format!(
        "You are an AI assistant. Use the following blog content as context to answer the user's questions:\n\n{}",
        blog_content
    )
}

fn summary_prompt(summary: &str) -> String {
    format!("Summary of conversation earlier: {}", summary)
}

fn compaction_instruction(summary: &str) -> String {
    if summary.is_empty() {
        "Create a summary of the conversation above:".to_string()
    } else {
        format!(
            "This is summary of the conversation to date: {}\n\n\
             Extend the summary by taking into account the new messages above:",
            summary
        )
    }
}

/// One chat session driven by a single task.
pub struct Conversation {
    llm: Arc<dyn LlmProvider>,
    policy: CompactionPolicy,
    blog_context: Option<String>,
    state: ConversationState,
}

impl Conversation {
    pub fn new(llm: Arc<dyn LlmProvider>, policy: CompactionPolicy) -> Self {
        Self {
            llm,
            policy,
            blog_context: None,
            state: ConversationState::default(),
        }
    }

    /// Ground every answer in the scraped blog content
    pub fn with_blog_context(mut self, blog_content: impl Into<String>) -> Self {
        let content = blog_content.into();
        self.blog_context = (!content.is_empty()).then_some(content);
        self
    }

    pub fn with_state(mut self, state: ConversationState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Messages sent to the model for the next reply:
    /// `[blog context] + [summary, if any] + transcript`
    fn model_input(&self) -> Vec<ChatMessage> {
        let mut input = Vec::with_capacity(self.state.messages.len() + 2);
        if let Some(content) = &self.blog_context {
            input.push(ChatMessage::system(context_prompt(content)));
        }
        if !self.state.summary.is_empty() {
            input.push(ChatMessage::system(summary_prompt(&self.state.summary)));
        }
        input.extend(self.state.messages.iter().cloned());
        input
    }

    /// Append the user's message, ask the model, append and return the reply.
    ///
    /// If the model call fails the user's message is removed again and the
    /// error is returned.
    pub async fn append_and_respond(&mut self, user_message: &str) -> Result<String> {
        self.state.messages.push(ChatMessage::user(user_message));

        let request = LlmRequest::from_messages(self.model_input());
        match self.llm.generate(request).await {
            Ok(response) => {
                let reply = response.content;
                self.state.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.state.messages.pop();
                Err(PipelineError::Chat {
                    message: format!("{:#}", e),
                })
            }
        }
    }

    /// Fold the transcript into the summary when it has grown past the
    /// threshold. Returns whether compaction happened.
    ///
    /// On failure nothing is changed, so the next call retries.
    pub async fn maybe_compact(&mut self) -> Result<bool> {
        let count = self.state.messages.len();
        if !self.policy.should_compact(count) {
            return Ok(false);
        }

        let mut messages = self.state.messages.clone();
        messages.push(ChatMessage::user(compaction_instruction(&self.state.summary)));

        let response = self
            .llm
            .generate(LlmRequest::from_messages(messages))
            .await
            .map_err(|e| PipelineError::Compaction {
                message: format!("{:#}", e),
            })?;

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(PipelineError::Compaction {
                message: "model returned an empty summary".to_string(),
            });
        }

        let keep_from = count.saturating_sub(self.policy.retained);
        self.state.summary = summary.to_string();
        self.state.messages.drain(..keep_from);

        info!(
            removed = keep_from,
            kept = self.state.messages.len(),
            "conversation compacted"
        );
        debug!(summary_len = self.state.summary.len(), "summary updated");
        Ok(true)
    }

    /// A full chat turn: respond, then compact if needed.
    ///
    /// A failed compaction does not fail the turn; the reply stands and
    /// compaction is retried on the next turn.
    pub async fn turn(&mut self, user_message: &str) -> Result<String> {
        let reply = self.append_and_respond(user_message).await?;
        if let Err(e) = self.maybe_compact().await {
            warn!("{}; keeping {} messages until next turn", e, self.state.messages.len());
        }
        Ok(reply)
    }
}
