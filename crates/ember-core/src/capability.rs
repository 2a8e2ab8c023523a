//! Capability contracts for external collaborators.
//!
//! The runtime never talks to the messaging network or an AI provider
//! directly. Instead, plugins register implementations of these traits in
//! the service registry under well-known names, and consumers resolve them
//! at call time:
//!
//! ```rust,ignore
//! if let Some(ai) = ctx.ai_capability() {
//!     let reply = ai.reply(&prompt, &history, &[]).await?;
//! }
//! ```
//!
//! Absence of a capability is not an error; callers degrade (skip the AI
//! reply, drop the outbound message) rather than crash.

use async_trait::async_trait;

use crate::error::{AiError, SendError};
use crate::message::{Attachment, HistoryEntry};

/// Well-known registry name of the transport send capability.
pub const SEND_SERVICE: &str = "send";

/// Well-known registry name of the AI reply capability.
pub const AI_SERVICE: &str = "ai";

/// Outbound message delivery, implemented by the transport plugin.
#[async_trait]
pub trait SendCapability: Send + Sync {
    /// Delivers `text` (and optional attachments, given as local paths) to
    /// the chat. Implementations report failure instead of panicking; the
    /// caller logs and moves on.
    async fn send(
        &self,
        chat_id: &str,
        text: &str,
        attachments: &[String],
    ) -> Result<(), SendError>;
}

/// Prompt-to-reply generation, implemented by an AI provider plugin.
#[async_trait]
pub trait AiCapability: Send + Sync {
    /// Produces a reply for `prompt` given the conversation `history`
    /// (pinned context first, then the recent window, oldest first).
    ///
    /// Implementations are expected to be slow; the runtime wraps calls in
    /// a bounded timeout and treats expiry as a recoverable failure.
    async fn reply(
        &self,
        prompt: &str,
        history: &[HistoryEntry],
        attachments: &[Attachment],
    ) -> Result<String, AiError>;
}
