//! Chat message model shared between the runtime and its collaborators.
//!
//! [`ChatMessage`] is the normalized representation of one inbound or
//! outbound message; [`HistoryEntry`] is the trimmed form the conversation
//! window keeps and the AI collaborator receives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Attachment
// ============================================================================

/// A file attachment carried by a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type as reported by the transport.
    pub content_type: String,
    /// Transport-side attachment identifier.
    pub id: String,
    /// Size in bytes.
    pub size: u64,
    /// Original filename, if the transport preserved one.
    pub filename: Option<String>,
    /// Caption attached alongside the file.
    pub caption: Option<String>,
}

// ============================================================================
// ChatMessage
// ============================================================================

/// Standardized representation of a chat message.
///
/// `chat_id` identifies the conversation (the group for group chats, the
/// peer for direct chats); `sender_id` is always the individual author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The conversation this message belongs to.
    pub chat_id: String,
    /// The author of the message.
    pub sender_id: String,
    /// Plain text content. Empty for attachment-only messages.
    pub text: String,
    /// Attachments carried with the message.
    pub attachments: Vec<Attachment>,
    /// Text of a quoted message, when the sender replied to one.
    pub quoted_text: Option<String>,
    /// Transport timestamp of the message.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a text-only message with no attachments or quote.
    pub fn new(
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            attachments: Vec::new(),
            quoted_text: None,
            timestamp,
        }
    }

    /// Attaches a quoted text to the message (builder style).
    pub fn with_quote(mut self, quoted_text: impl Into<String>) -> Self {
        self.quoted_text = Some(quoted_text.into());
        self
    }

    /// Attaches files to the message (builder style).
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Converts this message into the entry form kept by the conversation
    /// window.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            sender: self.sender_id.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp,
        }
    }
}

// ============================================================================
// HistoryEntry
// ============================================================================

/// One line of conversation history.
///
/// This is what the bounded per-chat window stores and what
/// [`AiCapability`](crate::capability::AiCapability) receives as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Display identity of the author (a sender ID or the assistant name).
    pub sender: String,
    /// Text content of the entry.
    pub text: String,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates a new history entry.
    pub fn new(
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_history_entry_keeps_sender_and_text() {
        let ts = Utc::now();
        let msg = ChatMessage::new("chat-1", "alice", "hello", ts)
            .with_quote("earlier text");
        let entry = msg.to_history_entry();
        assert_eq!(entry.sender, "alice");
        assert_eq!(entry.text, "hello");
        assert_eq!(entry.timestamp, ts);
    }
}
