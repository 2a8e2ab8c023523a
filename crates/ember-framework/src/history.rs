//! Per-chat conversation windows: bounded history plus pinned context.
//!
//! Every chat gets two independent stores:
//!
//! - **Rolling history** - every inbound and outbound message, capped at a
//!   configured length with FIFO eviction. Attrition is governed *only* by
//!   the cap; nothing else ever removes history.
//! - **Pinned context** - entries a user explicitly selected for the next
//!   AI call. Unbounded, never evicted by the cap, emptied only by
//!   [`ContextManager::clear`] or (when `consume_pinned` is set) after
//!   being handed to the AI once.
//!
//! The asymmetry is intentional: pinned context is a user-directed override
//! of "what counts as context", while rolling history is an always-available
//! but potentially stale log gated by recency: [`get_context_for_ai`]
//! (see [`ContextManager::get_context_for_ai`]) only returns the most recent
//! contiguous run of entries whose gaps stay within the expiry threshold,
//! treating a larger gap as the start of a new conversation.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use ember_core::HistoryEntry;

/// The original bot capped pin-by-index lookups at the ten most recent
/// entries; kept so a typo like `addctx,100` can't pin half the window.
const MAX_PIN_INDEX: usize = 10;

#[derive(Default)]
struct ConversationWindow {
    history: VecDeque<HistoryEntry>,
    pinned: Vec<HistoryEntry>,
}

/// Owner of all per-chat conversation windows.
pub struct ContextManager {
    windows: RwLock<HashMap<String, ConversationWindow>>,
    cap: usize,
    consume_pinned: bool,
}

impl ContextManager {
    /// Creates a manager with the given history cap per chat.
    ///
    /// `consume_pinned` selects the pinned-context policy: `true` empties a
    /// chat's pinned entries after they are returned once by
    /// [`get_context_for_ai`](Self::get_context_for_ai); `false` keeps them
    /// until an explicit [`clear`](Self::clear).
    pub fn new(cap: usize, consume_pinned: bool) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            cap,
            consume_pinned,
        }
    }

    /// Appends `entry` to the chat's history, evicting the oldest entry when
    /// the cap is exceeded.
    pub fn record(&self, chat_id: &str, entry: HistoryEntry) {
        let mut windows = self.windows.write();
        let window = windows.entry(chat_id.to_string()).or_default();
        window.history.push_back(entry);
        while window.history.len() > self.cap {
            window.history.pop_front();
        }
    }

    /// Appends `entries` to the chat's pinned context.
    pub fn pin(&self, chat_id: &str, entries: Vec<HistoryEntry>) {
        if entries.is_empty() {
            return;
        }
        let mut windows = self.windows.write();
        let window = windows.entry(chat_id.to_string()).or_default();
        window.pinned.extend(entries);
    }

    /// Pins history entries addressed by 1-based index from the most recent,
    /// skipping the newest entry (which is the pin command itself).
    ///
    /// Out-of-range indices and indices above [`MAX_PIN_INDEX`] are ignored.
    /// Returns how many entries were pinned.
    pub fn pin_from_history(&self, chat_id: &str, indices: &[usize]) -> usize {
        let mut windows = self.windows.write();
        let Some(window) = windows.get_mut(chat_id) else {
            return 0;
        };
        let len = window.history.len();
        let mut pinned = 0;
        for &index in indices {
            if (1..=MAX_PIN_INDEX).contains(&index) && index < len {
                let entry = window.history[len - 1 - index].clone();
                window.pinned.push(entry);
                pinned += 1;
            }
        }
        debug!(chat = %chat_id, pinned, "Pinned history entries");
        pinned
    }

    /// Empties the chat's pinned context and returns how many entries were
    /// dropped. The rolling history is never touched.
    pub fn clear(&self, chat_id: &str) -> usize {
        let mut windows = self.windows.write();
        windows
            .get_mut(chat_id)
            .map(|w| std::mem::take(&mut w.pinned).len())
            .unwrap_or(0)
    }

    /// Returns the pinned context followed by the most recent contiguous run
    /// of history entries, oldest first.
    ///
    /// The run is found by walking the history backward from the newest
    /// entry: as soon as the gap between two consecutive entries, or
    /// between the newest entry and `now`, exceeds `expiry_threshold`, the
    /// walk stops and everything older is excluded (it stays in history for
    /// future turns). With `consume_pinned` set, the chat's pinned entries
    /// are emptied after being returned.
    pub fn get_context_for_ai(
        &self,
        chat_id: &str,
        now: DateTime<Utc>,
        expiry_threshold: Duration,
    ) -> Vec<HistoryEntry> {
        let threshold = chrono::Duration::from_std(expiry_threshold)
            .unwrap_or_else(|_| chrono::Duration::MAX);

        let mut windows = self.windows.write();
        let Some(window) = windows.get_mut(chat_id) else {
            return Vec::new();
        };

        let mut start = window.history.len();
        let mut newer = now;
        for (i, entry) in window.history.iter().enumerate().rev() {
            if newer.signed_duration_since(entry.timestamp) > threshold {
                break;
            }
            start = i;
            newer = entry.timestamp;
        }

        let mut context: Vec<HistoryEntry> = if self.consume_pinned {
            std::mem::take(&mut window.pinned)
        } else {
            window.pinned.clone()
        };
        context.extend(window.history.iter().skip(start).cloned());
        context
    }

    /// Snapshot of the chat's rolling history, oldest first.
    pub fn history_snapshot(&self, chat_id: &str) -> Vec<HistoryEntry> {
        self.windows
            .read()
            .get(chat_id)
            .map(|w| w.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the chat's pinned context, in pin order.
    pub fn pinned_snapshot(&self, chat_id: &str) -> Vec<HistoryEntry> {
        self.windows
            .read()
            .get(chat_id)
            .map(|w| w.pinned.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("chats", &self.windows.read().len())
            .field("cap", &self.cap)
            .field("consume_pinned", &self.consume_pinned)
            .finish()
    }
}
