//! Event system for the Ember runtime.
//!
//! This module provides the core event infrastructure:
//!
//! - [`Event`] - The tagged union of everything the runtime dispatches
//! - [`EventKind`] - Kind classification used as the subscription key
//! - [`GroupMember`] - A member entry carried by group-update events
//!
//! Events are constructed once per occurrence, shared as `Arc<Event>` for the
//! duration of a dispatch, and discarded afterwards. Subscribers get read-only
//! access; nothing mutates an event after construction.

use chrono::{DateTime, Local};

use crate::message::ChatMessage;

// ============================================================================
// Event Kind Classification
// ============================================================================

/// Classification of event kinds.
///
/// Subscriptions are keyed by `EventKind`, so a handler registered for
/// [`EventKind::Message`] sees every [`Event::Message`] without inspecting
/// the payload itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Published exactly once, before the first message or timer dispatch.
    Startup,
    /// Published exactly once, after which nothing else is dispatched.
    Shutdown,
    /// Periodic tick carrying the current local timestamp.
    Timer,
    /// An inbound chat message, before any routing decision.
    Message,
    /// A chat message that matched no trigger word; passthrough plugins
    /// (echo, autoresponders) act on these.
    PlainMessage,
    /// Membership snapshot for a group chat.
    GroupUpdate,
}

// ============================================================================
// Group Members
// ============================================================================

/// One member in a group-update membership snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Stable member identifier on the messaging network.
    pub id: String,
    /// Display name, when the transport provides one.
    pub display_name: Option<String>,
}

// ============================================================================
// Event
// ============================================================================

/// Everything the runtime dispatches, as one tagged union.
///
/// The transport collaborator produces [`Event::Message`] and
/// [`Event::GroupUpdate`]; the runtime itself produces the lifecycle and
/// timer variants, and re-emits unrouted messages as
/// [`Event::PlainMessage`].
#[derive(Debug, Clone)]
pub enum Event {
    /// Startup notification, published before any other event.
    Startup,
    /// Shutdown notification, published after the last other event.
    Shutdown,
    /// Periodic timer tick.
    Timer {
        /// Local timestamp of the tick; scheduler due-checks use this, not
        /// their own clock, so tests can drive time explicitly.
        now: DateTime<Local>,
    },
    /// An inbound chat message.
    Message(ChatMessage),
    /// A chat message the command router declined to route.
    PlainMessage(ChatMessage),
    /// Membership snapshot for a group chat.
    GroupUpdate {
        /// Chat the snapshot belongs to.
        chat_id: String,
        /// Full member set as reported by the transport.
        members: Vec<GroupMember>,
    },
}

impl Event {
    /// Returns the kind used to look up subscriptions for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Startup => EventKind::Startup,
            Event::Shutdown => EventKind::Shutdown,
            Event::Timer { .. } => EventKind::Timer,
            Event::Message(_) => EventKind::Message,
            Event::PlainMessage(_) => EventKind::PlainMessage,
            Event::GroupUpdate { .. } => EventKind::GroupUpdate,
        }
    }

    /// Returns the chat message payload for message-carrying variants.
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            Event::Message(msg) | Event::PlainMessage(msg) => Some(msg),
            _ => None,
        }
    }
}
