//! # Ember Core
//!
//! Foundation types for the Ember bot runtime.
//!
//! This crate defines the vocabulary shared by the framework, the runtime,
//! and every plugin:
//!
//! - **Event model**: the [`Event`] tagged union and [`EventKind`]
//!   classification used as the subscription key.
//! - **Message model**: [`ChatMessage`], [`Attachment`], and the
//!   [`HistoryEntry`] form kept by the conversation window.
//! - **Capability contracts**: [`SendCapability`] and [`AiCapability`],
//!   the in-process interface to the transport and AI collaborators.
//! - **Error taxonomy**: fatal [`ConfigError`], recovered [`HandlerError`],
//!   and collaborator failures with distinguishable timeouts.
//!
//! Everything here is deliberately inert: no locks, no tasks, no I/O. The
//! moving parts live in `ember-framework` and `ember-runtime`.

pub mod capability;
pub mod error;
pub mod event;
pub mod message;

pub use capability::{AI_SERVICE, AiCapability, SEND_SERVICE, SendCapability};
pub use error::{AiError, ConfigError, HandlerError, HandlerResult, SendError};
pub use event::{Event, EventKind, GroupMember};
pub use message::{Attachment, ChatMessage, HistoryEntry};
