//! Channel abstraction for chat I/O.
//!
//! A channel turns a transport into a stream of [`ChatEvent`]s and
//! accepts [`OutboundMessage`]s back. The dispatcher never sees
//! transport details; keyboards travel as abstract [`Controls`] that
//! each channel renders natively.

pub mod telegram;

pub use telegram::TelegramChannel;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;

/// Callback token carried by the inline begin button.
pub const BEGIN_CALLBACK: &str = "start_check";

/// Fallback display name when the transport gives us none.
pub const DEFAULT_DISPLAY_NAME: &str = "Пользователь";

// ── Inbound ─────────────────────────────────────────────────────────

/// How an inbound event arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A slash command ("/start", "/stats", ...).
    Command,
    /// Plain message text.
    Text,
    /// An inline-button press; payload is the callback token.
    Button,
}

/// Unified inbound event from a chat transport.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    /// Chat the event belongs to; sessions are keyed by this.
    pub chat_id: i64,
    pub kind: EventKind,
    /// Command, message text, or callback token.
    pub payload: String,
    /// Sender's display name, for the report.
    pub display_name: String,
    /// Sender's user id, for the admin allow-list.
    pub user_id: i64,
}

impl ChatEvent {
    pub fn new(chat_id: i64, kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            chat_id,
            kind,
            payload: payload.into(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            // In a private chat the sender is the chat.
            user_id: chat_id,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }
}

// ── Outbound ────────────────────────────────────────────────────────

/// Interactive controls attached to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controls {
    /// Reply keyboard: the three answers plus cancel.
    AnswerKeyboard,
    /// Single inline button that starts the questions.
    BeginButton,
    /// Remove any visible reply keyboard.
    RemoveKeyboard,
}

/// Rendered content bound for one chat.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub controls: Option<Controls>,
}

impl OutboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            controls: None,
        }
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = Some(controls);
        self
    }
}

// ── Channel trait ───────────────────────────────────────────────────

/// Stream of inbound events produced by a running channel.
pub type EventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// A chat transport: event source and outbound sink.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging.
    fn name(&self) -> &str;

    /// Start listening and return the inbound event stream.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Deliver one outbound message.
    async fn send(&self, message: OutboundMessage) -> Result<(), ChannelError>;

    /// Verify the transport is reachable.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
