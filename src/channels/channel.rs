//! Channel trait and message types shared by user surfaces.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// A message typed by the parent.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel the message arrived on.
    pub channel: String,
    pub user_id: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            content: content.into(),
            received_at: Utc::now(),
        }
    }
}

/// An assistant message to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Out-of-band notices that are not part of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// A generation call is in flight.
    Thinking(String),
    Status(String),
    /// The last submission failed and was not recorded.
    Error(String),
}

pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A user surface the wizard can converse over.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin reading user input. The stream ends when the user leaves.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn respond(&self, response: OutgoingResponse) -> Result<(), ChannelError>;

    async fn send_status(&self, status: StatusUpdate) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
