//! The external chat destination.

use async_trait::async_trait;

use crate::common::error::SinkError;
use crate::common::RelayMessage;

/// Somewhere classified broadcasts are published, usually a Discord channel.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn publish(&self, message: &RelayMessage) -> Result<(), SinkError>;
}
