//! Messaging trait abstractions

use crate::messaging::error::MessagingResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Message stream trait for consuming messages
#[async_trait]
pub trait MessageStream<T: DeserializeOwned>: Send + Sync {
    /// Get the next message from the stream.
    ///
    /// `Ok(None)` means the stream is closed. A body that does not decode
    /// yields `Err(MessagingError::DeserializationError)` and the stream stays
    /// usable.
    async fn next(&mut self) -> MessagingResult<Option<T>>;

    /// Acknowledge message processing
    async fn ack(&mut self) -> MessagingResult<()>;

    /// Negative acknowledge (requeue message)
    async fn nack(&mut self) -> MessagingResult<()>;
}
