//! NATS subscription for product events

use crate::messaging::config::MessagingConfig;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::traits::MessageStream;
use async_nats::Client;
use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;

/// Connected NATS client for the configured product subject
pub struct NatsEventSource {
    client: Client,
    config: MessagingConfig,
}

impl NatsEventSource {
    /// Connect to the configured servers
    pub async fn connect(config: MessagingConfig) -> MessagingResult<Self> {
        if config.servers.is_empty() {
            return Err(MessagingError::ConfigurationError(
                "messaging.servers must list at least one NATS server".to_string(),
            ));
        }

        let servers = config.servers.join(",");
        let client = async_nats::ConnectOptions::new()
            .name(config.connection_name.as_str())
            .connect(servers.as_str())
            .await
            .map_err(|e| MessagingError::ConnectionFailed(format!("NATS connection failed: {}", e)))?;

        tracing::info!(servers = %servers, "Connected to NATS");

        Ok(Self { client, config })
    }

    /// Subscribe to the product subject
    pub async fn subscribe<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
    ) -> MessagingResult<NatsMessageStream<T>> {
        let subscriber = self
            .client
            .subscribe(self.config.subject.clone())
            .await
            .map_err(|e| MessagingError::SubscribeFailed(format!("NATS subscribe failed: {}", e)))?;

        tracing::info!(subject = %self.config.subject, "Subscribed to product events");

        Ok(NatsMessageStream::new(subscriber))
    }
}

/// NATS message stream
pub struct NatsMessageStream<T> {
    subscriber: async_nats::Subscriber,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> NatsMessageStream<T> {
    fn new(subscriber: async_nats::Subscriber) -> Self {
        Self {
            subscriber,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send + Sync> MessageStream<T> for NatsMessageStream<T> {
    async fn next(&mut self) -> MessagingResult<Option<T>> {
        match self.subscriber.next().await {
            Some(msg) => {
                let payload: T = serde_json::from_slice(&msg.payload)?;
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }

    async fn ack(&mut self) -> MessagingResult<()> {
        // Core NATS has no acknowledgements
        Ok(())
    }

    async fn nack(&mut self) -> MessagingResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_a_server() {
        let config = MessagingConfig {
            servers: Vec::new(),
            ..Default::default()
        };

        let err = NatsEventSource::connect(config).await.err().unwrap();
        assert!(matches!(err, MessagingError::ConfigurationError(_)));
    }
}
