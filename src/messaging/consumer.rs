//! Applies product events to the search index

use crate::messaging::events::{EventKind, ProductEvent};
use crate::messaging::traits::MessageStream;
use crate::metrics::EVENTS_TOTAL;
use crate::search::{ProductIndexer, SearchResult};

/// What [`ProductEventConsumer::handle`] did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    Indexed(String),
    Removed(String),
    Skipped,
}

/// Counts reported when the stream closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub processed: u64,
    pub dropped: u64,
}

/// Routes catalog events to the indexer
#[derive(Clone)]
pub struct ProductEventConsumer {
    indexer: ProductIndexer,
}

impl ProductEventConsumer {
    pub fn new(indexer: ProductIndexer) -> Self {
        Self { indexer }
    }

    /// Apply one event. Unknown event names are skipped.
    pub async fn handle(&self, event: ProductEvent) -> SearchResult<HandleOutcome> {
        let Some(kind) = event.kind() else {
            tracing::warn!(event = %event.event, "Unknown product event, skipping");
            EVENTS_TOTAL.with_label_values(&["unknown", "skipped"]).inc();
            return Ok(HandleOutcome::Skipped);
        };

        let label = kind.to_string();
        let result = match kind {
            EventKind::Created | EventKind::Updated => self
                .indexer
                .upsert(event.payload)
                .await
                .map(|product| HandleOutcome::Indexed(product.id)),
            EventKind::Deleted => {
                let id = event.payload.product_id().unwrap_or_default();
                self.indexer
                    .remove(&id)
                    .await
                    .map(|_| HandleOutcome::Removed(id))
            }
        };

        let outcome = if result.is_ok() { "success" } else { "error" };
        EVENTS_TOTAL
            .with_label_values(&[label.as_str(), outcome])
            .inc();

        if let Ok(HandleOutcome::Indexed(id) | HandleOutcome::Removed(id)) = &result {
            tracing::debug!(event = %label, product_id = %id, "Product event applied");
        }

        result
    }

    /// Drain a stream until it closes. Bad messages are logged and dropped.
    pub async fn run<S>(&self, stream: &mut S) -> ConsumerStats
    where
        S: MessageStream<ProductEvent> + ?Sized,
    {
        let mut stats = ConsumerStats::default();

        loop {
            match stream.next().await {
                Ok(Some(event)) => {
                    let name = event.event.clone();
                    match self.handle(event).await {
                        Ok(_) => {
                            stats.processed += 1;
                            if let Err(e) = stream.ack().await {
                                tracing::warn!(error = %e, "Failed to acknowledge event");
                            }
                        }
                        Err(e) => {
                            stats.dropped += 1;
                            tracing::error!(event = %name, error = %e, "Failed to apply product event");
                            if let Err(e) = stream.nack().await {
                                tracing::warn!(error = %e, "Failed to reject event");
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    stats.dropped += 1;
                    EVENTS_TOTAL.with_label_values(&["malformed", "error"]).inc();
                    tracing::warn!(error = %e, "Dropping malformed product event");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Product event stream failed");
                    break;
                }
            }
        }

        tracing::info!(
            processed = stats.processed,
            dropped = stats.dropped,
            "Product event stream closed"
        );
        stats
    }
}
