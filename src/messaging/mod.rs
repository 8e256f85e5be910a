//! Catalog product events
//!
//! The catalog publishes `created`, `updated` and `deleted` events on a NATS
//! subject. [`ProductEventConsumer`] applies them to the search index through
//! [`ProductIndexer`](crate::search::ProductIndexer).
//!
//! ```text
//! NATS `product.events` ──▶ NatsMessageStream<ProductEvent>
//!                                   │
//!                                   ▼
//!                         ProductEventConsumer::run
//!                          │                   │
//!              created / updated            deleted
//!                          ▼                   ▼
//!               ProductIndexer::upsert   ProductIndexer::remove
//! ```
//!
//! # Example
//!
//! ```no_run
//! use catalog_search::messaging::{MessagingConfig, NatsEventSource, ProductEventConsumer};
//! use catalog_search::search::{IndexManager, ProductIndexer, SearchConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(IndexManager::new(&SearchConfig::default()).await?);
//!     let consumer = ProductEventConsumer::new(ProductIndexer::new(engine));
//!
//!     let source = NatsEventSource::connect(MessagingConfig::default()).await?;
//!     let mut stream = source.subscribe().await?;
//!     let stats = consumer.run(&mut stream).await;
//!     println!("processed {}, dropped {}", stats.processed, stats.dropped);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod consumer;
mod error;
mod events;
mod nats;
mod traits;

pub use config::MessagingConfig;
pub use consumer::{ConsumerStats, HandleOutcome, ProductEventConsumer};
pub use error::{MessagingError, MessagingResult};
pub use events::{EventKind, ProductEvent};
pub use nats::{NatsEventSource, NatsMessageStream};
pub use traits::MessageStream;
