//! Faceted product catalog search
//!
//! - [`search`]: filter compilation, the engine seam, the two-pass facet merge
//! - [`messaging`]: catalog events that keep the index current
//! - [`api`]: the HTTP surface

pub mod api;
pub mod config;
pub mod error;
pub mod messaging;
pub mod metrics;
pub mod search;

pub use error::{AppError, Result};
