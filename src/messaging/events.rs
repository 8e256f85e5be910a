//! Product change events published by the catalog

use crate::search::ProductPayload;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// What happened to the product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

/// A catalog event: the event name plus the product fields at the top level
///
/// ```json
/// {"event": "created", "id": "42", "name": ["Totoro Plush"], "price": 2500, ...}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub event: String,

    #[serde(flatten)]
    pub payload: ProductPayload,
}

impl ProductEvent {
    pub fn new(kind: EventKind, payload: ProductPayload) -> Self {
        Self {
            event: kind.to_string(),
            payload,
        }
    }

    /// `None` for event names this service does not handle
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_str(self.event.trim()).ok()
    }
}
