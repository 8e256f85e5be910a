//! Product documents and inbound payload normalization

use crate::search::error::{SearchError, SearchResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A category or character attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// A product as held by the search index
///
/// The index is a projection of the upstream catalog. Documents are keyed by
/// `id` and a second write for the same id replaces the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedProduct {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub categories: Vec<Tag>,
    #[serde(default)]
    pub characters: Vec<Tag>,
}

impl IndexedProduct {
    /// Distinct category slugs, in first-seen order
    pub fn category_slugs(&self) -> Vec<&str> {
        distinct_slugs(&self.categories)
    }

    /// Distinct character slugs, in first-seen order
    pub fn character_slugs(&self) -> Vec<&str> {
        distinct_slugs(&self.characters)
    }
}

fn distinct_slugs(tags: &[Tag]) -> Vec<&str> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.slug.as_str())
        .filter(|slug| seen.insert(*slug))
        .collect()
}

/// A scalar that some producers wrap in a one-element array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrList<T> {
    Scalar(T),
    List(Vec<T>),
}

impl<T> ScalarOrList<T> {
    /// The scalar itself, or the first element of the list
    pub fn into_scalar(self) -> Option<T> {
        match self {
            ScalarOrList::Scalar(value) => Some(value),
            ScalarOrList::List(values) => values.into_iter().next(),
        }
    }
}

/// Upstream identifiers arrive either as strings or as integers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Text(String),
    Number(i64),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Text(s) => f.write_str(s),
            Identifier::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Product data as delivered by the catalog event stream
///
/// Every field is optional here; [`ProductPayload::normalize`] decides what a
/// complete product is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    pub id: Option<ScalarOrList<Identifier>>,
    #[serde(default)]
    pub name: Option<ScalarOrList<String>>,
    #[serde(default)]
    pub price: Option<ScalarOrList<u64>>,
    #[serde(default)]
    pub status: Option<ScalarOrList<String>>,
    #[serde(default)]
    pub created_at: Option<ScalarOrList<DateTime<Utc>>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<Tag>>,
    #[serde(default)]
    pub characters: Option<Vec<Tag>>,
}

impl ProductPayload {
    /// The product id, flattened and trimmed; `None` when missing or blank
    pub fn product_id(&self) -> Option<String> {
        self.id
            .clone()
            .and_then(ScalarOrList::into_scalar)
            .map(|id| id.to_string().trim().to_string())
            .filter(|id| !id.is_empty())
    }

    /// Flatten single-element arrays into scalars and check that the product
    /// is complete enough to index.
    pub fn normalize(self) -> SearchResult<IndexedProduct> {
        let id = self
            .product_id()
            .ok_or_else(|| missing("id"))?;
        let name = required(self.name, "name")?;
        let price = required(self.price, "price")?;
        let status = required(self.status, "status")?;
        let created_at = required(self.created_at, "created_at")?;

        if status.trim().is_empty() {
            return Err(SearchError::InvalidDocument(format!(
                "product {} has a blank status",
                id
            )));
        }

        Ok(IndexedProduct {
            id,
            name,
            price,
            status,
            created_at,
            images: self.images.unwrap_or_default(),
            categories: dedup_tags(self.categories.unwrap_or_default()),
            characters: dedup_tags(self.characters.unwrap_or_default()),
        })
    }
}

fn required<T>(value: Option<ScalarOrList<T>>, field: &str) -> SearchResult<T> {
    value
        .and_then(ScalarOrList::into_scalar)
        .ok_or_else(|| missing(field))
}

fn missing(field: &str) -> SearchError {
    SearchError::InvalidDocument(format!("missing field `{}`", field))
}

/// Trim slugs, drop blank ones and keep the first tag per slug
fn dedup_tags(tags: Vec<Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|tag| {
            let slug = tag.slug.trim();
            if slug.is_empty() || !seen.insert(slug.to_string()) {
                return None;
            }
            Some(Tag::new(tag.name, slug))
        })
        .collect()
}
