//! Filter model and query compilation
//!
//! [`compile`] turns a [`SearchFilter`] into an engine-neutral
//! [`CompiledQuery`]. Each engine renders the compiled clauses in its own
//! query language.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError, ValidationErrors};

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sortable product attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "price")]
    Price,
    #[strum(serialize = "created_at", serialize = "createdAt")]
    CreatedAt,
}

impl SortField {
    /// Parse a caller-supplied sort key. Unrecognized keys yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

/// Resolved sort instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

/// Tag dimension stored as nested sub-documents on a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagDimension {
    Categories,
    Characters,
}

impl TagDimension {
    /// Name of the nested document path holding this dimension
    pub fn path(&self) -> &'static str {
        match self {
            TagDimension::Categories => "categories",
            TagDimension::Characters => "characters",
        }
    }
}

/// Search filter options
///
/// `None` and blank strings both mean "no constraint" for that field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Free-text match on the product name
    pub name: Option<String>,

    /// Match products carrying any of these category slugs
    pub category_slugs: Option<Vec<String>>,

    /// Match products carrying any of these character slugs
    pub character_slugs: Option<Vec<String>>,

    /// Inclusive lower price bound
    pub min_price: Option<u64>,

    /// Inclusive upper price bound
    pub max_price: Option<u64>,

    /// Exact status value
    pub status: Option<String>,

    /// 1-based page number
    pub page: usize,

    /// Page size
    pub limit: usize,

    /// Raw sort key as supplied by the caller
    pub sort_by: Option<String>,

    pub sort_order: SortOrder,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            name: None,
            category_slugs: None,
            character_slugs: None,
            min_price: None,
            max_price: None,
            status: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }
}

/// Page size used when none is given
pub const DEFAULT_PAGE_SIZE: usize = 24;

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_categories(mut self, slugs: Vec<impl Into<String>>) -> Self {
        self.category_slugs = Some(slugs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_characters(mut self, slugs: Vec<impl Into<String>>) -> Self {
        self.character_slugs = Some(slugs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_price_range(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = order;
        self
    }
}

impl Validate for SearchFilter {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                let mut error = ValidationError::new("price_range");
                error.message = Some(
                    format!("min_price ({}) must not exceed max_price ({})", min, max).into(),
                );
                errors.add("min_price", error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// One conjunct of the compiled boolean query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    /// Approximate match against the autocomplete-analyzed name
    FuzzyName { text: String },

    /// At least one of `slugs` is among the product's tags in `dimension`
    TagMembership {
        dimension: TagDimension,
        slugs: Vec<String>,
    },

    /// Inclusive price bounds; at least one side is set
    PriceRange { min: Option<u64>, max: Option<u64> },

    /// Exact status match
    Status { value: String },
}

/// Engine-neutral query: all clauses must match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub clauses: Vec<Clause>,
    /// `None` keeps the engine's relevance ordering
    pub sort: Option<SortSpec>,
    pub offset: usize,
    pub size: usize,
    /// Clamped page number, echoed back to the caller
    pub page: usize,
}

impl CompiledQuery {
    /// Query with no clauses and no paging, used for aggregation-only passes
    pub fn match_all() -> Self {
        Self {
            clauses: Vec::new(),
            sort: None,
            offset: 0,
            size: 0,
            page: 1,
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Compile a filter into boolean clauses, a sort and a page window
pub fn compile(filter: &SearchFilter) -> CompiledQuery {
    let mut clauses = Vec::new();

    if let Some(name) = non_blank(filter.name.as_deref()) {
        clauses.push(Clause::FuzzyName {
            text: name.to_string(),
        });
    }

    for (dimension, slugs) in [
        (TagDimension::Categories, &filter.category_slugs),
        (TagDimension::Characters, &filter.character_slugs),
    ] {
        let slugs = non_blank_list(slugs.as_deref());
        if !slugs.is_empty() {
            clauses.push(Clause::TagMembership { dimension, slugs });
        }
    }

    if filter.min_price.is_some() || filter.max_price.is_some() {
        clauses.push(Clause::PriceRange {
            min: filter.min_price,
            max: filter.max_price,
        });
    }

    if let Some(status) = non_blank(filter.status.as_deref()) {
        clauses.push(Clause::Status {
            value: status.to_string(),
        });
    }

    let sort = non_blank(filter.sort_by.as_deref()).and_then(|raw| match SortField::parse(raw) {
        Some(field) => Some(SortSpec {
            field,
            order: filter.sort_order,
        }),
        None => {
            tracing::debug!(sort_by = raw, "Unknown sort key, keeping relevance order");
            None
        }
    });

    let page = filter.page.max(1);
    let size = filter.limit.max(1);

    CompiledQuery {
        clauses,
        sort,
        offset: (page - 1).saturating_mul(size),
        size,
        page,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn non_blank_list(values: Option<&[String]>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.unwrap_or_default() {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
