//! Embedded Tantivy engine

use crate::search::backend::{DeleteOutcome, RawSearchResponse, SearchBackend, SearchRequest};
use crate::search::config::SearchConfig;
use crate::search::document::IndexedProduct;
use crate::search::error::{SearchError, SearchResult};
use crate::search::facets::{FacetAggregations, FacetBucket, FacetDimension, FacetLimits};
use crate::search::query::{Clause, CompiledQuery, SortField, SortOrder, SortSpec, TagDimension};
use crate::search::schema::{self, facet_for, name_words, ProductSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, EmptyQuery, FuzzyTermQuery, Occur, Query, RangeQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{
    DocAddress, DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, SegmentReader,
    TantivyDocument, Term,
};
use tokio::sync::RwLock;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of documents in the index
    pub total_documents: u64,

    /// Number of segments
    pub num_segments: usize,
}

/// Manages the Tantivy product index
pub struct IndexManager {
    index: Index,

    fields: ProductSchema,

    /// Index writer (wrapped in RwLock for thread-safety)
    writer: Arc<RwLock<IndexWriter>>,

    reader: IndexReader,
}

impl IndexManager {
    /// Open the index at `config.index_path`, creating it when absent, or
    /// build one in RAM when no path is configured.
    pub async fn new(config: &SearchConfig) -> SearchResult<Self> {
        let index = match &config.index_path {
            Some(path) => Self::open_or_create(path)?,
            None => Index::create_in_ram(ProductSchema::build().schema),
        };

        schema::register_tokenizers(&index)?;
        let fields = ProductSchema::from_index(&index)?;

        let writer = index
            .writer(config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        // Reloaded explicitly after every commit so writes are visible on return
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        tracing::info!(
            path = ?config.index_path,
            "Product index ready"
        );

        Ok(Self {
            index,
            fields,
            writer: Arc::new(RwLock::new(writer)),
            reader,
        })
    }

    fn open_or_create(path: &Path) -> SearchResult<Index> {
        std::fs::create_dir_all(path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        if path.join("meta.json").exists() {
            Index::open_in_dir(path).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })
        } else {
            Index::create_in_dir(path, ProductSchema::build().schema).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn fields(&self) -> &ProductSchema {
        &self.fields
    }

    /// Get index statistics
    pub fn get_stats(&self) -> SearchResult<IndexStats> {
        let searcher = self.reader.searcher();
        let total_documents = searcher
            .search(&AllQuery, &Count)
            .map_err(|e| SearchError::QueryFailed(format!("Failed to count documents: {}", e)))?
            as u64;

        Ok(IndexStats {
            total_documents,
            num_segments: searcher.segment_readers().len(),
        })
    }

    fn commit(&self, writer: &mut IndexWriter) -> SearchResult<()> {
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.reader
            .reload()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to reload reader: {}", e)))?;
        Ok(())
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.fields.id, id)
    }

    fn contains(&self, id: &str) -> SearchResult<bool> {
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        let count = self
            .reader
            .searcher()
            .search(&query, &Count)
            .map_err(|e| SearchError::QueryFailed(e.to_string()))?;
        Ok(count > 0)
    }

    /// Translate compiled clauses into a Tantivy query
    pub fn build_query(&self, compiled: &CompiledQuery) -> Box<dyn Query> {
        if compiled.is_match_all() {
            return Box::new(AllQuery);
        }

        let subqueries: Vec<(Occur, Box<dyn Query>)> = compiled
            .clauses
            .iter()
            .map(|clause| (Occur::Must, self.clause_query(clause)))
            .collect();

        Box::new(BooleanQuery::new(subqueries))
    }

    fn clause_query(&self, clause: &Clause) -> Box<dyn Query> {
        match clause {
            Clause::FuzzyName { text } => {
                let words = name_words(text);
                if words.is_empty() {
                    return Box::new(EmptyQuery);
                }
                let should: Vec<(Occur, Box<dyn Query>)> = words
                    .into_iter()
                    .map(|word| {
                        let distance = fuzziness_for(&word);
                        let term = Term::from_field_text(self.fields.name, &word);
                        (
                            Occur::Should,
                            Box::new(FuzzyTermQuery::new(term, distance, true)) as Box<dyn Query>,
                        )
                    })
                    .collect();
                Box::new(BooleanQuery::new(should))
            }
            Clause::TagMembership { dimension, slugs } => {
                let field = match dimension {
                    TagDimension::Categories => self.fields.categories,
                    TagDimension::Characters => self.fields.characters,
                };
                let should: Vec<(Occur, Box<dyn Query>)> = slugs
                    .iter()
                    .map(|slug| (Occur::Should, facet_term_query(field, slug)))
                    .collect();
                Box::new(BooleanQuery::new(should))
            }
            Clause::PriceRange { min, max } => {
                let lower = min.map_or(Bound::Unbounded, Bound::Included);
                let upper = max.map_or(Bound::Unbounded, Bound::Included);
                Box::new(RangeQuery::new_u64_bounds(
                    schema::PRICE.to_string(),
                    lower,
                    upper,
                ))
            }
            Clause::Status { value } => facet_term_query(self.fields.status, value),
        }
    }

    fn top_documents(
        &self,
        searcher: &Searcher,
        query: &dyn Query,
        compiled: &CompiledQuery,
        total: u64,
    ) -> SearchResult<Vec<DocAddress>> {
        // The collector preallocates offset + size slots, so the window is
        // clipped to the documents that actually match.
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        if compiled.offset >= total {
            return Ok(Vec::new());
        }
        let size = compiled.size.min(total - compiled.offset);
        let top = TopDocs::with_limit(size).and_offset(compiled.offset);

        let addresses = match compiled.sort {
            None => searcher
                .search(query, &top)
                .map_err(|e| SearchError::QueryFailed(format!("Search execution failed: {}", e)))?
                .into_iter()
                .map(|(_, address)| address)
                .collect(),
            Some(spec) => searcher
                .search(
                    query,
                    &top.custom_score(move |segment: &SegmentReader| sort_key_reader(segment, spec)),
                )
                .map_err(|e| SearchError::QueryFailed(format!("Sorted search failed: {}", e)))?
                .into_iter()
                .map(|(_, address)| address)
                .collect(),
        };

        Ok(addresses)
    }

    fn load_product(&self, searcher: &Searcher, address: DocAddress) -> SearchResult<IndexedProduct> {
        let doc: TantivyDocument = searcher
            .doc(address)
            .map_err(|e| SearchError::QueryFailed(format!("Failed to retrieve doc: {}", e)))?;

        let source = doc
            .get_first(self.fields.source)
            .and_then(|v| v.as_str())
            .ok_or_else(|| SearchError::QueryFailed("Stored document has no source".to_string()))?;

        serde_json::from_str(source)
            .map_err(|e| SearchError::QueryFailed(format!("Corrupt stored document: {}", e)))
    }

    fn aggregate(
        &self,
        searcher: &Searcher,
        query: &dyn Query,
        limits: &FacetLimits,
    ) -> SearchResult<FacetAggregations> {
        let collector_for = |name: &str| {
            let mut collector = FacetCollector::for_field(name);
            collector.add_facet("/");
            collector
        };

        let (categories, characters, statuses) = searcher
            .search(
                query,
                &(
                    collector_for(schema::CATEGORIES),
                    collector_for(schema::CHARACTERS),
                    collector_for(schema::STATUS),
                ),
            )
            .map_err(|e| SearchError::QueryFailed(format!("Facet aggregation failed: {}", e)))?;

        let mut aggregations = FacetAggregations::default();
        for (dimension, counts) in [
            (FacetDimension::Category, categories),
            (FacetDimension::Character, characters),
            (FacetDimension::Status, statuses),
        ] {
            let mut buckets: Vec<FacetBucket> = counts
                .get("/")
                .filter_map(|(facet, count)| {
                    facet
                        .to_path()
                        .last()
                        .map(|value| FacetBucket::new(*value, count))
                })
                .collect();
            sort_buckets(&mut buckets);
            buckets.truncate(limits.get(dimension));
            *aggregations.get_mut(dimension) = buckets;
        }

        Ok(aggregations)
    }
}

#[async_trait]
impl SearchBackend for IndexManager {
    fn name(&self) -> &'static str {
        "tantivy"
    }

    async fn execute(&self, request: &SearchRequest) -> SearchResult<RawSearchResponse> {
        let searcher = self.reader.searcher();
        let query = self.build_query(&request.query);

        let total = searcher
            .search(&*query, &Count)
            .map_err(|e| SearchError::QueryFailed(format!("Count failed: {}", e)))?
            as u64;

        let mut hits = Vec::new();
        if request.wants_documents() {
            for address in self.top_documents(&searcher, &*query, &request.query, total)? {
                hits.push(self.load_product(&searcher, address)?);
            }
        }

        let aggregations = self.aggregate(&searcher, &*query, &request.facet_limits)?;

        Ok(RawSearchResponse {
            hits,
            total,
            aggregations,
        })
    }

    async fn upsert(&self, product: &IndexedProduct) -> SearchResult<()> {
        let document = self.fields.to_document(product)?;

        let mut writer = self.writer.write().await;
        writer.delete_term(self.id_term(&product.id));
        writer
            .add_document(document)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to add document: {}", e)))?;
        self.commit(&mut writer)?;

        tracing::debug!(product_id = %product.id, "Product indexed");
        Ok(())
    }

    async fn delete(&self, id: &str) -> SearchResult<DeleteOutcome> {
        let mut writer = self.writer.write().await;

        if !self.contains(id)? {
            return Ok(DeleteOutcome::NotFound);
        }

        writer.delete_term(self.id_term(id));
        self.commit(&mut writer).map_err(|e| {
            SearchError::DeletionFailed(format!("Failed to commit deletion of {}: {}", id, e))
        })?;

        tracing::debug!(product_id = %id, "Product removed from index");
        Ok(DeleteOutcome::Deleted)
    }
}

fn facet_term_query(field: Field, value: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_facet(field, &facet_for(value)),
        IndexRecordOption::Basic,
    ))
}

/// Edit distance scaled by term length: exact up to 2 chars, 1 edit up to 5,
/// 2 edits beyond.
pub fn fuzziness_for(term: &str) -> u8 {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Highest count first, then value ascending
fn sort_buckets(buckets: &mut [FacetBucket]) {
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum SortValue {
    Missing,
    Unsigned(u64),
    Signed(i64),
    Text(String),
}

/// Sort value wrapped so that the top-k collector, which keeps the highest
/// scores, yields the requested order.
#[derive(Debug, Clone, PartialEq)]
struct SortKey {
    value: SortValue,
    order: SortOrder,
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let ordering = self.value.partial_cmp(&other.value)?;
        Some(match self.order {
            SortOrder::Desc => ordering,
            SortOrder::Asc => ordering.reverse(),
        })
    }
}

fn sort_key_reader(segment: &SegmentReader, spec: SortSpec) -> impl FnMut(DocId) -> SortKey {
    let fast_fields = segment.fast_fields();
    let order = spec.order;

    let price = match spec.field {
        SortField::Price => fast_fields.u64(schema::PRICE).ok(),
        _ => None,
    };
    let created_at = match spec.field {
        SortField::CreatedAt => fast_fields.date(schema::CREATED_AT).ok(),
        _ => None,
    };
    let name = match spec.field {
        SortField::Name => fast_fields.str(schema::NAME_EXACT).ok().flatten(),
        _ => None,
    };

    move |doc: DocId| {
        let value = match spec.field {
            SortField::Price => price
                .as_ref()
                .and_then(|column| column.first(doc))
                .map_or(SortValue::Missing, SortValue::Unsigned),
            SortField::CreatedAt => created_at
                .as_ref()
                .and_then(|column| column.first(doc))
                .map_or(SortValue::Missing, |date| {
                    SortValue::Signed(date.into_timestamp_micros())
                }),
            SortField::Name => name
                .as_ref()
                .and_then(|column| {
                    let ord = column.term_ords(doc).next()?;
                    let mut text = String::new();
                    column.ord_to_str(ord, &mut text).ok()?;
                    Some(SortValue::Text(text))
                })
                .unwrap_or(SortValue::Missing),
        };
        SortKey { value, order }
    }
}
