//! Tantivy schema for product documents

use crate::search::document::IndexedProduct;
use crate::search::error::{SearchError, SearchResult};
use tantivy::schema::{
    Facet, FacetOptions, Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST,
    INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, NgramTokenizer, SimpleTokenizer, TextAnalyzer, TokenStream};
use tantivy::{DateTime, Index, TantivyDocument};

/// Edge n-gram analyzer applied to each word of the product name
pub const AUTOCOMPLETE_TOKENIZER: &str = "autocomplete";

/// Smallest and largest prefix emitted for a name word
pub const MIN_GRAM: usize = 2;
pub const MAX_GRAM: usize = 20;

pub(crate) const ID: &str = "id";
pub(crate) const NAME: &str = "name";
pub(crate) const NAME_EXACT: &str = "name_exact";
pub(crate) const PRICE: &str = "price";
pub(crate) const STATUS: &str = "status";
pub(crate) const CATEGORIES: &str = "categories";
pub(crate) const CHARACTERS: &str = "characters";
pub(crate) const CREATED_AT: &str = "created_at";
pub(crate) const SOURCE: &str = "source";

/// Field handles of the product schema
#[derive(Debug, Clone)]
pub struct ProductSchema {
    pub schema: Schema,
    pub id: Field,
    pub name: Field,
    pub name_exact: Field,
    pub price: Field,
    pub status: Field,
    pub categories: Field,
    pub characters: Field,
    pub created_at: Field,
    pub source: Field,
}

impl ProductSchema {
    pub fn build() -> Self {
        let mut builder = Schema::builder();

        let name_indexing = TextFieldIndexing::default()
            .set_tokenizer(AUTOCOMPLETE_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqs);

        let id = builder.add_text_field(ID, STRING | STORED);
        let name = builder.add_text_field(
            NAME,
            TextOptions::default().set_indexing_options(name_indexing),
        );
        // Unanalyzed copy of the name, used for lexicographic sorting
        let name_exact = builder.add_text_field(NAME_EXACT, STRING | FAST);
        let price = builder.add_u64_field(PRICE, INDEXED | STORED | FAST);
        let status = builder.add_facet_field(STATUS, FacetOptions::default());
        let categories = builder.add_facet_field(CATEGORIES, FacetOptions::default());
        let characters = builder.add_facet_field(CHARACTERS, FacetOptions::default());
        let created_at = builder.add_date_field(CREATED_AT, INDEXED | STORED | FAST);
        // The product exactly as written, returned verbatim in search hits
        let source = builder.add_text_field(SOURCE, STORED);

        Self {
            schema: builder.build(),
            id,
            name,
            name_exact,
            price,
            status,
            categories,
            characters,
            created_at,
            source,
        }
    }

    /// Resolve the field handles of an index that was created with this schema
    pub fn from_index(index: &Index) -> SearchResult<Self> {
        let schema = index.schema();
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| SearchError::SchemaError(format!("{}: {}", name, e)))
        };

        Ok(Self {
            id: field(ID)?,
            name: field(NAME)?,
            name_exact: field(NAME_EXACT)?,
            price: field(PRICE)?,
            status: field(STATUS)?,
            categories: field(CATEGORIES)?,
            characters: field(CHARACTERS)?,
            created_at: field(CREATED_AT)?,
            source: field(SOURCE)?,
            schema,
        })
    }

    /// Convert a product into a Tantivy document
    pub fn to_document(&self, product: &IndexedProduct) -> SearchResult<TantivyDocument> {
        let mut doc = TantivyDocument::default();

        doc.add_text(self.id, &product.id);
        for word in name_words(&product.name) {
            doc.add_text(self.name, &word);
        }
        doc.add_text(self.name_exact, &product.name);
        doc.add_u64(self.price, product.price);
        doc.add_facet(self.status, facet_for(&product.status));
        for slug in product.category_slugs() {
            doc.add_facet(self.categories, facet_for(slug));
        }
        for slug in product.character_slugs() {
            doc.add_facet(self.characters, facet_for(slug));
        }
        doc.add_date(
            self.created_at,
            DateTime::from_timestamp_micros(product.created_at.timestamp_micros()),
        );
        doc.add_text(self.source, serde_json::to_string(product)?);

        Ok(doc)
    }
}

/// Facet holding a single value under the root, e.g. `/kitchen`
pub fn facet_for(value: &str) -> Facet {
    Facet::from_path(vec![value])
}

/// Register the analyzers the schema refers to
pub fn register_tokenizers(index: &Index) -> SearchResult<()> {
    let edge_ngrams = NgramTokenizer::new(MIN_GRAM, MAX_GRAM, true)
        .map_err(|e| SearchError::SchemaError(format!("Invalid n-gram settings: {}", e)))?;

    let autocomplete = TextAnalyzer::builder(edge_ngrams)
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(AUTOCOMPLETE_TOKENIZER, autocomplete);

    Ok(())
}

/// Split text into lowercase words the way the query side does
pub fn name_words(text: &str) -> Vec<String> {
    let mut analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    let mut stream = analyzer.token_stream(text);

    let mut words = Vec::new();
    while stream.advance() {
        words.push(stream.token().text.clone());
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_schema_fields() {
        let schema = ProductSchema::build();
        for name in [ID, NAME, NAME_EXACT, PRICE, STATUS, CATEGORIES, CHARACTERS, CREATED_AT, SOURCE] {
            assert!(schema.schema.get_field(name).is_ok(), "missing field {}", name);
        }
    }

    #[test]
    fn test_from_index_resolves_same_fields() {
        let built = ProductSchema::build();
        let index = Index::create_in_ram(built.schema.clone());
        let resolved = ProductSchema::from_index(&index).unwrap();
        assert_eq!(resolved.name_exact, built.name_exact);
        assert_eq!(resolved.source, built.source);
    }

    #[test]
    fn test_name_words() {
        assert_eq!(name_words("Totoro Plush, Large"), vec!["totoro", "plush", "large"]);
        assert!(name_words("  --  ").is_empty());
    }

    #[test]
    fn test_facet_values_with_separators() {
        let facet = facet_for("a/b");
        assert_eq!(facet.to_path(), vec!["a/b"]);
    }

    #[test]
    fn test_document_conversion() {
        let schema = ProductSchema::build();
        let product = IndexedProduct {
            id: "p1".to_string(),
            name: "Spirited Mug".to_string(),
            price: 1200,
            status: "active".to_string(),
            created_at: Utc::now(),
            images: vec![],
            categories: vec![],
            characters: vec![],
        };

        let doc = schema.to_document(&product).unwrap();
        assert_eq!(doc.get_all(schema.name).count(), 2);
        assert_eq!(doc.get_all(schema.source).count(), 1);
    }
}
