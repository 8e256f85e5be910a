//! Facet buckets and the universe/filtered merge

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use strum::Display;

/// Facet dimensions reported with every search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetDimension {
    Category,
    Character,
    Status,
}

/// A facet value and the number of matching products carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: u64,
}

impl FacetBucket {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Raw per-dimension buckets as returned by one engine pass, in engine order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetAggregations {
    pub categories: Vec<FacetBucket>,
    pub characters: Vec<FacetBucket>,
    pub statuses: Vec<FacetBucket>,
}

impl FacetAggregations {
    pub fn get(&self, dimension: FacetDimension) -> &[FacetBucket] {
        match dimension {
            FacetDimension::Category => &self.categories,
            FacetDimension::Character => &self.characters,
            FacetDimension::Status => &self.statuses,
        }
    }

    pub fn get_mut(&mut self, dimension: FacetDimension) -> &mut Vec<FacetBucket> {
        match dimension {
            FacetDimension::Category => &mut self.categories,
            FacetDimension::Character => &mut self.characters,
            FacetDimension::Status => &mut self.statuses,
        }
    }
}

/// Bucket caps per dimension for one aggregation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetLimits {
    pub categories: usize,
    pub characters: usize,
    pub statuses: usize,
}

impl FacetLimits {
    pub fn new(tag_limit: usize, status_limit: usize) -> Self {
        Self {
            categories: tag_limit,
            characters: tag_limit,
            statuses: status_limit,
        }
    }

    pub fn get(&self, dimension: FacetDimension) -> usize {
        match dimension {
            FacetDimension::Category => self.categories,
            FacetDimension::Character => self.characters,
            FacetDimension::Status => self.statuses,
        }
    }
}

impl Default for FacetLimits {
    fn default() -> Self {
        Self::new(10_000, 100)
    }
}

/// Zero-filled facet lists returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts {
    pub categories: Vec<FacetBucket>,
    pub characters: Vec<FacetBucket>,
    pub statuses: Vec<FacetBucket>,
}

impl FacetCounts {
    pub fn get(&self, dimension: FacetDimension) -> &[FacetBucket] {
        match dimension {
            FacetDimension::Category => &self.categories,
            FacetDimension::Character => &self.characters,
            FacetDimension::Status => &self.statuses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.characters.is_empty() && self.statuses.is_empty()
    }
}

/// Merge one dimension.
///
/// The universe list fixes which values are reported and in what order. Counts
/// come from the filtered pass, and a value the filtered pass did not return
/// is reported with a count of 0. Values present only in the filtered pass
/// are dropped.
pub fn merge_dimension(universe: &[FacetBucket], filtered: &[FacetBucket]) -> Vec<FacetBucket> {
    let counts: HashMap<&str, u64> = filtered
        .iter()
        .map(|b| (b.value.as_str(), b.count))
        .collect();

    let mut seen = HashSet::with_capacity(universe.len());
    universe
        .iter()
        .filter(|b| seen.insert(b.value.as_str()))
        .map(|b| FacetBucket::new(b.value.clone(), counts.get(b.value.as_str()).copied().unwrap_or(0)))
        .collect()
}

/// Merge all three dimensions of a universe pass with a filtered pass
pub fn merge_facets(universe: &FacetAggregations, filtered: &FacetAggregations) -> FacetCounts {
    FacetCounts {
        categories: merge_dimension(&universe.categories, &filtered.categories),
        characters: merge_dimension(&universe.characters, &filtered.characters),
        statuses: merge_dimension(&universe.statuses, &filtered.statuses),
    }
}
