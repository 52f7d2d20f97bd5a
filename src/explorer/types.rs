//! Shapes exchanged with the inspection UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{IndexDefinition, StoreDefinition};
use crate::value::KeyPath;

/// Page size used when a query does not name one.
pub const DEFAULT_LIMIT: usize = 50;

/// Number of records returned by a sample when none is requested.
pub const DEFAULT_SAMPLE_SIZE: usize = 3;

/// A database as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDescriptor {
    pub name: String,
    pub version: u64,
    pub store_names: Vec<String>,
    pub store_count: usize,
}

/// Declared secondary index, as reported in a [`StoreSchema`].
pub type IndexDescriptor = IndexDefinition;

/// Schema and live size of an object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSchema {
    pub name: String,
    pub key_path: Option<KeyPath>,
    pub auto_increment: bool,
    pub indexes: Vec<IndexDescriptor>,
    pub record_count: u64,
}

impl StoreSchema {
    pub fn from_definition(definition: &StoreDefinition, record_count: u64) -> Self {
        Self {
            name: definition.name.clone(),
            key_path: definition.key_path.clone(),
            auto_increment: definition.auto_increment,
            indexes: definition.indexes.clone(),
            record_count,
        }
    }

    /// Placeholder reported for a store that could not be inspected.
    pub fn degraded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            auto_increment: false,
            indexes: Vec::new(),
            record_count: 0,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

/// Parameters of a table read.
///
/// The UI's older field names (`sortColumn`, `sortDirection`, `field`) are
/// accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(alias = "field", skip_serializing_if = "Option::is_none")]
    pub search_field: Option<String>,
    #[serde(alias = "sortColumn", skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(alias = "sortDirection", skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn search_field(mut self, field: impl Into<String>) -> Self {
        self.search_field = Some(field.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Page size, with 0 and absent meaning `default_limit`.
    pub fn effective_limit(&self, default_limit: usize) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => default_limit.max(1),
        }
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn effective_direction(&self) -> Direction {
        self.direction.unwrap_or_default()
    }
}

/// Pagination summary of a [`QueryResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    pub fn new(offset: usize, limit: usize, filtered_count: usize) -> Self {
        let limit = limit.max(1);
        let current_page = offset / limit;
        Self {
            current_page,
            total_pages: filtered_count.div_ceil(limit),
            page_size: limit,
            has_next: offset.saturating_add(limit) < filtered_count,
            has_prev: current_page > 0,
        }
    }
}

/// One page of a table read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub data: Vec<Value>,
    /// Size of the store before filtering.
    pub total_count: u64,
    pub filtered_count: usize,
    pub schema: StoreSchema,
    pub page_info: PageInfo,
}
