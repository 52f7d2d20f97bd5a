//! Sorting records by a field.
//!
//! Values compare in a total order: valid keys compare by key order, and
//! every non-key value sorts before every key, ranked
//! `missing/null < false < true < object/non-key array` (composites tie).
//! [`SortPlan::select`] picks index-assisted sorting when the store can
//! deliver records already ordered by the field, in-memory sorting
//! otherwise. Both produce the same sequence up to the order of ties.

use std::cmp::Ordering;

use serde_json::Value;

use super::search::{SearchFilter, filter_records};
use super::types::Direction;
use crate::engine::{EngineError, StoreDefinition, StoreTransaction};
use crate::value::{Key, lookup};

/// Position of a value in the sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortRank {
    NonKey(u8),
    Key(Key),
}

fn rank(value: Option<&Value>) -> SortRank {
    match value {
        None | Some(Value::Null) => SortRank::NonKey(0),
        Some(Value::Bool(false)) => SortRank::NonKey(1),
        Some(Value::Bool(true)) => SortRank::NonKey(2),
        Some(other) => Key::from_value(other).map_or(SortRank::NonKey(3), SortRank::Key),
    }
}

/// Compare two (possibly missing) field values.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    rank(a).cmp(&rank(b))
}

/// Compare two records by the value at `field`.
pub fn compare_records(a: &Value, b: &Value, field: &str) -> Ordering {
    compare_values(lookup(a, field), lookup(b, field))
}

/// Stable in-memory sort by `field`.
pub fn sort_records(records: Vec<Value>, field: &str, direction: Direction) -> Vec<Value> {
    // Rank once per record instead of once per comparison.
    let mut ranked: Vec<(SortRank, Value)> = records
        .into_iter()
        .map(|record| (rank(lookup(&record, field)), record))
        .collect();
    match direction {
        Direction::Asc => ranked.sort_by(|(a, _), (b, _)| a.cmp(b)),
        Direction::Desc => ranked.sort_by(|(a, _), (b, _)| b.cmp(a)),
    }
    ranked.into_iter().map(|(_, record)| record).collect()
}

/// A way of producing records ordered by a field.
pub trait SortStrategy {
    /// Order `records` (already filtered by `filter`) by `field`.
    fn sort<T: StoreTransaction>(
        &self,
        tx: &T,
        records: Vec<Value>,
        filter: Option<&SearchFilter>,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Value>, EngineError>;
}

/// Sorts in memory with [`sort_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySort;

impl SortStrategy for MemorySort {
    fn sort<T: StoreTransaction>(
        &self,
        _tx: &T,
        records: Vec<Value>,
        _filter: Option<&SearchFilter>,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Value>, EngineError> {
        Ok(sort_records(records, field, direction))
    }
}

/// Where an index-assisted sort reads its ordered records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    /// The store's own key path is the sort field.
    PrimaryKey,
    /// A non-multi-entry index over the sort field.
    Index(String),
}

/// Reads records in index order.
///
/// Records without a valid key at the field are absent from the index; they
/// are sorted in memory and placed before the indexed records ascending,
/// after them descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSort {
    pub source: IndexSource,
}

impl SortStrategy for IndexSort {
    fn sort<T: StoreTransaction>(
        &self,
        tx: &T,
        records: Vec<Value>,
        filter: Option<&SearchFilter>,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Value>, EngineError> {
        let (unkeyed, keyed): (Vec<Value>, Vec<Value>) = records
            .into_iter()
            .partition(|record| matches!(rank(lookup(record, field)), SortRank::NonKey(_)));

        let mut indexed = match &self.source {
            // Records arrive in primary-key order already.
            IndexSource::PrimaryKey => keyed,
            IndexSource::Index(name) => filter_records(tx.get_all_by_index(name)?, filter),
        };
        let unkeyed = sort_records(unkeyed, field, direction);

        Ok(match direction {
            Direction::Asc => {
                let mut ordered = unkeyed;
                ordered.append(&mut indexed);
                ordered
            }
            Direction::Desc => {
                indexed.reverse();
                indexed.extend(unkeyed);
                indexed
            }
        })
    }
}

/// The sort strategy chosen for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortPlan {
    Index(IndexSort),
    Memory(MemorySort),
}

impl SortPlan {
    /// Choose a strategy from the store's declared capabilities.
    pub fn select(definition: &StoreDefinition, field: &str) -> Self {
        let own_key = definition
            .key_path
            .as_ref()
            .and_then(|path| path.as_single())
            == Some(field);
        if own_key {
            return Self::Index(IndexSort {
                source: IndexSource::PrimaryKey,
            });
        }
        definition
            .indexes
            .iter()
            .find(|index| !index.multi_entry && index.key_path.as_single() == Some(field))
            .map_or(Self::Memory(MemorySort), |index| {
                Self::Index(IndexSort {
                    source: IndexSource::Index(index.name.clone()),
                })
            })
    }

    pub fn apply<T: StoreTransaction>(
        &self,
        tx: &T,
        records: Vec<Value>,
        filter: Option<&SearchFilter>,
        field: &str,
        direction: Direction,
    ) -> Result<Vec<Value>, EngineError> {
        match self {
            Self::Index(strategy) => strategy.sort(tx, records, filter, field, direction),
            Self::Memory(strategy) => strategy.sort(tx, records, filter, field, direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IndexDefinition;
    use crate::value::KeyPath;
    use serde_json::json;

    fn values(records: &[Value], field: &str) -> Vec<Value> {
        records
            .iter()
            .map(|r| lookup(r, field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_mixed_values_follow_total_order() {
        let records = vec![
            json!({"v": "b"}),
            json!({"v": 2}),
            json!({"v": true}),
            json!({}),
            json!({"v": {"x": 1}}),
            json!({"v": false}),
            json!({"v": [1, 2]}),
            json!({"v": -1}),
        ];
        let sorted = sort_records(records, "v", Direction::Asc);
        assert_eq!(
            values(&sorted, "v"),
            vec![
                json!(null),
                json!(false),
                json!(true),
                json!({"x": 1}),
                json!(-1),
                json!(2),
                json!("b"),
                json!([1, 2]),
            ]
        );
    }

    #[test]
    fn test_descending_is_reverse_without_ties() {
        let records: Vec<Value> = [3, 1, 2].iter().map(|n| json!({"n": n})).collect();
        let asc = sort_records(records.clone(), "n", Direction::Asc);
        let mut desc = sort_records(records, "n", Direction::Desc);
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn test_sort_is_stable() {
        let records = vec![
            json!({"id": 1, "g": "a"}),
            json!({"id": 2, "g": "b"}),
            json!({"id": 3, "g": "a"}),
        ];
        let sorted = sort_records(records, "g", Direction::Asc);
        assert_eq!(values(&sorted, "id"), vec![json!(1), json!(3), json!(2)]);
        let sorted = sort_records(sorted, "g", Direction::Desc);
        assert_eq!(values(&sorted, "id"), vec![json!(2), json!(1), json!(3)]);
    }

    #[test]
    fn test_plan_selection() {
        let definition = StoreDefinition::new("users")
            .key_path(KeyPath::Single("id".into()))
            .index(IndexDefinition::new("by_name", KeyPath::Single("name".into())))
            .index(IndexDefinition::new("by_tag", KeyPath::Single("tags".into())).multi_entry())
            .index(IndexDefinition::new(
                "by_pair",
                KeyPath::Compound(vec!["a".into(), "b".into()]),
            ));

        assert_eq!(
            SortPlan::select(&definition, "id"),
            SortPlan::Index(IndexSort { source: IndexSource::PrimaryKey })
        );
        assert_eq!(
            SortPlan::select(&definition, "name"),
            SortPlan::Index(IndexSort { source: IndexSource::Index("by_name".into()) })
        );
        assert_eq!(SortPlan::select(&definition, "tags"), SortPlan::Memory(MemorySort));
        assert_eq!(SortPlan::select(&definition, "a"), SortPlan::Memory(MemorySort));
        assert_eq!(SortPlan::select(&definition, "email"), SortPlan::Memory(MemorySort));
    }
}
