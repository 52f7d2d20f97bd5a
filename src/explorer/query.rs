//! Filtered, sorted and paginated reads.

use serde_json::Value;

use super::search::{SearchFilter, filter_records};
use super::sort::SortPlan;
use super::{Explorer, PageInfo, QueryOptions, QueryResult, StoreSchema, require_store};
use crate::engine::{Connection, Engine, EngineError, StoreTransaction, TransactionMode};
use crate::error::Result;
use crate::logging::{debug, warn};

/// The `[offset, offset + limit)` slice of `records`.
pub fn paginate(records: Vec<Value>, offset: usize, limit: usize) -> Vec<Value> {
    records.into_iter().skip(offset).take(limit).collect()
}

/// Run a query inside an open transaction.
pub(crate) fn run<T: StoreTransaction>(
    tx: &T,
    options: &QueryOptions,
    default_limit: usize,
) -> std::result::Result<QueryResult, EngineError> {
    let definition = tx.definition().clone();
    let total_count = tx.count()?;

    let filter = SearchFilter::new(options.search.as_deref(), options.search_field.as_deref());
    let mut records = filter_records(tx.get_all()?, filter.as_ref());

    if let Some(field) = options.order_by.as_deref().filter(|f| !f.is_empty()) {
        let plan = SortPlan::select(&definition, field);
        records = plan.apply(tx, records, filter.as_ref(), field, options.effective_direction())?;
    }

    let filtered_count = records.len();
    let limit = options.effective_limit(default_limit);
    let offset = options.effective_offset();

    Ok(QueryResult {
        data: paginate(records, offset, limit),
        total_count,
        filtered_count,
        schema: StoreSchema::from_definition(&definition, total_count),
        page_info: PageInfo::new(offset, limit, filtered_count),
    })
}

impl<E: Engine> Explorer<E> {
    /// Read one page of `store`.
    pub fn query(&self, database: &str, store: &str, options: &QueryOptions) -> Result<QueryResult> {
        require_store(database, store)?;
        debug!(database, store, ?options, "querying store");
        let connection = self.connection(database)?;
        let tx = connection.transaction(store, TransactionMode::ReadOnly)?;
        Ok(run(&tx, options, self.config.default_limit)?)
    }

    /// The first `size` records of `store` (default sample size when `None`
    /// or 0).
    ///
    /// Failures past argument validation are logged and yield no records.
    pub fn sample(&self, database: &str, store: &str, size: Option<usize>) -> Result<Vec<Value>> {
        require_store(database, store)?;
        let size = size
            .filter(|size| *size > 0)
            .unwrap_or(self.config.sample_size);
        match self.query(database, store, &QueryOptions::new().limit(size)) {
            Ok(result) => Ok(result.data),
            Err(err) => {
                warn!(database, store, error = %err, "failed to read sample");
                Ok(Vec::new())
            }
        }
    }
}
