//! FILENAME: pivot-engine/src/engine.rs
//! Pipeline - Recategorize, filter and aggregate in one call.
//!
//! The pipeline takes the exploded input table and a `PipelineRequest`
//! and produces the aggregation the dashboard plots. Stage outputs are
//! memoized in a `ResultCache` keyed by the input table's content and the
//! definitions that shaped them.

use std::sync::Arc;

use engine::{filter_table, EngineResult, Table};

use crate::aggregate::{aggregate, Aggregation};
use crate::cache::{cache_key, content_hash, ResultCache};
use crate::definition::PipelineRequest;
use crate::recategorize::recategorize;

pub const RECATEGORIZE_OPERATION: &str = "recategorize";
pub const AGGREGATE_OPERATION: &str = "aggregate";

/// Runs the three stages without any caching.
pub fn run_pipeline(table: &Table, request: &PipelineRequest) -> EngineResult<Aggregation> {
    let recategorized = recategorize(table, &request.recategorize)?;
    let filtered = filter_table(&recategorized, &request.filter)?;
    let result = aggregate(&filtered, &request.aggregate)?;
    Ok(apply_view(&result, request))
}

fn apply_view(result: &Aggregation, request: &PipelineRequest) -> Aggregation {
    if request.view.cumulative {
        result.cumulative()
    } else {
        result.clone()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    cache: Option<ResultCache>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            cache: Some(ResultCache::new()),
        }
    }

    /// A pipeline that recomputes every stage on every run.
    pub fn uncached() -> Self {
        Pipeline { cache: None }
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut ResultCache> {
        self.cache.as_mut()
    }

    pub fn run(&mut self, table: &Table, request: &PipelineRequest) -> EngineResult<Aggregation> {
        let Some(cache) = self.cache.as_mut() else {
            log::debug!(target: "PIPELINE", "uncached run over {} rows", table.len());
            return run_pipeline(table, request);
        };

        let table_hash = content_hash(table)?;
        let aggregate_key = cache_key(
            AGGREGATE_OPERATION,
            &(
                table_hash,
                &request.recategorize,
                &request.filter,
                &request.aggregate,
            ),
        )?;

        let result = if let Some(hit) = cache.aggregation(&aggregate_key) {
            hit
        } else {
            let recategorize_key =
                cache_key(RECATEGORIZE_OPERATION, &(table_hash, &request.recategorize))?;
            let recategorized: Arc<Table> = cache
                .table_or_insert_with(recategorize_key, || recategorize(table, &request.recategorize))?;

            let filtered = filter_table(&recategorized, &request.filter)?;
            log::debug!(
                target: "PIPELINE",
                "{} of {} recategorized rows pass the filter",
                filtered.len(),
                recategorized.len()
            );

            cache.aggregation_or_insert_with(aggregate_key, || aggregate(&filtered, &request.aggregate))?
        };

        Ok(apply_view(&result, request))
    }
}
