//! Caller-owned memoization of analysis runs.
//!
//! Keyed by (ledger fingerprint, explicit as-of date, config fingerprint).
//! Nothing is cached implicitly: the caller holds the cache and decides when
//! entries are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::AnalysisConfig;
use crate::engine::{fingerprint_table, run};
use crate::error::InsightsError;
use crate::model::{AnalysisResult, LedgerInput};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub table_fingerprint: String,
    pub as_of: Option<NaiveDate>,
    pub config_fingerprint: String,
}

impl CacheKey {
    pub fn new(input: &LedgerInput, config: &AnalysisConfig) -> Result<Self, InsightsError> {
        Ok(Self {
            table_fingerprint: fingerprint_table(input),
            as_of: config.as_of,
            config_fingerprint: config.fingerprint()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<CacheKey, Arc<AnalysisResult>>,
    stats: CacheStats,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for this input/config, running the analysis on a miss.
    /// Failed runs are not cached.
    pub fn get_or_run(
        &mut self,
        config: &AnalysisConfig,
        input: &LedgerInput,
    ) -> Result<Arc<AnalysisResult>, InsightsError> {
        let key = CacheKey::new(input, config)?;
        if let Some(hit) = self.entries.get(&key) {
            self.stats.hits += 1;
            log::debug!("analysis cache hit ({})", key.table_fingerprint);
            return Ok(Arc::clone(hit));
        }

        self.stats.misses += 1;
        let result = Arc::new(run(config, input)?);
        self.entries.insert(key, Arc::clone(&result));
        Ok(result)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<AnalysisResult>> {
        self.entries.get(key).cloned()
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry computed from the given ledger, whatever the config.
    pub fn invalidate_table(&mut self, table_fingerprint: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key.table_fingerprint != table_fingerprint);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
