//! Environment context collection, cached process-wide by database name.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{clock::Clock, error::AppResult, findings::{Category, Finding, Severity}};

const CACHE_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Server-level facts that shape memory-pressure and confidence scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub mysql_version:           String,
    pub buffer_pool_size_bytes:  u64,
    pub innodb_io_capacity:      u64,
    pub innodb_page_size:        u64,
    pub tmp_table_size:          u64,
    pub max_heap_table_size:     u64,
    pub buffer_pool_utilization: f64,
    pub is_cold_cache:           bool,
    pub database_name:           String
}

impl EnvironmentContext {
    pub fn new(database_name: impl Into<String>, buffer_pool_utilization: f64) -> Self {
        let database_name = database_name.into();
        Self {
            mysql_version: "8.0".to_string(),
            buffer_pool_size_bytes: 128 * 1024 * 1024,
            innodb_io_capacity: 200,
            innodb_page_size: 16 * 1024,
            tmp_table_size: 16 * 1024 * 1024,
            max_heap_table_size: 16 * 1024 * 1024,
            buffer_pool_utilization,
            is_cold_cache: buffer_pool_utilization < 0.5,
            database_name
        }
    }
}

/// Environment probe port: reads server-level facts for a database.
pub trait EnvironmentProbe: Send + Sync {
    fn probe(&self, database_name: &str) -> AppResult<EnvironmentContext>;
}

/// Probe that always returns a fixed context, for tests and embedders
/// without a live server variable store.
#[derive(Debug, Clone)]
pub struct StaticEnvironmentProbe(EnvironmentContext);

impl StaticEnvironmentProbe {
    pub fn new(context: EnvironmentContext) -> Self {
        Self(context)
    }
}

impl EnvironmentProbe for StaticEnvironmentProbe {
    fn probe(&self, _database_name: &str) -> AppResult<EnvironmentContext> {
        Ok(self.0.clone())
    }
}

/// Wraps an [`EnvironmentProbe`] with a 5-minute, database-name-keyed
/// cache. Invalidation is lifetime-only — there is no explicit bust.
pub struct EnvironmentCache<'a> {
    probe: &'a dyn EnvironmentProbe,
    clock: &'a dyn Clock,
    entries: Mutex<HashMap<String, (DateTime<Utc>, EnvironmentContext)>>
}

impl<'a> EnvironmentCache<'a> {
    pub fn new(probe: &'a dyn EnvironmentProbe, clock: &'a dyn Clock) -> Self {
        Self {
            probe,
            clock,
            entries: Mutex::new(HashMap::new())
        }
    }

    pub fn get(&self, database_name: &str) -> AppResult<EnvironmentContext> {
        let now = self.clock.now();
        {
            let entries = self.entries.lock().expect("environment cache lock poisoned");
            if let Some((fetched_at, context)) = entries.get(database_name) {
                let age = now.signed_duration_since(*fetched_at);
                if age.to_std().map(|d| d < CACHE_LIFETIME).unwrap_or(false) {
                    return Ok(context.clone());
                }
            }
        }

        let context = self.probe.probe(database_name)?;
        let mut entries = self.entries.lock().expect("environment cache lock poisoned");
        entries.insert(database_name.to_string(), (now, context.clone()));
        Ok(context)
    }
}

/// Emits a finding when the buffer pool is running cold, which skews
/// execution-time comparisons for every other analyzer this run.
pub fn analyze(context: &EnvironmentContext) -> Vec<Finding> {
    if context.is_cold_cache {
        vec![
            Finding::new(
                Severity::Info,
                Category::ENVIRONMENT,
                "Cold buffer pool",
                format!(
                    "Buffer pool utilization is {:.0}%, below the 50% warm threshold — \
                     execution time for this run may not reflect steady-state performance",
                    context.buffer_pool_utilization * 100.0
                )
            )
        ]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrozenClock;

    #[test]
    fn cold_cache_below_half_utilization() {
        let context = EnvironmentContext::new("app", 0.3);
        assert!(context.is_cold_cache);
        let findings = analyze(&context);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn warm_cache_emits_no_finding() {
        let context = EnvironmentContext::new("app", 0.8);
        assert!(!context.is_cold_cache);
        assert!(analyze(&context).is_empty());
    }

    #[test]
    fn cache_reuses_entry_within_lifetime() {
        let probe = StaticEnvironmentProbe::new(EnvironmentContext::new("app", 0.9));
        let clock = FrozenClock::at_epoch_plus_days(0);
        let cache = EnvironmentCache::new(&probe, &clock);
        let first = cache.get("app").unwrap();
        let second = cache.get("app").unwrap();
        assert_eq!(first.database_name, second.database_name);
    }
}
