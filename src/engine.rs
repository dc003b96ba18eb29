//! The engine: owns the five ports plus configuration, and exposes the
//! two public entry points (`analyze`, `diagnose`) that front the
//! pipeline for callers.

use crate::{
    analyzers::{EnvironmentCache, EnvironmentProbe},
    baseline::BaselineStore,
    clock::Clock,
    config::Config,
    driver::Driver,
    error::AppResult,
    pipeline::{DiagnosticPipeline, PipelineContext, PipelineOutcome},
    report::DiagnosticReport,
    validation::ValidationFailure
};

/// Either the full report, or the validation failure that aborted the run
/// before any scoring happened.
pub enum Diagnosis {
    Report(Box<DiagnosticReport>),
    ValidationFailed(ValidationFailure)
}

impl From<PipelineOutcome> for Diagnosis {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Report(report) => Diagnosis::Report(report),
            PipelineOutcome::ValidationFailed(failure) => Diagnosis::ValidationFailed(failure)
        }
    }
}

/// Wires the five ports (driver, schema, baseline store, clock,
/// environment probe) to a configuration and exposes the public
/// diagnosis API. Every field is a trait object so callers can swap in
/// their own implementations without the engine depending on any
/// particular database client.
pub struct Engine {
    driver:            Box<dyn Driver>,
    introspector:      Box<dyn crate::schema::SchemaIntrospector>,
    store:             Box<dyn BaselineStore>,
    clock:             Box<dyn Clock>,
    environment_probe: Box<dyn EnvironmentProbe>,
    config:            Config,
    database_name:     String,
    environment_name:  String
}

impl Engine {
    /// `database_name` is passed through to the environment probe on every
    /// call; `environment_name` gates opt-in hypothetical-index simulation
    /// against `config.hypothetical_index.allowed_environments`.
    pub fn new(
        driver: Box<dyn Driver>,
        introspector: Box<dyn crate::schema::SchemaIntrospector>,
        store: Box<dyn BaselineStore>,
        clock: Box<dyn Clock>,
        environment_probe: Box<dyn EnvironmentProbe>,
        config: Config,
        database_name: impl Into<String>,
        environment_name: impl Into<String>
    ) -> Self {
        Self {
            driver,
            introspector,
            store,
            clock,
            environment_probe,
            config,
            database_name: database_name.into(),
            environment_name: environment_name.into()
        }
    }

    /// The fast pass: scoring and the nine built-in rules, skipping every
    /// deep analyzer. Use this for a quick pass/fail read on a query
    /// without the cost of baseline lookups or environment probing.
    pub fn analyze(&self, sql: &str) -> AppResult<Diagnosis> {
        let environment_cache = EnvironmentCache::new(self.environment_probe.as_ref(), self.clock.as_ref());
        let ctx = PipelineContext {
            driver: self.driver.as_ref(),
            introspector: self.introspector.as_ref(),
            store: self.store.as_ref(),
            clock: self.clock.as_ref(),
            environment_cache: &environment_cache,
            database_name: &self.database_name,
            environment_name: &self.environment_name
        };
        let pipeline = DiagnosticPipeline::new(&self.config);
        let outcome = pipeline.analyze(&ctx, sql)?;
        Ok(outcome.into())
    }

    /// The full pass: every deep analyzer, baseline comparison, and
    /// post-processing rule.
    pub fn diagnose(&self, sql: &str) -> AppResult<Diagnosis> {
        let environment_cache = EnvironmentCache::new(self.environment_probe.as_ref(), self.clock.as_ref());
        let ctx = PipelineContext {
            driver: self.driver.as_ref(),
            introspector: self.introspector.as_ref(),
            store: self.store.as_ref(),
            clock: self.clock.as_ref(),
            environment_cache: &environment_cache,
            database_name: &self.database_name,
            environment_name: &self.environment_name
        };
        let pipeline = DiagnosticPipeline::new(&self.config);
        let outcome = pipeline.diagnose(&ctx, sql)?;
        Ok(outcome.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analyzers::environment::{EnvironmentContext, StaticEnvironmentProbe},
        baseline::InMemoryBaselineStore,
        clock::FrozenClock,
        driver::FixtureDriver,
        schema::PermissiveSchema
    };

    fn build_engine(driver: FixtureDriver) -> Engine {
        Engine::new(
            Box::new(driver),
            Box::new(PermissiveSchema),
            Box::new(InMemoryBaselineStore::new(10)),
            Box::new(FrozenClock::at_epoch_plus_days(0)),
            Box::new(StaticEnvironmentProbe::new(EnvironmentContext::new("test_db", 0.9))),
            Config::default(),
            "test_db",
            "test"
        )
    }

    #[test]
    fn analyze_rejects_write_statements() {
        let engine = build_engine(FixtureDriver::new());
        let result = engine.analyze("DELETE FROM users");
        assert!(result.is_err());
    }

    #[test]
    fn analyze_scores_a_simple_select() {
        let driver = FixtureDriver::new().with_analyze_plan(
            "SELECT * FROM users WHERE id = 1",
            "-> Single-row index lookup on users using PRIMARY  (cost=0.35 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
        );
        let engine = build_engine(driver);
        let diagnosis = engine.analyze("SELECT * FROM users WHERE id = 1").unwrap();
        match diagnosis {
            Diagnosis::Report(report) => assert!(report.base_report.scores.composite_score > 0.0),
            Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
        }
    }

    #[test]
    fn diagnose_runs_deep_analyzers_and_saves_baseline() {
        let driver = FixtureDriver::new().with_analyze_plan(
            "SELECT * FROM users WHERE id = 1",
            "-> Single-row index lookup on users using PRIMARY  (cost=0.35 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
        );
        let engine = build_engine(driver);
        let diagnosis = engine.diagnose("SELECT * FROM users WHERE id = 1").unwrap();
        match diagnosis {
            Diagnosis::Report(report) => {
                assert!(report.environment.is_some());
                assert!(report.confidence.is_some());
            }
            Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
        }
    }
}
