//! End-to-end scenarios run through the full `Engine::diagnose` pipeline,
//! covering the behaviors the unit-level analyzer tests don't exercise
//! together: scoring, rule evaluation, deduplication, root-cause
//! suppression, confidence gating, and baseline regression all wired up
//! at once.

use std::collections::HashMap;

use sql_diagnostic_engine::{
    analyzers::environment::{EnvironmentContext, StaticEnvironmentProbe},
    baseline::{BaselineSnapshot, BaselineStore, InMemoryBaselineStore},
    clock::{Clock, FrozenClock},
    config::Config,
    driver::FixtureDriver,
    engine::{Diagnosis, Engine},
    fingerprint,
    findings::{Category, Severity},
    plan::{AccessType, ComplexityClass},
    sanitizer,
    schema::PermissiveSchema
};

fn engine_with(driver: FixtureDriver) -> Engine {
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

fn engine_with_store(driver: FixtureDriver, store: Box<dyn BaselineStore>) -> Engine {
    Engine::new(
        Box::new(driver),
        Box::new(PermissiveSchema),
        store,
        Box::new(FrozenClock::at_epoch_plus_days(1)),
        Box::new(StaticEnvironmentProbe::new(EnvironmentContext::new("test_db", 0.9))),
        Config::default(),
        "test_db",
        "test"
    )
}

fn seeded_snapshot(
    query_hash: &str,
    composite_score: f64,
    execution_time_ms: f64,
    rows_examined: u64,
    access_type: AccessType
) -> BaselineSnapshot {
    let clock = FrozenClock::at_epoch_plus_days(0);
    BaselineSnapshot {
        query_hash: query_hash.to_string(),
        timestamp: clock.now(),
        composite_score,
        grade: "B".to_string(),
        execution_time_ms,
        rows_examined,
        time_per_row: execution_time_ms / rows_examined.max(1) as f64,
        complexity: ComplexityClass::LogRange,
        access_type,
        indexes_used: Vec::new(),
        finding_counts: HashMap::new(),
        table_size: None,
        buffer_pool_utilization: Some(0.9),
        is_cold_cache: Some(false)
    }
}

fn query_hash_for(sql: &str) -> String {
    fingerprint::fingerprint(&sanitizer::sanitize(sql))
}

// Scenario 1: a covering-index point lookup is graded top-tier and
// produces only an explanatory index-choice finding.
#[test]
fn covering_index_point_lookup_is_graded_a_with_no_index_synthesis() {
    let sql = "SELECT id, name FROM users WHERE email = 'a@b.com' LIMIT 1";
    let plan_text = "-> Single-row index lookup on users using idx_email  (cost=0.25 rows=1) (actual time=0.01..0.02 rows=1 loops=1)\n    -> Covering index lookup on users using idx_email  (cost=0.2 rows=1) (actual time=0.005..0.01 rows=1 loops=1)";
    let driver = FixtureDriver::new().with_analyze_plan(sql, plan_text);
    let engine = engine_with(driver);
    let diagnosis = engine.diagnose(sql).unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            assert_eq!(report.base_report.scores.grade, sql_diagnostic_engine::scoring::Grade::A);
            assert!(report.base_report.scores.composite_score >= 95.0);
            assert!(report.base_report.scores.context_override);
            assert_eq!(
                report.base_report.scores.breakdown["scalability"].score,
                100.0
            );
            assert!(!report.findings.iter().any(|f| f.category.as_str() == Category::INDEX_SYNTHESIS));
            assert!(
                !report
                    .findings
                    .iter()
                    .any(|f| matches!(f.severity, Severity::Critical | Severity::Warning))
            );
            assert!(
                report
                    .findings
                    .iter()
                    .any(|f| f.category.as_str() == Category::EXPLAIN_WHY && f.title == "Index choice: idx_email")
            );
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

// Scenario 2: an unindexed full scan grades poorly and recommends an index.
#[test]
fn full_scan_without_index_grades_poorly_and_recommends_an_index() {
    let sql = "SELECT * FROM users WHERE status = 'active'";
    let driver = FixtureDriver::new().with_analyze_plan(
        sql,
        "-> Table scan on users  (cost=500.0 rows=50000) (actual time=0.5..2500.0 rows=50000 loops=1)"
    );
    let engine = engine_with(driver);
    let diagnosis = engine.diagnose(sql).unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            assert!(report.base_report.scores.grade <= sql_diagnostic_engine::scoring::Grade::D);
            let no_index_or_synthesis = report
                .findings
                .iter()
                .filter(|f| matches!(f.category.as_str(), Category::NO_INDEX | Category::INDEX_SYNTHESIS))
                .count();
            assert_eq!(no_index_or_synthesis, 1);
            assert!(
                report
                    .findings
                    .iter()
                    .any(|f| matches!(f.severity, Severity::Critical))
            );
            let sorted = report.sorted_findings();
            let top = sorted.first().expect("at least one finding");
            assert_eq!(top.severity, Severity::Critical);
            assert!(
                top.recommendation
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains("index")
            );
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

// Scenario 3: a function wrapped around a filtered column is named as the
// root cause, and the generic scan findings it explains are suppressed.
#[test]
fn function_on_column_is_named_as_root_cause_and_suppresses_generic_findings() {
    let sql = "SELECT * FROM orders WHERE YEAR(created_at) = 2026";
    let driver = FixtureDriver::new().with_analyze_plan(
        sql,
        "-> Table scan on orders  (cost=300.0 rows=8000) (actual time=0.5..120.0 rows=8000 loops=1)"
    );
    let engine = engine_with(driver);
    let diagnosis = engine.diagnose(sql).unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            assert!(!report.findings.iter().any(|f| f.category.as_str() == Category::NO_INDEX));
            assert!(!report.findings.iter().any(|f| f.category.as_str() == Category::FULL_TABLE_SCAN));
            assert!(!report.findings.iter().any(|f| f.severity == Severity::Critical));
            assert!(
                report
                    .findings
                    .iter()
                    .any(|f| f.category.as_str() == Category::ANTI_PATTERN
                        && f.severity == Severity::Warning
                        && f.recommendation.as_deref().unwrap_or_default().contains("functional index"))
            );
            assert!(
                report
                    .findings
                    .iter()
                    .any(|f| f.category.as_str() == Category::EXPLAIN_WHY
                        && f.title == "Why this is slow: a function wraps an indexed column")
            );
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

// Scenario 4: execution time grows in step with rows examined — flagged
// as data growth, not a regression.
#[test]
fn proportional_growth_in_rows_is_reported_as_data_growth_not_regression() {
    let sql = "SELECT * FROM orders WHERE region = 'west'";
    let hash = query_hash_for(sql);
    let store: Box<dyn BaselineStore> = Box::new(InMemoryBaselineStore::new(10));
    store
        .save(&hash, seeded_snapshot(&hash, 80.0, 100.0, 10_000, AccessType::IndexScan))
        .unwrap();

    let driver = FixtureDriver::new().with_analyze_plan(
        sql,
        "-> Index scan on orders using idx_region  (cost=50.0 rows=22000) (actual time=0.1..220.0 rows=22000 loops=1)"
    );
    let engine = engine_with_store(driver, store);
    let diagnosis = engine.diagnose(sql).unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            let regression = report.regression.expect("regression analysis should have run");
            assert!(!regression.time_regression);
            assert!(regression.rows_data_growth);
            assert!(
                report
                    .findings
                    .iter()
                    .any(|f| f.category.as_str() == Category::REGRESSION
                        && f.severity == Severity::Info
                        && f.title == "Data growth: execution_time increased 120.0%")
            );
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

// Scenario 5: execution time quadruples with rows held constant — a real
// regression, but below the critical threshold so it grades as a warning.
#[test]
fn execution_time_regression_with_stable_rows_is_a_warning() {
    let sql = "SELECT * FROM orders WHERE region = 'east'";
    let hash = query_hash_for(sql);
    let store: Box<dyn BaselineStore> = Box::new(InMemoryBaselineStore::new(10));
    store
        .save(&hash, seeded_snapshot(&hash, 80.0, 100.0, 10_000, AccessType::IndexScan))
        .unwrap();

    let driver = FixtureDriver::new().with_analyze_plan(
        sql,
        "-> Index scan on orders using idx_region  (cost=50.0 rows=10000) (actual time=0.1..400.0 rows=10000 loops=1)"
    );
    let engine = engine_with_store(driver, store);
    let diagnosis = engine.diagnose(sql).unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            let regression = report.regression.expect("regression analysis should have run");
            assert!(regression.time_regression);
            assert_eq!(regression.trend, sql_diagnostic_engine::analyzers::Trend::Stable);
            let finding = report
                .findings
                .iter()
                .find(|f| f.category.as_str() == Category::REGRESSION && f.title == "Execution time regression")
                .expect("a regression finding should have been raised");
            assert_eq!(finding.severity, Severity::Warning);
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

// Scenario 6: heavy cardinality drift plus thin statistics drags
// confidence below the moderate threshold, softening a critical finding.
#[test]
fn low_confidence_downgrades_a_critical_finding_to_moderate() {
    let sql = "SELECT * FROM orders WHERE created_at > '2026-01-01'";
    let driver = FixtureDriver::new().with_analyze_plan(
        sql,
        "-> Index range scan on orders using idx_created_at  (cost=50.0 rows=10000) (actual time=0.1..50.0 rows=800 loops=1)"
    );
    let engine = engine_with(driver);
    let diagnosis = engine.diagnose(sql).unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            let confidence = report.confidence.expect("confidence analysis should have run");
            assert!(confidence.overall >= 0.5 && confidence.overall < 0.7);
            let drift_finding = report
                .findings
                .iter()
                .find(|f| f.category.as_str() == Category::CARDINALITY_DRIFT)
                .expect("a cardinality drift finding should have survived downgrade");
            assert_eq!(drift_finding.severity, Severity::Warning);
            assert!(drift_finding.title.ends_with("[moderate confidence]"));
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}
