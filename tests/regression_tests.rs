//! Baseline/regression invariants: trend stability on thin history, noise
//! floor suppression, and the one-snapshot-per-run accounting that the
//! pipeline's baseline store relies on.

use std::collections::HashMap;

use sql_diagnostic_engine::{
    analyzers::{RegressionBaselineAnalyzer, Trend},
    baseline::{BaselineSnapshot, BaselineStore, InMemoryBaselineStore},
    clock::{Clock, FrozenClock},
    config::RegressionConfig,
    driver::FixtureDriver,
    engine::{Diagnosis, Engine},
    fingerprint,
    analyzers::environment::{EnvironmentContext, StaticEnvironmentProbe},
    findings::Category,
    plan::{AccessType, ComplexityClass},
    sanitizer,
    schema::PermissiveSchema
};

fn snapshot(score: f64, time_ms: f64, rows: u64, access_type: AccessType) -> BaselineSnapshot {
    let clock = FrozenClock::at_epoch_plus_days(0);
    BaselineSnapshot {
        query_hash: "q".to_string(),
        timestamp: clock.now(),
        composite_score: score,
        grade: "B".to_string(),
        execution_time_ms: time_ms,
        rows_examined: rows,
        time_per_row: time_ms / rows.max(1) as f64,
        complexity: ComplexityClass::Linear,
        access_type,
        indexes_used: Vec::new(),
        finding_counts: HashMap::new(),
        table_size: None,
        buffer_pool_utilization: Some(0.8),
        is_cold_cache: Some(false)
    }
}

#[test]
fn a_single_prior_snapshot_never_yields_a_trend_verdict() {
    let config = RegressionConfig::default();
    let analyzer = RegressionBaselineAnalyzer::new(&config);
    let history = vec![snapshot(90.0, 100.0, 1000, AccessType::IndexLookup)];

    // Even a current score far below the one prior snapshot can't establish
    // a trend: two points are not enough to call a direction.
    let (report, _) = analyzer.analyze(&history, 40.0, 100.0, 1000, AccessType::IndexLookup, false, false);
    assert_eq!(report.trend, Trend::Stable);
}

#[test]
fn three_monotonically_declining_scores_are_classified_as_degrading() {
    let config = RegressionConfig::default();
    let analyzer = RegressionBaselineAnalyzer::new(&config);
    let history = vec![
        snapshot(95.0, 100.0, 1000, AccessType::IndexLookup),
        snapshot(85.0, 100.0, 1000, AccessType::IndexLookup),
    ];
    let (report, _) = analyzer.analyze(&history, 70.0, 100.0, 1000, AccessType::IndexLookup, false, false);
    assert_eq!(report.trend, Trend::Degrading);
}

#[test]
fn a_delta_under_the_noise_floor_never_raises_a_regression_finding() {
    let config = RegressionConfig::default();
    let analyzer = RegressionBaselineAnalyzer::new(&config);
    let history = vec![
        snapshot(80.0, 50.0, 5000, AccessType::IndexLookup),
        snapshot(80.0, 51.0, 5000, AccessType::IndexLookup),
        snapshot(80.0, 49.0, 5000, AccessType::IndexLookup),
    ];
    // 2ms above the ~50ms baseline average, comfortably under the 3ms floor.
    let (report, findings) = analyzer.analyze(&history, 80.0, 52.0, 5000, AccessType::IndexLookup, false, false);
    assert!(!report.time_regression);
    assert!(!findings.iter().any(|f| f.category.as_str() == Category::REGRESSION));
}

#[test]
fn an_intentional_full_scan_never_raises_a_time_regression_above_info() {
    let config = RegressionConfig::default();
    let analyzer = RegressionBaselineAnalyzer::new(&config);
    let history = vec![snapshot(80.0, 100.0, 1000, AccessType::TableScan)];
    let (report, findings) = analyzer.analyze(&history, 50.0, 1000.0, 1000, AccessType::TableScan, false, true);
    assert!(report.time_regression);
    let finding = findings
        .iter()
        .find(|f| f.category.as_str() == Category::REGRESSION && f.title == "Execution time regression")
        .expect("a regression finding is still raised");
    assert_eq!(finding.severity, sql_diagnostic_engine::findings::Severity::Info);
}

fn engine_with_store(driver: FixtureDriver, store: Box<dyn BaselineStore>) -> Engine {
    Engine::new(
        Box::new(driver),
        Box::new(PermissiveSchema),
        store,
        Box::new(FrozenClock::at_epoch_plus_days(0)),
        Box::new(StaticEnvironmentProbe::new(EnvironmentContext::new("test_db", 0.9))),
        sql_diagnostic_engine::config::Config::default(),
        "test_db",
        "test"
    )
}

#[test]
fn each_diagnose_call_appends_exactly_one_baseline_snapshot() {
    let sql = "SELECT id FROM users WHERE id = 1";
    let driver = FixtureDriver::new().with_analyze_plan(
        sql,
        "-> Single-row index lookup on users using PRIMARY  (cost=0.35 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
    );
    let hash = fingerprint::fingerprint(&sanitizer::sanitize(sql));
    let store = InMemoryBaselineStore::new(10);
    let before = store.history(&hash, 100).unwrap().len();
    assert_eq!(before, 0);

    let engine = engine_with_store(driver, Box::new(store));
    for expected_len in 1..=3 {
        let diagnosis = engine.diagnose(sql).unwrap();
        assert!(matches!(diagnosis, Diagnosis::Report(_)));
        // The store lives inside the engine now; re-run through the same
        // query hash and check growth via a second fixture-free lookup
        // isn't possible without the engine's own store handle, so the
        // accumulated regression baseline is the observable proxy.
        if let Diagnosis::Report(report) = diagnosis {
            if expected_len == 1 {
                assert!(report.regression.as_ref().unwrap().baseline_avg_score.is_none());
            } else {
                assert!(report.regression.as_ref().unwrap().baseline_avg_score.is_some());
            }
        }
    }
}
