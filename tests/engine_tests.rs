use sql_diagnostic_engine::{
    analyzers::environment::{EnvironmentContext, StaticEnvironmentProbe},
    baseline::InMemoryBaselineStore,
    clock::FrozenClock,
    config::Config,
    driver::FixtureDriver,
    engine::{Diagnosis, Engine},
    schema::{PermissiveSchema, StaticSchema},
    validation::ValidationStage
};

fn engine_with(driver: FixtureDriver, schema: Box<dyn sql_diagnostic_engine::schema::SchemaIntrospector>) -> Engine {
    Engine::new(
        Box::new(driver),
        schema,
        Box::new(InMemoryBaselineStore::new(10)),
        Box::new(FrozenClock::at_epoch_plus_days(0)),
        Box::new(StaticEnvironmentProbe::new(EnvironmentContext::new("test_db", 0.9))),
        Config::default(),
        "test_db",
        "test"
    )
}

#[test]
fn diagnose_rejects_non_select_statements() {
    let engine = engine_with(FixtureDriver::new(), Box::new(PermissiveSchema));
    assert!(engine.diagnose("DELETE FROM users").is_err());
    assert!(engine.diagnose("UPDATE users SET active = 0").is_err());
}

#[test]
fn diagnose_fails_validation_against_a_missing_table() {
    let schema = StaticSchema::parse("CREATE TABLE users (id INT PRIMARY KEY);").unwrap();
    let engine = engine_with(FixtureDriver::new(), Box::new(schema));
    let diagnosis = engine.diagnose("SELECT id FROM ghosts").unwrap();
    match diagnosis {
        Diagnosis::ValidationFailed(failure) => assert_eq!(failure.stage, ValidationStage::Schema),
        Diagnosis::Report(_) => panic!("expected a schema validation failure")
    }
}

#[test]
fn diagnose_a_table_scan_flags_no_index_and_derives_missing_index_root_cause() {
    let driver = FixtureDriver::new().with_analyze_plan(
        "SELECT * FROM users WHERE status = 'active'",
        "-> Table scan on users  (cost=120.0 rows=5000) (actual time=0.5..40.0 rows=500 loops=1)"
    );
    let engine = engine_with(driver, Box::new(PermissiveSchema));
    let diagnosis = engine.diagnose("SELECT * FROM users WHERE status = 'active'").unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            assert!(report.findings.iter().any(|f| f.category.as_str() == "no_index"));
            assert!(report.findings.iter().any(|f| f.category.as_str() == "explain_why"));
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

#[test]
fn diagnose_an_unfiltered_full_scan_is_treated_as_intentional() {
    let driver = FixtureDriver::new().with_analyze_plan(
        "SELECT * FROM users",
        "-> Table scan on users  (cost=120.0 rows=5000) (actual time=0.5..40.0 rows=5000 loops=1)"
    );
    let engine = engine_with(driver, Box::new(PermissiveSchema));
    let diagnosis = engine.diagnose("SELECT * FROM users").unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            assert!(!report.findings.iter().any(|f| f.category.as_str() == "no_index"));
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

#[test]
fn repeated_diagnosis_of_the_same_query_accumulates_baseline_history() {
    let driver = FixtureDriver::new().with_analyze_plan(
        "SELECT id FROM users WHERE id = 1",
        "-> Single-row index lookup on users using PRIMARY  (cost=0.35 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
    );
    let engine = engine_with(driver, Box::new(PermissiveSchema));

    for _ in 0..3 {
        let diagnosis = engine.diagnose("SELECT id FROM users WHERE id = 1").unwrap();
        assert!(matches!(diagnosis, Diagnosis::Report(_)));
    }

    let diagnosis = engine.diagnose("SELECT id FROM users WHERE id = 1").unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            let regression = report.regression.expect("regression analysis should have run");
            assert!(regression.baseline_avg_score.is_some());
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}

#[test]
fn analyze_skips_deep_analyzers_that_diagnose_fills() {
    let driver = FixtureDriver::new().with_analyze_plan(
        "SELECT id FROM users WHERE id = 1",
        "-> Single-row index lookup on users using PRIMARY  (cost=0.35 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
    );
    let engine = engine_with(driver, Box::new(PermissiveSchema));
    let diagnosis = engine.analyze("SELECT id FROM users WHERE id = 1").unwrap();
    match diagnosis {
        Diagnosis::Report(report) => {
            assert!(report.environment.is_none());
            assert!(report.confidence.is_none());
            assert!(report.base_report.scores.composite_score > 0.0);
        }
        Diagnosis::ValidationFailed(failure) => panic!("unexpected validation failure: {failure:?}")
    }
}
