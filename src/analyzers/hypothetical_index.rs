//! Opt-in index simulation: create a candidate index, observe the EXPLAIN
//! diff, then guarantee cleanup regardless of how the simulation exits.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::index_synthesis::IndexRecommendation,
    config::HypotheticalIndexConfig,
    driver::Driver,
    error::AppResult,
    findings::{Category, Finding, Severity},
    plan::{AccessType, MetricsExtractor, ParsedQuery, parse_plan_text}
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatedImprovement {
    Significant,
    Moderate,
    Marginal,
    None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypotheticalIndexResult {
    pub ddl:              String,
    pub rows_before:       u64,
    pub rows_after:        u64,
    pub access_type_before: AccessType,
    pub access_type_after:  AccessType,
    pub improvement:       SimulatedImprovement,
    pub aborted:            bool,
    pub abort_reason:       Option<String>
}

fn access_rank(access: AccessType) -> u8 {
    match access {
        AccessType::ZeroRowConst => 0,
        AccessType::ConstRow => 1,
        AccessType::SingleRowLookup => 2,
        AccessType::CoveringIndexLookup | AccessType::IndexLookup | AccessType::IndexRangeScan
        | AccessType::IndexScan | AccessType::FulltextIndex | AccessType::Unknown => 3,
        AccessType::TableScan => 4
    }
}

pub struct HypotheticalIndexAnalyzer<'a> {
    config: &'a HypotheticalIndexConfig
}

impl<'a> HypotheticalIndexAnalyzer<'a> {
    pub fn new(config: &'a HypotheticalIndexConfig) -> Self {
        Self { config }
    }

    pub fn is_allowed(&self, environment_name: &str) -> bool {
        self.config.enabled
            && self
                .config
                .allowed_environments
                .iter()
                .any(|allowed| allowed == environment_name)
    }

    /// Simulates the top `max_simulations` recommendations. The `DROP INDEX`
    /// for a given simulation runs on every exit path: success, driver
    /// error, or wall-clock timeout.
    pub fn analyze(
        &self,
        driver: &dyn Driver,
        query: &ParsedQuery,
        recommendations: &[IndexRecommendation]
    ) -> (Vec<HypotheticalIndexResult>, Vec<Finding>) {
        let mut results = Vec::new();
        let mut findings = Vec::new();
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        for recommendation in recommendations.iter().take(self.config.max_simulations) {
            let result = self.simulate_one(driver, query, recommendation, timeout);
            if !result.aborted {
                if matches!(
                    result.improvement,
                    SimulatedImprovement::Significant | SimulatedImprovement::Moderate
                ) {
                    findings.push(
                        Finding::new(
                            Severity::Optimization,
                            Category::HYPOTHETICAL_INDEX,
                            format!("Simulated index confirms improvement: {}", recommendation.ddl),
                            format!(
                                "Rows examined dropped from {} to {} ({:?} -> {:?})",
                                result.rows_before, result.rows_after, result.access_type_before, result.access_type_after
                            )
                        )
                        .with_recommendation(recommendation.ddl.clone())
                    );
                }
            } else {
                findings.push(Finding::new(
                    Severity::Info,
                    Category::HYPOTHETICAL_INDEX,
                    "Hypothetical index simulation aborted",
                    result.abort_reason.clone().unwrap_or_default()
                ));
            }
            results.push(result);
        }

        (results, findings)
    }

    fn simulate_one(
        &self,
        driver: &dyn Driver,
        query: &ParsedQuery,
        recommendation: &IndexRecommendation,
        timeout: Duration
    ) -> HypotheticalIndexResult {
        let start = Instant::now();
        let outcome = self.run_simulation(driver, query, recommendation, start, timeout);

        // Guaranteed cleanup: runs whether run_simulation succeeded, errored,
        // or aborted on timeout, and failure here never propagates.
        let index_name = ddl_index_name(&recommendation.ddl);
        if let Err(err) = driver.execute_ddl(&format!("DROP INDEX {index_name}")) {
            tracing::warn!(index = %index_name, error = %err, "suppressed error dropping hypothetical index");
        }

        match outcome {
            Ok((rows_before, rows_after, access_before, access_after)) => {
                HypotheticalIndexResult {
                    ddl: recommendation.ddl.clone(),
                    rows_before,
                    rows_after,
                    access_type_before: access_before,
                    access_type_after: access_after,
                    improvement: classify_improvement(access_before, access_after, rows_before, rows_after),
                    aborted: false,
                    abort_reason: None
                }
            }
            Err(reason) => HypotheticalIndexResult {
                ddl: recommendation.ddl.clone(),
                rows_before: 0,
                rows_after: 0,
                access_type_before: AccessType::Unknown,
                access_type_after: AccessType::Unknown,
                aborted: true,
                abort_reason: Some(reason),
                improvement: SimulatedImprovement::None
            }
        }
    }

    fn run_simulation(
        &self,
        driver: &dyn Driver,
        query: &ParsedQuery,
        recommendation: &IndexRecommendation,
        start: Instant,
        timeout: Duration
    ) -> Result<(u64, u64, AccessType, AccessType), String> {
        let before = self
            .run_explain(driver, &query.raw)
            .map_err(|e| format!("pre-index EXPLAIN failed: {e}"))?;

        if start.elapsed() > timeout {
            return Err("simulation exceeded timeout before CREATE INDEX".to_string());
        }

        driver
            .execute_ddl(&recommendation.ddl)
            .map_err(|e| format!("CREATE INDEX failed: {e}"))?;

        if start.elapsed() > timeout {
            return Err("simulation exceeded timeout after CREATE INDEX".to_string());
        }

        let after = self
            .run_explain(driver, &query.raw)
            .map_err(|e| format!("post-index EXPLAIN failed: {e}"))?;

        Ok((before.0, after.0, before.1, after.1))
    }

    fn run_explain(&self, driver: &dyn Driver, sql: &str) -> AppResult<(u64, AccessType)> {
        let plan_text = driver.run_explain_analyze(sql)?;
        let plan = parse_plan_text(&plan_text)
            .ok_or_else(|| crate::error::schema_parse_error("could not parse EXPLAIN plan text"))?;
        let dummy_query = crate::sql::parse_structural(sql);
        let metrics = MetricsExtractor::extract(&plan, &dummy_query, 0.0);
        Ok((metrics.rows_examined, metrics.primary_access_type))
    }
}

fn ddl_index_name(ddl: &str) -> String {
    ddl.split_whitespace().nth(2).unwrap_or("idx_unknown").to_string()
}

fn classify_improvement(
    before: AccessType,
    after: AccessType,
    rows_before: u64,
    rows_after: u64
) -> SimulatedImprovement {
    if access_rank(after) < access_rank(before) {
        return SimulatedImprovement::Significant;
    }
    if rows_before == 0 {
        return SimulatedImprovement::None;
    }
    let reduction = (rows_before as f64 - rows_after as f64) / rows_before as f64;
    if reduction > 0.5 {
        SimulatedImprovement::Moderate
    } else if reduction > 0.1 {
        SimulatedImprovement::Marginal
    } else {
        SimulatedImprovement::None
    }
}
