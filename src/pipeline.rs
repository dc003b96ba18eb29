//! The diagnostic pipeline: base analysis plus, for a full diagnosis, the
//! ordered run of every deep analyzer and the post-processing passes that
//! reconcile their findings into one coherent report.

use std::collections::BTreeMap;

use crate::{
    analyzers::{
        AntiPatternAnalyzer, CardinalityDriftAnalyzer, ConcurrencyRiskAnalyzer, ConfidenceScorer,
        EnvironmentCache, ExecutionProfiler, HypotheticalIndexAnalyzer,
        IndexCardinalityAnalyzer, IndexSynthesisAnalyzer, JoinAnalyzer, MemoryPressureAnalyzer,
        PlanStabilityAnalyzer, RegressionBaselineAnalyzer, RegressionSafetyAnalyzer,
        WorkloadAnalyzer, environment
    },
    baseline::{BaselineSnapshot, BaselineStore},
    clock::Clock,
    config::Config,
    driver::{Driver, ExplainGuard},
    error::{AppResult, engine_abort_error},
    findings::{Category, Finding, Severity},
    fingerprint,
    plan::{Metrics, MetricsExtractor, PlanNode, parse_plan_text},
    report::{BaseReport, DiagnosticReport},
    root_cause,
    rules::RuleRegistry,
    sanitizer,
    schema::SchemaIntrospector,
    scoring::ScoringEngine,
    scalability::ScalabilityEstimator,
    sql::{self, ParsedQuery},
    validation::{ValidationFailure, ValidationMode, ValidationPipeline}
};

/// Outcome of a pipeline run: either a full report, or the validation
/// failure that aborted it before scoring.
pub enum PipelineOutcome {
    Report(Box<DiagnosticReport>),
    ValidationFailed(ValidationFailure)
}

/// Everything a pipeline run needs, gathered up front so [`DiagnosticPipeline`]
/// itself stays stateless across calls.
pub struct PipelineContext<'a> {
    pub driver:            &'a dyn Driver,
    pub introspector:      &'a dyn SchemaIntrospector,
    pub store:             &'a dyn BaselineStore,
    pub clock:             &'a dyn Clock,
    pub environment_cache: &'a EnvironmentCache<'a>,
    pub database_name:     &'a str,
    pub environment_name:  &'a str
}

pub struct DiagnosticPipeline<'a> {
    config: &'a Config
}

impl<'a> DiagnosticPipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Phases 1-9 of §4.7 minus the deep analyzers: sanitize, validate,
    /// EXPLAIN, score, and run the nine legacy rules plus scalability.
    /// Used by both [`Self::analyze`] and [`Self::diagnose`].
    fn base_analysis(
        &self,
        ctx: &PipelineContext,
        sql: &str
    ) -> AppResult<Result<(ParsedQuery, PlanNode, Metrics, BaseReport, Vec<Finding>), ValidationFailure>> {
        let sanitized = sanitizer::guard(sql)?;
        let query = sql::parse_structural(&sanitized);

        let validation_mode = if self.config.validation.strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Permissive
        };
        let validation = ValidationPipeline::new(ctx.introspector, validation_mode);
        if let Err(failure) = validation.validate(&query) {
            return Ok(Err(failure));
        }
        if let Err(failure) = validation.preflight(ctx.driver, &sanitized) {
            return Ok(Err(failure));
        }

        let plan_text = ExplainGuard::new(ctx.driver).run_explain_analyze(&sanitized)?;
        let plan = parse_plan_text(&plan_text)
            .ok_or_else(|| engine_abort_error("could not parse EXPLAIN ANALYZE output"))?;

        let execution_time_ms = plan.actual_time_end.unwrap_or(0.0);
        let metrics = MetricsExtractor::extract(&plan, &query, execution_time_ms);

        let scoring = ScoringEngine::new(
            self.config.scoring.weights,
            self.config.scoring.grade_thresholds.clone().into()
        )
        .map_err(engine_abort_error)?;
        let scores = scoring.score(&metrics);

        let rules = RuleRegistry::new(&self.config.rules.enabled);
        let mut findings = rules.evaluate_all(&metrics, &self.config.thresholds);

        let estimator = ScalabilityEstimator::new(&self.config.projection);
        let (_scalability, scalability_findings) =
            estimator.estimate(&metrics, !query.order_cols.is_empty());
        findings.extend(scalability_findings);

        let base_report = BaseReport {
            query_hash: fingerprint::fingerprint(&sanitized),
            scores,
            execution_time_ms: metrics.execution_time_ms,
            rows_examined: metrics.rows_examined,
            rows_returned: metrics.rows_returned
        };

        Ok(Ok((query, plan, metrics, base_report, findings)))
    }

    /// Phases 1-9: scoring and rules only, no deep analyzers. Used for
    /// quick checks where the caller does not need baselines or narrative.
    pub fn analyze(&self, ctx: &PipelineContext, sql: &str) -> AppResult<PipelineOutcome> {
        match self.base_analysis(ctx, sql)? {
            Err(failure) => Ok(PipelineOutcome::ValidationFailed(failure)),
            Ok((_query, _plan, _metrics, base_report, findings)) => {
                let mut findings = findings;
                findings.sort_by_key(|f| f.severity);
                Ok(PipelineOutcome::Report(Box::new(DiagnosticReport {
                    base_report,
                    findings,
                    environment: None,
                    execution_profile: None,
                    index_analysis: None,
                    join_analysis: None,
                    stability: None,
                    safety: None,
                    cardinality_drift: None,
                    anti_patterns: Vec::new(),
                    index_synthesis: None,
                    confidence: None,
                    concurrency_risk: None,
                    memory_pressure: None,
                    regression: None,
                    hypothetical_indexes: Vec::new(),
                    workload: None
                })))
            }
        }
    }

    /// All 22 phases of §4.7/§4.8: the full diagnosis.
    pub fn diagnose(&self, ctx: &PipelineContext, sql: &str) -> AppResult<PipelineOutcome> {
        let (query, plan, metrics, base_report, mut findings) = match self.base_analysis(ctx, sql)? {
            Err(failure) => return Ok(PipelineOutcome::ValidationFailed(failure)),
            Ok(ok) => ok
        };

        // Phase 2: environment.
        let environment = ctx.environment_cache.get(ctx.database_name)?;
        findings.extend(environment::analyze(&environment));

        // Phase 3: execution profile.
        let index_cardinality = IndexCardinalityAnalyzer::analyze(ctx.driver, &query, &metrics);
        let mut cardinalities_by_column = BTreeMap::new();
        for (column, cardinality) in &index_cardinality.column_cardinalities {
            cardinalities_by_column.insert(column.clone(), *cardinality);
        }
        let execution_profile = ExecutionProfiler::profile(&metrics, &cardinalities_by_column);

        // Phase 5: cardinality drift.
        let drift_analyzer = CardinalityDriftAnalyzer::new(&self.config.cardinality_drift);
        let (cardinality_drift, drift_findings) = drift_analyzer.analyze(&metrics);
        findings.extend(drift_findings);

        // Phase 6: joins.
        let (join_analysis, join_findings) = JoinAnalyzer::analyze(&metrics, &query);
        findings.extend(join_findings);

        // Phase 7: anti-patterns.
        let anti_pattern_analyzer = AntiPatternAnalyzer::new(&self.config.anti_patterns);
        let primary_key_columns = std::collections::BTreeSet::new();
        let anti_pattern_findings =
            anti_pattern_analyzer.analyze(&query, &metrics, ctx.driver, &primary_key_columns);

        // Phase 8: index synthesis (consumes cardinality + drift).
        let existing_indexes = BTreeMap::new();
        let index_synthesis_analyzer = IndexSynthesisAnalyzer::new(&self.config.index_synthesis);
        let (index_synthesis, index_synthesis_findings) =
            index_synthesis_analyzer.analyze(&metrics, &query, &cardinality_drift, &existing_indexes);

        // Phase 9: memory pressure (consumes environment + execution profile).
        let memory_pressure_analyzer = MemoryPressureAnalyzer::new(&self.config.memory_pressure);
        let (memory_pressure, memory_findings) =
            memory_pressure_analyzer.analyze(&metrics, &environment);
        findings.extend(memory_findings);

        // Phase 10: concurrency risk (consumes execution profile).
        let (concurrency_risk, concurrency_findings) =
            ConcurrencyRiskAnalyzer::analyze(&metrics, &execution_profile);
        findings.extend(concurrency_findings);

        // Phase 11: plan stability (consumes cardinality drift).
        let (stability, stability_findings) = PlanStabilityAnalyzer::analyze(
            &plan,
            cardinality_drift.composite_drift,
            &cardinalities_by_column,
            &BTreeMap::new(),
            false
        );
        findings.extend(stability_findings);

        // Phase 12: regression safety.
        let capabilities = ctx.driver.get_capabilities();
        let history = ctx
            .store
            .history(&base_report.query_hash, self.config.regression.max_history)?;
        let (safety, safety_findings) =
            RegressionSafetyAnalyzer::analyze(&capabilities, &environment, history.len());
        findings.extend(safety_findings);

        // Phase 13: confidence (consumes drift, stability, environment,
        // driver capabilities).
        let confidence = ConfidenceScorer::score(
            cardinality_drift.composite_drift,
            metrics.rows_examined,
            &capabilities,
            &environment,
            index_cardinality.freshness_fraction(&metrics.tables_accessed),
            stability.label,
            metrics.join_count
        );

        // Phase 14: regression baselines.
        let regression_analyzer = RegressionBaselineAnalyzer::new(&self.config.regression);
        let (regression, regression_findings) = regression_analyzer.analyze(
            &history,
            base_report.scores.composite_score,
            base_report.execution_time_ms,
            base_report.rows_examined,
            metrics.primary_access_type,
            environment.is_cold_cache,
            metrics.is_intentional_scan
        );
        findings.extend(regression_findings);

        ctx.store.save(
            &base_report.query_hash,
            BaselineSnapshot {
                query_hash: base_report.query_hash.clone(),
                timestamp: ctx.clock.now(),
                composite_score: base_report.scores.composite_score,
                grade: base_report.scores.grade.label().to_string(),
                execution_time_ms: base_report.execution_time_ms,
                rows_examined: base_report.rows_examined,
                time_per_row: if metrics.rows_examined > 0 {
                    metrics.execution_time_ms / metrics.rows_examined as f64
                } else {
                    metrics.execution_time_ms
                },
                complexity: metrics.complexity,
                access_type: metrics.primary_access_type,
                indexes_used: metrics.indexes_used.clone(),
                finding_counts: count_by_category(&findings),
                table_size: None,
                buffer_pool_utilization: Some(environment.buffer_pool_utilization),
                is_cold_cache: Some(environment.is_cold_cache)
            }
        )?;

        // Phase 15: hypothetical indexes (opt-in).
        let hypothetical_index_analyzer = HypotheticalIndexAnalyzer::new(&self.config.hypothetical_index);
        let hypothetical_indexes = if hypothetical_index_analyzer.is_allowed(ctx.environment_name) {
            let (results, hypo_findings) =
                hypothetical_index_analyzer.analyze(ctx.driver, &query, &index_synthesis.recommendations);
            findings.extend(hypo_findings);
            results
        } else {
            Vec::new()
        };

        // Phase 16: workload patterns.
        let workload_analyzer = WorkloadAnalyzer::new(&self.config.workload);
        let (workload, workload_findings) = workload_analyzer.analyze(&history);
        findings.extend(workload_findings);

        // Phase 17: complexity findings already folded into base analysis
        // via the scalability estimator's context-aware sort recommendation.

        // Phase 18-19: root cause and explain-why.
        let root_cause = root_cause::derive(&anti_pattern_findings, &metrics);
        if let Some(ref cause) = root_cause {
            findings.push(root_cause::explain_why(cause.clone(), &metrics));
        }

        findings.extend(anti_pattern_findings.clone());
        findings.extend(index_synthesis_findings);

        // Phase 20: root-cause suppression — drop generic no_index/
        // full_table_scan rule findings once a more specific cause exists.
        if matches!(
            root_cause,
            Some(
                root_cause::RootCause::FunctionOnColumn
                    | root_cause::RootCause::LeadingWildcard
                    | root_cause::RootCause::IntentionalScan
            )
        ) {
            findings.retain(|f| {
                !matches!(f.category.as_str(), Category::NO_INDEX | Category::FULL_TABLE_SCAN)
            });
        }

        // Phase 21: optimal-access-type suppression.
        let access_is_optimal = matches!(
            metrics.primary_access_type,
            crate::plan::AccessType::ZeroRowConst
                | crate::plan::AccessType::ConstRow
                | crate::plan::AccessType::SingleRowLookup
        );
        if access_is_optimal {
            findings.retain(|f| f.category.as_str() != Category::INDEX_SYNTHESIS);
            findings.retain(|f| !(f.category.as_str() == Category::RULE && f.title.to_lowercase().contains("index")));
            if query.order_cols.is_empty() {
                findings.retain(|f| !f.title.to_lowercase().contains("order by"));
            }
            if query.is_select_star {
                findings.retain(|f| !f.title.to_lowercase().contains("covering"));
            }
        }

        // Phase 22: deduplication.
        deduplicate(&mut findings);

        // Confidence-gated severity downgrade.
        apply_confidence_gate(&mut findings, confidence.overall);

        // Consistency validation: log-only, never throws.
        validate_consistency(&base_report, &findings);

        findings.sort_by_key(|f| f.severity);

        Ok(PipelineOutcome::Report(Box::new(DiagnosticReport {
            base_report,
            findings,
            environment: Some(environment),
            execution_profile: Some(execution_profile),
            index_analysis: Some(index_cardinality),
            join_analysis: Some(join_analysis),
            stability: Some(stability),
            safety: Some(safety),
            cardinality_drift: Some(cardinality_drift),
            anti_patterns: anti_pattern_findings,
            index_synthesis: Some(index_synthesis),
            confidence: Some(confidence),
            concurrency_risk: Some(concurrency_risk),
            memory_pressure: Some(memory_pressure),
            regression: Some(regression),
            hypothetical_indexes,
            workload: Some(workload)
        })))
    }
}

fn count_by_category(findings: &[Finding]) -> std::collections::HashMap<String, usize> {
    let mut counts = std::collections::HashMap::new();
    for finding in findings {
        *counts.entry(finding.category.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

/// 3-pass deduplication: identical recommendation text keeps the highest
/// severity; an indexed table's `no_index` findings drop once
/// `index_synthesis` already covers it; `full_table_scan` findings drop if
/// any `no_index` finding survives for the same query.
fn deduplicate(findings: &mut Vec<Finding>) {
    let mut by_recommendation: BTreeMap<String, usize> = BTreeMap::new();
    let mut keep = vec![true; findings.len()];

    for (i, finding) in findings.iter().enumerate() {
        let Some(recommendation) = &finding.recommendation else {
            continue;
        };
        match by_recommendation.get(recommendation) {
            Some(&existing) => {
                if findings[existing].severity <= finding.severity {
                    keep[i] = false;
                } else {
                    keep[existing] = false;
                    by_recommendation.insert(recommendation.clone(), i);
                }
            }
            None => {
                by_recommendation.insert(recommendation.clone(), i);
            }
        }
    }

    let has_index_synthesis = findings
        .iter()
        .enumerate()
        .any(|(i, f)| keep[i] && f.category.as_str() == Category::INDEX_SYNTHESIS);
    if has_index_synthesis {
        for (i, f) in findings.iter().enumerate() {
            if keep[i] && f.category.as_str() == Category::NO_INDEX {
                keep[i] = false;
            }
        }
    }

    let any_no_index_survives = findings
        .iter()
        .enumerate()
        .any(|(i, f)| keep[i] && f.category.as_str() == Category::NO_INDEX);
    if any_no_index_survives {
        for (i, f) in findings.iter().enumerate() {
            if keep[i] && f.category.as_str() == Category::FULL_TABLE_SCAN {
                keep[i] = false;
            }
        }
    }

    let mut i = 0;
    findings.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
}

/// Confidence-gated downgrade: below 0.5, critical/warning both drop one
/// level; below 0.7 (but >= 0.5), only critical drops. A title suffix
/// marks which findings were softened.
fn apply_confidence_gate(findings: &mut [Finding], confidence: f64) {
    if confidence < 0.5 {
        for finding in findings.iter_mut() {
            if matches!(finding.severity, Severity::Critical | Severity::Warning) {
                finding.severity = finding.severity.downgrade();
                finding.suffix_title("[low confidence]");
            }
        }
    } else if confidence < 0.7 {
        for finding in findings.iter_mut() {
            if finding.severity == Severity::Critical {
                finding.severity = finding.severity.downgrade();
                finding.suffix_title("[moderate confidence]");
            }
        }
    }
}

/// Log-only sanity assertions; never aborts the pipeline on mismatch.
fn validate_consistency(base_report: &BaseReport, findings: &[Finding]) {
    if base_report.rows_returned > base_report.rows_examined && base_report.rows_examined > 0 {
        tracing::warn!(
            rows_returned = base_report.rows_returned,
            rows_examined = base_report.rows_examined,
            "rows_returned exceeds rows_examined"
        );
    }
    if findings.is_empty() && base_report.scores.grade <= crate::scoring::Grade::C {
        tracing::warn!(
            grade = base_report.scores.grade.label(),
            "low grade with no findings to explain it"
        );
    }
}
