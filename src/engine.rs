//! Analysis engine
//!
//! Runs the full pipeline for one market snapshot: evidence aggregation,
//! inference, ML collaborators, pattern detection, risk sizing and report
//! assembly. Finished reports are cached per symbol.

use crate::cache::ReportCache;
use crate::config::SystemConfig;
use crate::market_data::MarketSnapshot;
use crate::ml::{self, AnomalyDetector, MlPredictor};
use crate::ontology::{KnowledgeGraph, Predicate};
use crate::patterns::PatternDetector;
use crate::reasoning::ReasoningChainBuilder;
use crate::report::{
    AnalysisOutcome, AnalysisReport, DetailedAnalysis, ErrorReport, MarketContext,
    overall_score, recommendation_for,
};
use crate::risk::{self, RiskManager};
use crate::signals::core::Indicator;
use crate::signals::evidence::EvidenceAggregator;
use crate::signals::inference::infer_all;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::Arc;

pub struct AnalysisEngine {
    config: SystemConfig,
    predictor: Option<Arc<dyn MlPredictor>>,
    anomaly_detector: Option<Arc<dyn AnomalyDetector>>,
    pattern_detector: PatternDetector,
    risk_manager: RiskManager,
    cache: ReportCache,
}

impl AnalysisEngine {
    /// Engine without ML collaborators; their sections report neutral results
    pub fn new(config: SystemConfig) -> Self {
        let cache = ReportCache::new(config.cache_ttl());
        let risk_manager = RiskManager::new(config.risk.clone());
        Self {
            config,
            predictor: None,
            anomaly_detector: None,
            pattern_detector: PatternDetector::new(),
            risk_manager,
            cache,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn MlPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn with_anomaly_detector(mut self, detector: Arc<dyn AnomalyDetector>) -> Self {
        self.anomaly_detector = Some(detector);
        self
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn analyze(&self, snapshot: &MarketSnapshot) -> AnalysisOutcome {
        self.analyze_at(snapshot, Utc::now())
    }

    /// Analyse `snapshot` as of `now`. A fresh cached report for the symbol is
    /// returned unchanged; failures become an error report and are not cached.
    pub fn analyze_at(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> AnalysisOutcome {
        if let Some(report) = self.cache.get(&snapshot.symbol, now) {
            debug!("Cache hit for {}", snapshot.symbol);
            return AnalysisOutcome::Completed(report);
        }

        match self.run_pipeline(snapshot, now) {
            Ok(report) => {
                info!(
                    "Analysis complete for {}: {} (score {:.3})",
                    report.symbol, report.overall_recommendation, report.overall_score
                );
                let report = Arc::new(report);
                self.cache.insert(Arc::clone(&report), now);
                AnalysisOutcome::Completed(report)
            }
            Err(e) => {
                error!("Analysis failed for {}: {:#}", snapshot.symbol, e);
                AnalysisOutcome::Failed(ErrorReport::new(snapshot.symbol.clone(), &e, now))
            }
        }
    }

    fn run_pipeline(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Result<AnalysisReport> {
        snapshot.validate().context("invalid market snapshot")?;
        let symbol = snapshot.symbol.as_str();
        let latest = snapshot.latest().context("snapshot has no bars")?;

        let mut graph = KnowledgeGraph::new();
        let evidence = EvidenceAggregator::new(&mut graph, symbol, now)
            .aggregate(snapshot)
            .with_context(|| format!("classifying indicators for {}", symbol))?;

        let judgments = infer_all(&evidence);
        graph.assert_fact(
            symbol,
            Predicate::MarketState,
            judgments.market_state.value.as_str(),
            judgments.market_state.confidence,
            now,
        );
        graph.assert_fact(
            symbol,
            Predicate::TrendDirection,
            judgments.trend_direction.value.as_str(),
            judgments.trend_direction.confidence,
            now,
        );
        graph.assert_fact(
            symbol,
            Predicate::RiskLevel,
            judgments.risk_level.value.as_str(),
            judgments.risk_level.confidence,
            now,
        );
        debug!(
            "{}: state {} ({:.2}), trend {} ({:.2}), risk {} ({:.2})",
            symbol,
            judgments.market_state.value,
            judgments.market_state.confidence,
            judgments.trend_direction.value,
            judgments.trend_direction.confidence,
            judgments.risk_level.value,
            judgments.risk_level.confidence
        );

        let features = ml::build_features(snapshot);
        let mut ml_analysis = ml::run_prediction(
            symbol,
            self.predictor.as_deref(),
            self.config.ml_enabled,
            &features,
        );
        let anomaly = ml::run_anomaly_detection(
            symbol,
            self.anomaly_detector.as_deref(),
            self.config.ml_enabled,
            &features,
        );
        ml_analysis.anomaly_score = anomaly.anomaly_score;
        if ml_analysis.confidence > 0.0 {
            graph.assert_fact(
                symbol,
                Predicate::MlPrediction,
                ml_analysis.prediction.as_str(),
                ml_analysis.confidence,
                now,
            );
        }

        let pattern_analysis = self.pattern_detector.analyze(&snapshot.closes());
        for pattern in &pattern_analysis.patterns_detected {
            graph.assert_fact(
                symbol,
                Predicate::Pattern,
                pattern.pattern_type.as_str(),
                pattern.confidence,
                now,
            );
        }

        let risk_score = risk::risk_score(judgments.risk_level.value, &anomaly);
        let risk_assessment = self.risk_manager.assess(
            risk_score,
            latest.close,
            risk::risk_factors(&evidence, &anomaly),
        );
        graph.assert_fact(
            symbol,
            Predicate::RiskAssessment,
            risk_assessment.risk_score,
            judgments.risk_level.confidence,
            now,
        );

        let knowledge_summary = graph.get_knowledge_summary();
        let reasoning_chain = ReasoningChainBuilder::new(symbol, now)
            .contradictions(knowledge_summary.contradictions)
            .confirmations(knowledge_summary.confirmations)
            .build(&evidence, &judgments);

        let overall_score = overall_score(
            judgments.market_state.confidence,
            ml_analysis.confidence,
            risk_assessment.risk_score,
            pattern_analysis.pattern_confidence,
        );

        let market_context = MarketContext {
            market_state: judgments.market_state,
            trend_direction: judgments.trend_direction,
            risk_level: judgments.risk_level,
            volatility_regime: evidence
                .volatility
                .label_of(Indicator::VolatilityRegime)
                .map(String::from),
            volume_profile: evidence
                .volume
                .label_of(Indicator::VolumeProfile)
                .map(String::from),
            support_levels: snapshot.support_levels(),
            resistance_levels: snapshot.resistance_levels(),
            evidence,
            reasoning_chain,
        };

        let detailed_analysis = DetailedAnalysis::summarize(
            &market_context,
            &ml_analysis,
            &risk_assessment,
            &pattern_analysis,
            &anomaly,
        );

        Ok(AnalysisReport {
            symbol: symbol.to_string(),
            timestamp: now,
            current_price: latest.close,
            price_change_24h: snapshot.price_change_pct(),
            volume_24h: latest.volume,
            market_cap: latest.close * latest.volume,
            market_context,
            ml_analysis,
            risk_assessment,
            pattern_analysis,
            anomaly_detection: anomaly,
            overall_score,
            overall_recommendation: recommendation_for(overall_score),
            confidence: judgments.market_state.confidence,
            knowledge_summary,
            ontology_graph: graph.serialize(),
            detailed_analysis,
        })
    }
}
