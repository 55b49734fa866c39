//! Report assembly: the blended score, the recommendation bands and the
//! serializable report structures.

use crate::ml::{AnomalyAnalysis, MlAnalysis};
use crate::ontology::{KnowledgeSummary, Statement};
use crate::patterns::{PatternAnalysis, PatternRecommendation};
use crate::risk::RiskAssessment;
use crate::signals::core::{Evidence, Judgment, MarketState, RiskLevel, TrendDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const STATE_WEIGHT: f64 = 0.4;
pub const ML_WEIGHT: f64 = 0.3;
pub const RISK_WEIGHT: f64 = 0.2;
pub const PATTERN_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
    Error,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "strong_buy",
            Recommendation::Buy => "buy",
            Recommendation::Hold => "hold",
            Recommendation::Sell => "sell",
            Recommendation::StrongSell => "strong_sell",
            Recommendation::Error => "error",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted blend of the four sub-scores. Inputs are clamped to [0, 1] so the
/// result is too.
pub fn overall_score(
    state_confidence: f64,
    ml_confidence: f64,
    risk_score: f64,
    pattern_confidence: f64,
) -> f64 {
    use crate::signals::core::clamp_confidence as c;
    let score = STATE_WEIGHT * c(state_confidence)
        + ML_WEIGHT * c(ml_confidence)
        + RISK_WEIGHT * (1.0 - c(risk_score))
        + PATTERN_WEIGHT * c(pattern_confidence);
    score.clamp(0.0, 1.0)
}

/// Bands are checked in order; exactly 0.5 is a hold
pub fn recommendation_for(score: f64) -> Recommendation {
    if score > 0.7 {
        Recommendation::StrongBuy
    } else if score > 0.5 {
        Recommendation::Buy
    } else if score < 0.3 {
        Recommendation::StrongSell
    } else if score < 0.5 {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub market_state: Judgment<MarketState>,
    pub trend_direction: Judgment<TrendDirection>,
    pub risk_level: Judgment<RiskLevel>,
    pub volatility_regime: Option<String>,
    pub volume_profile: Option<String>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub evidence: Evidence,
    pub reasoning_chain: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSummary {
    pub market_state: MarketState,
    pub trend_direction: TrendDirection,
    pub confidence: f64,
    pub key_levels: KeyLevels,
    pub volatility: Option<String>,
    pub volume_profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
    pub position_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    /// Number of patterns, not the patterns themselves
    pub patterns_detected: usize,
    pub pattern_recommendation: PatternRecommendation,
    pub pattern_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub anomaly_type: String,
}

/// Condensed per-section view of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub technical_summary: TechnicalSummary,
    pub ml_summary: MlAnalysis,
    pub risk_summary: RiskSummary,
    pub pattern_summary: PatternSummary,
    pub anomaly_summary: AnomalySummary,
}

/// Number of support/resistance levels kept in the summary
const KEY_LEVELS: usize = 2;

impl DetailedAnalysis {
    pub fn summarize(
        context: &MarketContext,
        ml: &MlAnalysis,
        risk: &RiskAssessment,
        patterns: &PatternAnalysis,
        anomaly: &AnomalyAnalysis,
    ) -> Self {
        let first = |levels: &[f64]| -> Vec<f64> { levels.iter().take(KEY_LEVELS).copied().collect() };
        Self {
            technical_summary: TechnicalSummary {
                market_state: context.market_state.value,
                trend_direction: context.trend_direction.value,
                confidence: context.market_state.confidence,
                key_levels: KeyLevels {
                    support: first(&context.support_levels),
                    resistance: first(&context.resistance_levels),
                },
                volatility: context.volatility_regime.clone(),
                volume_profile: context.volume_profile.clone(),
            },
            ml_summary: ml.clone(),
            risk_summary: RiskSummary {
                risk_score: risk.risk_score,
                risk_factors: risk.risk_factors.clone(),
                position_size: risk.position_size,
                stop_loss: risk.stop_loss,
                take_profit: risk.take_profit,
            },
            pattern_summary: PatternSummary {
                patterns_detected: patterns.patterns_detected.len(),
                pattern_recommendation: patterns.pattern_recommendation,
                pattern_confidence: patterns.pattern_confidence,
            },
            anomaly_summary: AnomalySummary {
                is_anomaly: anomaly.is_anomaly,
                anomaly_score: anomaly.anomaly_score,
                anomaly_type: anomaly.anomaly_type.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    /// Last close times last volume
    pub market_cap: f64,
    pub market_context: MarketContext,
    pub ml_analysis: MlAnalysis,
    pub risk_assessment: RiskAssessment,
    pub pattern_analysis: PatternAnalysis,
    pub anomaly_detection: AnomalyAnalysis,
    pub overall_score: f64,
    pub overall_recommendation: Recommendation,
    /// Market state confidence
    pub confidence: f64,
    pub knowledge_summary: KnowledgeSummary,
    pub ontology_graph: Vec<Statement>,
    pub detailed_analysis: DetailedAnalysis,
}

/// Returned in place of a report when the analysis could not complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub symbol: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
    pub overall_recommendation: Recommendation,
    pub overall_score: f64,
}

impl ErrorReport {
    pub fn new(symbol: impl Into<String>, error: &anyhow::Error, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            // Alternate form keeps the context chain on one line
            error: format!("{:#}", error),
            timestamp,
            overall_recommendation: Recommendation::Error,
            overall_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Completed(Arc<AnalysisReport>),
    Failed(ErrorReport),
}

impl AnalysisOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            AnalysisOutcome::Completed(report) => &report.symbol,
            AnalysisOutcome::Failed(error) => &error.symbol,
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self {
            AnalysisOutcome::Completed(report) => report.overall_recommendation,
            AnalysisOutcome::Failed(error) => error.overall_recommendation,
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisOutcome::Completed(report) => Some(report),
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};
    use proptest::prelude::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(recommendation_for(0.5), Recommendation::Hold);
        assert_eq!(recommendation_for(0.71), Recommendation::StrongBuy);
        assert_eq!(recommendation_for(0.7), Recommendation::Buy);
        assert_eq!(recommendation_for(0.55), Recommendation::Buy);
        assert_eq!(recommendation_for(0.45), Recommendation::Sell);
        assert_eq!(recommendation_for(0.3), Recommendation::Sell);
        assert_eq!(recommendation_for(0.29), Recommendation::StrongSell);
    }

    #[test]
    fn test_overall_score_weights() {
        let score = overall_score(0.8, 0.6, 0.3, 0.8);
        let expected = 0.4 * 0.8 + 0.3 * 0.6 + 0.2 * 0.7 + 0.1 * 0.8;
        assert!((score - expected).abs() < 1e-12);
        assert!((overall_score(1.0, 1.0, 0.0, 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(overall_score(0.0, 0.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_error_report_shape() {
        let err = Err::<(), _>(anyhow!("empty price series"))
            .context("snapshot validation")
            .unwrap_err();
        let report = ErrorReport::new("XYZ", &err, Utc::now());
        assert_eq!(report.overall_recommendation, Recommendation::Error);
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.error, "snapshot validation: empty price series");

        let json = serde_json::to_value(AnalysisOutcome::Failed(report)).unwrap();
        assert_eq!(json["overall_recommendation"], "error");
        assert_eq!(json["symbol"], "XYZ");
    }

    proptest! {
        #[test]
        fn prop_score_in_unit_interval(
            s in -1.0f64..2.0, m in -1.0f64..2.0, r in -1.0f64..2.0, p in -1.0f64..2.0
        ) {
            let score = overall_score(s, m, r, p);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_every_score_gets_a_trading_band(score in 0.0f64..=1.0) {
            let rec = recommendation_for(score);
            prop_assert_ne!(rec, Recommendation::Error);
        }
    }
}
