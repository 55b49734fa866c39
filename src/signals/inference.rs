//! Market state, trend direction and risk level inference
//!
//! Each function is a deterministic weighted score over the evidence
//! categories. Missing categories contribute nothing; none of them fail.

use super::core::{
    DEFAULT_CATEGORY_CONFIDENCE, Evidence, Indicator, Judgment, MarketState, RiskLevel,
    StateScores, TrendDirection,
};
use super::utils::SignalUtils;
use serde::{Deserialize, Serialize};

const TREND_SCORE: f64 = 0.3;
const MOMENTUM_SCORE: f64 = 0.25;
const VOLUME_SCORE: f64 = 0.2;
const STRONG_ACCUMULATION_MULTIPLIER: f64 = 1.5;
const VOLATILITY_SCORE: f64 = 0.15;
/// Range-bound only scores while no other state has reached this
const RANGE_BOUND_CEILING: f64 = 0.3;

/// The three categorical judgments of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Judgments {
    pub market_state: Judgment<MarketState>,
    pub trend_direction: Judgment<TrendDirection>,
    pub risk_level: Judgment<RiskLevel>,
}

/// Run all three inferences; they are independent of each other
pub fn infer_all(evidence: &Evidence) -> Judgments {
    Judgments {
        market_state: infer_market_state(evidence),
        trend_direction: infer_trend_direction(evidence),
        risk_level: infer_risk_level(evidence),
    }
}

pub fn infer_market_state(evidence: &Evidence) -> Judgment<MarketState> {
    let mut scores = StateScores::default();

    let trend = &evidence.trend;
    if matches!(trend.label_of(Indicator::Adx), Some("strong" | "very_strong")) {
        let di_bullish = trend
            .label_of(Indicator::DirectionalIndex)
            .is_some_and(|l| l.contains("bullish"));
        let state = if di_bullish {
            MarketState::BullTrend
        } else {
            MarketState::BearTrend
        };
        scores.add(state, TREND_SCORE, trend.avg_confidence);
    }

    let momentum = &evidence.momentum;
    let bullish_momentum = momentum.count_containing("bullish");
    let bearish_momentum = momentum.count_containing("bearish");
    if bullish_momentum >= 2 {
        scores.add(MarketState::BullTrend, MOMENTUM_SCORE, momentum.avg_confidence);
    } else if bearish_momentum >= 2 {
        scores.add(MarketState::BearTrend, MOMENTUM_SCORE, momentum.avg_confidence);
    }

    let volume = &evidence.volume;
    if let Some(profile) = volume.label_of(Indicator::VolumeProfile) {
        let confidence = volume
            .confidence_of(Indicator::VolumeProfile)
            .unwrap_or(DEFAULT_CATEGORY_CONFIDENCE);
        if profile.contains("strong_accumulation") {
            scores.add(
                MarketState::BullTrend,
                VOLUME_SCORE * STRONG_ACCUMULATION_MULTIPLIER,
                confidence,
            );
        } else if profile.contains("distribution") {
            scores.add(MarketState::BearTrend, VOLUME_SCORE, confidence);
        }
    }

    let volatility = &evidence.volatility;
    if let Some(regime) = volatility.label_of(Indicator::VolatilityRegime) {
        let confidence = volatility
            .confidence_of(Indicator::VolatilityRegime)
            .unwrap_or(DEFAULT_CATEGORY_CONFIDENCE);
        if regime == "high" {
            scores.add(MarketState::VolatileBreakout, VOLATILITY_SCORE, confidence);
        } else if regime == "low" && scores.max_score() < RANGE_BOUND_CEILING {
            scores.add(MarketState::RangeBound, VOLATILITY_SCORE, confidence);
        }
    }

    // Nothing scored: no evidence of a trend either way
    if scores.max_score() <= 0.0 {
        return Judgment::new(MarketState::SidewaysConsolidation, DEFAULT_CATEGORY_CONFIDENCE);
    }

    let winner = scores.winner();
    let confidence = SignalUtils::mean_or(scores.confidences(winner), DEFAULT_CATEGORY_CONFIDENCE);
    Judgment::new(winner, confidence)
}

/// Only bullish evidence moves the score; bearish momentum is not subtracted.
pub fn infer_trend_direction(evidence: &Evidence) -> Judgment<TrendDirection> {
    let mut bullish_score = 0.0;
    let mut total_confidence = 0.0;
    let mut contributed = false;

    let trend = &evidence.trend;
    match trend.label_of(Indicator::Adx) {
        Some("very_strong") => {
            bullish_score += 2.0;
            total_confidence += trend.avg_confidence;
            contributed = true;
        }
        Some("strong") => {
            bullish_score += 1.5;
            total_confidence += trend.avg_confidence;
            contributed = true;
        }
        _ => {}
    }

    let momentum = &evidence.momentum;
    if !momentum.is_empty() {
        bullish_score += momentum.count_containing("bullish") as f64 * 0.8;
        total_confidence += momentum.avg_confidence;
        contributed = true;
    }

    let structure = &evidence.structure;
    if structure.signals.len() >= 2 {
        bullish_score += structure.count_containing("bullish") as f64 * 0.6;
    }

    if evidence.volume.count_containing("accumulation") > 0 {
        bullish_score += 0.5;
    }

    let direction = if bullish_score >= 3.0 {
        TrendDirection::StrongUp
    } else if bullish_score >= 1.5 {
        TrendDirection::ModerateUp
    } else if bullish_score <= -3.0 {
        TrendDirection::StrongDown
    } else if bullish_score <= -1.5 {
        TrendDirection::ModerateDown
    } else {
        TrendDirection::Neutral
    };

    let confidence = if contributed && total_confidence > 0.0 {
        total_confidence / 3.0
    } else {
        DEFAULT_CATEGORY_CONFIDENCE
    };

    Judgment::new(direction, confidence)
}

pub fn infer_risk_level(evidence: &Evidence) -> Judgment<RiskLevel> {
    let mut risk_score = 0.0;
    let mut confidences = Vec::new();

    let volatility = &evidence.volatility;
    if let Some(regime) = volatility.label_of(Indicator::VolatilityRegime) {
        let confidence = volatility
            .confidence_of(Indicator::VolatilityRegime)
            .unwrap_or(DEFAULT_CATEGORY_CONFIDENCE);
        match regime {
            "high" => {
                risk_score += 4.0;
                confidences.push(confidence);
            }
            "medium" => {
                risk_score += 2.0;
                confidences.push(confidence);
            }
            _ => {}
        }
    }

    if evidence.trend.label_of(Indicator::Adx) == Some("weak") {
        risk_score += 1.0;
        confidences.push(0.6);
    }

    if evidence
        .momentum
        .labels()
        .any(|l| l.contains("overbought") || l.contains("oversold"))
    {
        risk_score += 1.5;
        confidences.push(0.7);
    }

    let level = if risk_score >= 4.5 {
        RiskLevel::VeryHigh
    } else if risk_score >= 3.5 {
        RiskLevel::High
    } else if risk_score >= 2.5 {
        RiskLevel::Medium
    } else if risk_score >= 1.5 {
        RiskLevel::Low
    } else {
        RiskLevel::VeryLow
    };

    Judgment::new(level, SignalUtils::mean_or(&confidences, DEFAULT_CATEGORY_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::core::{CategoryEvidence, EvidenceCategory, SignalEvidence};

    fn sig(indicator: Indicator, label: &str, confidence: f64) -> SignalEvidence {
        SignalEvidence {
            indicator,
            label: label.to_string(),
            confidence,
        }
    }

    fn with(category: EvidenceCategory, signals: Vec<SignalEvidence>) -> Evidence {
        let mut evidence = Evidence::empty();
        let bucket = CategoryEvidence::new(category, signals);
        match category {
            EvidenceCategory::Trend => evidence.trend = bucket,
            EvidenceCategory::Momentum => evidence.momentum = bucket,
            EvidenceCategory::Volume => evidence.volume = bucket,
            EvidenceCategory::Volatility => evidence.volatility = bucket,
            EvidenceCategory::Structure => evidence.structure = bucket,
        }
        evidence
    }

    #[test]
    fn test_empty_evidence_defaults() {
        let evidence = Evidence::empty();

        let state = infer_market_state(&evidence);
        assert_eq!(state.value, MarketState::SidewaysConsolidation);
        assert_eq!(state.confidence, 0.5);

        let direction = infer_trend_direction(&evidence);
        assert_eq!(direction.value, TrendDirection::Neutral);
        assert_eq!(direction.confidence, 0.5);

        let risk = infer_risk_level(&evidence);
        assert_eq!(risk.value, RiskLevel::VeryLow);
        assert_eq!(risk.confidence, 0.5);
    }

    #[test]
    fn test_strong_trend_with_bullish_di_is_bull_trend() {
        let evidence = with(
            EvidenceCategory::Trend,
            vec![
                sig(Indicator::Adx, "strong", 0.8),
                sig(Indicator::DirectionalIndex, "bullish", 0.7),
            ],
        );
        let state = infer_market_state(&evidence);
        assert_eq!(state.value, MarketState::BullTrend);
        assert!((state.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_strong_trend_without_di_is_bear_trend() {
        let evidence = with(EvidenceCategory::Trend, vec![sig(Indicator::Adx, "very_strong", 0.95)]);
        assert_eq!(infer_market_state(&evidence).value, MarketState::BearTrend);
    }

    #[test]
    fn test_bearish_momentum_pair_scores_bear_trend() {
        let evidence = with(
            EvidenceCategory::Momentum,
            vec![
                sig(Indicator::Macd, "strong_bearish", 0.85),
                sig(Indicator::Stochastic, "bearish_cross", 0.7),
            ],
        );
        let state = infer_market_state(&evidence);
        assert_eq!(state.value, MarketState::BearTrend);
        assert!((state.confidence - 0.775).abs() < 1e-9);
    }

    #[test]
    fn test_low_volatility_is_range_bound_without_trend() {
        let evidence = with(
            EvidenceCategory::Volatility,
            vec![sig(Indicator::VolatilityRegime, "low", 0.7)],
        );
        let state = infer_market_state(&evidence);
        assert_eq!(state.value, MarketState::RangeBound);
        assert_eq!(state.confidence, 0.7);
    }

    #[test]
    fn test_low_volatility_does_not_override_clear_trend() {
        let mut evidence = with(
            EvidenceCategory::Trend,
            vec![
                sig(Indicator::Adx, "strong", 0.8),
                sig(Indicator::DirectionalIndex, "bullish", 0.7),
            ],
        );
        evidence.volatility = CategoryEvidence::new(
            EvidenceCategory::Volatility,
            vec![sig(Indicator::VolatilityRegime, "low", 0.7)],
        );
        assert_eq!(infer_market_state(&evidence).value, MarketState::BullTrend);
    }

    #[test]
    fn test_distribution_volume_is_bear_trend() {
        let evidence = with(
            EvidenceCategory::Volume,
            vec![sig(Indicator::VolumeProfile, "distribution", 0.7)],
        );
        let state = infer_market_state(&evidence);
        assert_eq!(state.value, MarketState::BearTrend);
        assert_eq!(state.confidence, 0.7);
    }

    #[test]
    fn test_high_volatility_alone_is_volatile_breakout() {
        let evidence = with(
            EvidenceCategory::Volatility,
            vec![sig(Indicator::VolatilityRegime, "high", 0.8)],
        );
        assert_eq!(infer_market_state(&evidence).value, MarketState::VolatileBreakout);
    }

    #[test]
    fn test_trend_direction_thresholds() {
        let mut evidence = with(EvidenceCategory::Trend, vec![sig(Indicator::Adx, "very_strong", 0.95)]);
        evidence.momentum = CategoryEvidence::new(
            EvidenceCategory::Momentum,
            vec![
                sig(Indicator::Macd, "strong_bullish", 0.85),
                sig(Indicator::Rsi, "neutral", 0.5),
            ],
        );
        // 2.0 + 0.8 = 2.8
        let direction = infer_trend_direction(&evidence);
        assert_eq!(direction.value, TrendDirection::ModerateUp);
        assert!((direction.confidence - (0.95 + 0.675) / 3.0).abs() < 1e-9);

        evidence.volume = CategoryEvidence::new(
            EvidenceCategory::Volume,
            vec![sig(Indicator::VolumeProfile, "accumulation", 0.6)],
        );
        // 2.8 + 0.5 = 3.3
        assert_eq!(infer_trend_direction(&evidence).value, TrendDirection::StrongUp);
    }

    #[test]
    fn test_trend_direction_bands_are_inclusive() {
        // 1.5
        let strong = with(EvidenceCategory::Trend, vec![sig(Indicator::Adx, "strong", 0.8)]);
        assert_eq!(infer_trend_direction(&strong).value, TrendDirection::ModerateUp);

        // 5 x 0.6 = 3.0
        let structure = with(
            EvidenceCategory::Structure,
            vec![
                sig(Indicator::IchimokuCloud, "bullish_cloud", 0.7),
                sig(Indicator::IchimokuCross, "bullish_tk_cross", 0.6),
                sig(Indicator::Sma20, "bullish", 0.6),
                sig(Indicator::Sma50, "bullish", 0.6),
                sig(Indicator::Ema20, "bullish", 0.6),
            ],
        );
        let direction = infer_trend_direction(&structure);
        assert_eq!(direction.value, TrendDirection::StrongUp);
        assert_eq!(direction.confidence, 0.5);
    }

    #[test]
    fn test_risk_level_bands_are_inclusive() {
        let overbought = || vec![sig(Indicator::Rsi, "overbought", 0.8)];
        let weak_trend = || vec![sig(Indicator::Adx, "weak", 0.6)];

        // 1.5
        let evidence = with(EvidenceCategory::Momentum, overbought());
        assert_eq!(infer_risk_level(&evidence).value, RiskLevel::Low);

        // 1.0 + 1.5 = 2.5
        let mut evidence = with(EvidenceCategory::Trend, weak_trend());
        evidence.momentum = CategoryEvidence::new(EvidenceCategory::Momentum, overbought());
        assert_eq!(infer_risk_level(&evidence).value, RiskLevel::Medium);

        // 2.0 + 1.5 = 3.5
        let mut evidence = with(
            EvidenceCategory::Volatility,
            vec![sig(Indicator::VolatilityRegime, "medium", 0.6)],
        );
        evidence.momentum = CategoryEvidence::new(
            EvidenceCategory::Momentum,
            vec![sig(Indicator::Rsi, "oversold", 0.8)],
        );
        assert_eq!(infer_risk_level(&evidence).value, RiskLevel::High);

        // 1.0
        let evidence = with(EvidenceCategory::Trend, weak_trend());
        assert_eq!(infer_risk_level(&evidence).value, RiskLevel::VeryLow);
    }

    #[test]
    fn test_bearish_momentum_does_not_pull_direction_down() {
        let evidence = with(
            EvidenceCategory::Momentum,
            vec![
                sig(Indicator::Macd, "strong_bearish", 0.85),
                sig(Indicator::Stochastic, "bearish_cross", 0.7),
                sig(Indicator::Rsi, "overbought", 0.8),
            ],
        );
        assert_eq!(infer_trend_direction(&evidence).value, TrendDirection::Neutral);
    }

    #[test]
    fn test_structure_needs_two_signals() {
        let one = with(
            EvidenceCategory::Structure,
            vec![sig(Indicator::IchimokuCloud, "bullish_cloud", 0.7)],
        );
        let two = with(
            EvidenceCategory::Structure,
            vec![
                sig(Indicator::IchimokuCloud, "bullish_cloud", 0.7),
                sig(Indicator::IchimokuCross, "bullish_tk_cross", 0.6),
            ],
        );
        assert_eq!(infer_trend_direction(&one).value, TrendDirection::Neutral);
        // 2 x 0.6 = 1.2, still below moderate
        assert_eq!(infer_trend_direction(&two).value, TrendDirection::Neutral);
    }

    #[test]
    fn test_risk_level_accumulation() {
        let mut evidence = with(
            EvidenceCategory::Volatility,
            vec![sig(Indicator::VolatilityRegime, "high", 0.8)],
        );
        assert_eq!(infer_risk_level(&evidence).value, RiskLevel::High);

        evidence.momentum = CategoryEvidence::new(
            EvidenceCategory::Momentum,
            vec![sig(Indicator::Rsi, "extremely_overbought", 0.95)],
        );
        let risk = infer_risk_level(&evidence);
        assert_eq!(risk.value, RiskLevel::VeryHigh);
        assert!((risk.confidence - 0.75).abs() < 1e-9);

        let medium_weak = {
            let mut e = with(
                EvidenceCategory::Volatility,
                vec![sig(Indicator::VolatilityRegime, "medium", 0.6)],
            );
            e.trend = CategoryEvidence::new(EvidenceCategory::Trend, vec![sig(Indicator::Adx, "weak", 0.4)]);
            e
        };
        // 2.0 + 1.0 = 3.0
        assert_eq!(infer_risk_level(&medium_weak).value, RiskLevel::Medium);
    }
}
