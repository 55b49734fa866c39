//! Core signal types shared by the classifier, evidence and inference layers
//!
//! A raw indicator reading becomes a [`Classification`], classifications are
//! grouped into [`CategoryEvidence`] buckets, and the buckets feed the
//! categorical [`Judgment`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Indicator (or derived series) a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Sma20,
    Sma50,
    Ema20,
    Adx,
    DirectionalIndex,
    Rsi,
    Macd,
    Stochastic,
    Mfi,
    Cci,
    VolumeProfile,
    VolatilityRegime,
    IchimokuCloud,
    IchimokuCross,
}

impl Indicator {
    pub fn name(&self) -> &'static str {
        match self {
            Indicator::Sma20 => "sma_20",
            Indicator::Sma50 => "sma_50",
            Indicator::Ema20 => "ema_20",
            Indicator::Adx => "adx",
            Indicator::DirectionalIndex => "directional_index",
            Indicator::Rsi => "rsi",
            Indicator::Macd => "macd",
            Indicator::Stochastic => "stochastic",
            Indicator::Mfi => "mfi",
            Indicator::Cci => "cci",
            Indicator::VolumeProfile => "volume_profile",
            Indicator::VolatilityRegime => "volatility_regime",
            Indicator::IchimokuCloud => "ichimoku_cloud",
            Indicator::IchimokuCross => "ichimoku_cross",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Qualitative label plus a confidence clamped to [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Directional reading of a qualitative label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Bullish,
    Bearish,
    Neutral,
}

impl Polarity {
    /// Oversold/overbought read as reversal signals: oversold is bullish,
    /// overbought is bearish.
    pub fn of_label(label: &str) -> Self {
        const BULLISH: [&str; 5] = ["bullish", "above", "oversold", "accumulation", "up"];
        const BEARISH: [&str; 5] = ["bearish", "below", "overbought", "distribution", "down"];

        if BEARISH.iter().any(|k| label.contains(k)) {
            Polarity::Bearish
        } else if BULLISH.iter().any(|k| label.contains(k)) {
            Polarity::Bullish
        } else {
            Polarity::Neutral
        }
    }

    pub fn opposes(&self, other: &Polarity) -> bool {
        matches!(
            (self, other),
            (Polarity::Bullish, Polarity::Bearish) | (Polarity::Bearish, Polarity::Bullish)
        )
    }
}

/// Named evidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Trend,
    Momentum,
    Volume,
    Volatility,
    Structure,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 5] = [
        EvidenceCategory::Trend,
        EvidenceCategory::Momentum,
        EvidenceCategory::Volume,
        EvidenceCategory::Volatility,
        EvidenceCategory::Structure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EvidenceCategory::Trend => "trend",
            EvidenceCategory::Momentum => "momentum",
            EvidenceCategory::Volume => "volume",
            EvidenceCategory::Volatility => "volatility",
            EvidenceCategory::Structure => "structure",
        }
    }
}

/// One classified reading inside a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvidence {
    pub indicator: Indicator,
    pub label: String,
    pub confidence: f64,
}

/// Classified signals for one category with their mean confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEvidence {
    pub category: EvidenceCategory,
    pub signals: Vec<SignalEvidence>,
    pub avg_confidence: f64,
}

/// Mean confidence used for a category with no evidence
pub const DEFAULT_CATEGORY_CONFIDENCE: f64 = 0.5;

impl CategoryEvidence {
    pub fn new(category: EvidenceCategory, signals: Vec<SignalEvidence>) -> Self {
        let avg_confidence = if signals.is_empty() {
            DEFAULT_CATEGORY_CONFIDENCE
        } else {
            signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64
        };

        Self {
            category,
            signals,
            avg_confidence,
        }
    }

    pub fn empty(category: EvidenceCategory) -> Self {
        Self::new(category, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.label.as_str())
    }

    pub fn confidences(&self) -> Vec<f64> {
        self.signals.iter().map(|s| s.confidence).collect()
    }

    fn find(&self, indicator: Indicator) -> Option<&SignalEvidence> {
        self.signals.iter().find(|s| s.indicator == indicator)
    }

    pub fn label_of(&self, indicator: Indicator) -> Option<&str> {
        self.find(indicator).map(|s| s.label.as_str())
    }

    pub fn confidence_of(&self, indicator: Indicator) -> Option<f64> {
        self.find(indicator).map(|s| s.confidence)
    }

    /// Number of signal labels containing `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.labels().filter(|l| l.contains(needle)).count()
    }
}

/// All five categories for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub trend: CategoryEvidence,
    pub momentum: CategoryEvidence,
    pub volume: CategoryEvidence,
    pub volatility: CategoryEvidence,
    pub structure: CategoryEvidence,
}

impl Evidence {
    pub fn empty() -> Self {
        Self {
            trend: CategoryEvidence::empty(EvidenceCategory::Trend),
            momentum: CategoryEvidence::empty(EvidenceCategory::Momentum),
            volume: CategoryEvidence::empty(EvidenceCategory::Volume),
            volatility: CategoryEvidence::empty(EvidenceCategory::Volatility),
            structure: CategoryEvidence::empty(EvidenceCategory::Structure),
        }
    }

    pub fn get(&self, category: EvidenceCategory) -> &CategoryEvidence {
        match category {
            EvidenceCategory::Trend => &self.trend,
            EvidenceCategory::Momentum => &self.momentum,
            EvidenceCategory::Volume => &self.volume,
            EvidenceCategory::Volatility => &self.volatility,
            EvidenceCategory::Structure => &self.structure,
        }
    }

    /// Categories in display order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryEvidence> {
        EvidenceCategory::ALL.into_iter().map(move |c| self.get(c))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    BullTrend,
    BearTrend,
    SidewaysConsolidation,
    VolatileBreakout,
    RangeBound,
}

impl MarketState {
    /// Enumeration order doubles as the tie-break order
    pub const ALL: [MarketState; 5] = [
        MarketState::BullTrend,
        MarketState::BearTrend,
        MarketState::SidewaysConsolidation,
        MarketState::VolatileBreakout,
        MarketState::RangeBound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketState::BullTrend => "bull_trend",
            MarketState::BearTrend => "bear_trend",
            MarketState::SidewaysConsolidation => "sideways_consolidation",
            MarketState::VolatileBreakout => "volatile_breakout",
            MarketState::RangeBound => "range_bound",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    StrongUp,
    ModerateUp,
    Neutral,
    ModerateDown,
    StrongDown,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::StrongUp => "strong_up",
            TrendDirection::ModerateUp => "moderate_up",
            TrendDirection::Neutral => "neutral",
            TrendDirection::ModerateDown => "moderate_down",
            TrendDirection::StrongDown => "strong_down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        }
    }

    /// Numeric risk score in [0, 1] used by the risk manager and overall score
    pub fn score(&self) -> f64 {
        match self {
            RiskLevel::VeryLow => 0.1,
            RiskLevel::Low => 0.3,
            RiskLevel::Medium => 0.5,
            RiskLevel::High => 0.7,
            RiskLevel::VeryHigh => 0.9,
        }
    }

    /// Inverse of `score`. Each band extends 0.15 above its level's score so
    /// the anomaly penalty does not move a score into the next level.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            RiskLevel::VeryHigh
        } else if score >= 0.65 {
            RiskLevel::High
        } else if score >= 0.45 {
            RiskLevel::Medium
        } else if score >= 0.25 {
            RiskLevel::Low
        } else {
            RiskLevel::VeryLow
        }
    }
}

macro_rules! impl_display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(MarketState, TrendDirection, RiskLevel);

/// Categorical inference output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Judgment<T> {
    pub value: T,
    pub confidence: f64,
}

impl<T> Judgment<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            value,
            confidence: clamp_confidence(confidence),
        }
    }
}

/// Score accumulator keyed by market state, kept in enumeration order
#[derive(Debug, Clone, Default)]
pub(crate) struct StateScores {
    scores: [f64; 5],
    confidences: [Vec<f64>; 5],
}

impl StateScores {
    pub(crate) fn add(&mut self, state: MarketState, score: f64, confidence: f64) {
        self.scores[state.index()] += score;
        self.confidences[state.index()].push(confidence);
    }

    pub(crate) fn max_score(&self) -> f64 {
        self.scores.iter().copied().fold(0.0, f64::max)
    }

    /// First state holding the maximum score wins ties
    pub(crate) fn winner(&self) -> MarketState {
        let mut best = MarketState::ALL[0];
        for state in MarketState::ALL {
            if self.scores[state.index()] > self.scores[best.index()] {
                best = state;
            }
        }
        best
    }

    pub(crate) fn confidences(&self, state: MarketState) -> &[f64] {
        &self.confidences[state.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_of_labels() {
        assert_eq!(Polarity::of_label("strong_bullish"), Polarity::Bullish);
        assert_eq!(Polarity::of_label("strong_above"), Polarity::Bullish);
        assert_eq!(Polarity::of_label("extremely_oversold"), Polarity::Bullish);
        assert_eq!(Polarity::of_label("strong_accumulation"), Polarity::Bullish);
        assert_eq!(Polarity::of_label("bearish_cross"), Polarity::Bearish);
        assert_eq!(Polarity::of_label("strong_below"), Polarity::Bearish);
        assert_eq!(Polarity::of_label("overbought"), Polarity::Bearish);
        assert_eq!(Polarity::of_label("distribution"), Polarity::Bearish);
        assert_eq!(Polarity::of_label("neutral"), Polarity::Neutral);
        assert_eq!(Polarity::of_label("very_strong"), Polarity::Neutral);
        assert!(Polarity::Bullish.opposes(&Polarity::Bearish));
        assert!(!Polarity::Neutral.opposes(&Polarity::Bearish));
    }

    #[test]
    fn test_category_average_defaults_to_half() {
        let empty = CategoryEvidence::empty(EvidenceCategory::Volume);
        assert_eq!(empty.avg_confidence, 0.5);

        let filled = CategoryEvidence::new(
            EvidenceCategory::Momentum,
            vec![
                SignalEvidence { indicator: Indicator::Rsi, label: "neutral".into(), confidence: 0.5 },
                SignalEvidence { indicator: Indicator::Macd, label: "strong_bullish".into(), confidence: 0.85 },
            ],
        );
        assert!((filled.avg_confidence - 0.675).abs() < 1e-9);
        assert_eq!(filled.count_containing("bullish"), 1);
        assert_eq!(filled.label_of(Indicator::Rsi), Some("neutral"));
    }

    #[test]
    fn test_state_scores_first_max_wins() {
        let mut scores = StateScores::default();
        assert_eq!(scores.winner(), MarketState::BullTrend);

        scores.add(MarketState::BearTrend, 0.3, 0.8);
        scores.add(MarketState::VolatileBreakout, 0.3, 0.6);
        assert_eq!(scores.winner(), MarketState::BearTrend);
        assert_eq!(scores.max_score(), 0.3);
    }

    #[test]
    fn test_risk_level_score_round_trip() {
        for level in [
            RiskLevel::VeryLow,
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::VeryHigh,
        ] {
            assert_eq!(RiskLevel::from_score(level.score()), level);
            assert_eq!(RiskLevel::from_score(level.score() + 0.1), level);
        }
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::VeryLow);
    }

    #[test]
    fn test_classification_clamps() {
        assert_eq!(Classification::new("x", 1.7).confidence, 1.0);
        assert_eq!(Classification::new("x", -0.2).confidence, 0.0);
    }
}
