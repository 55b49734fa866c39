use crate::signals::utils::SignalUtils;
use log::debug;
use serde::{Deserialize, Serialize};

pub const SHORT_MA_PERIOD: usize = 20;
pub const LONG_MA_PERIOD: usize = 50;
pub const CROSSOVER_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternDirection {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternRecommendation {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub direction: PatternDirection,
    pub confidence: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub patterns_detected: Vec<Pattern>,
    pub pattern_recommendation: PatternRecommendation,
    /// Mean confidence of the detected patterns, 0 when there are none
    pub pattern_confidence: f64,
}

impl PatternAnalysis {
    pub fn from_patterns(patterns: Vec<Pattern>) -> Self {
        let bullish = patterns
            .iter()
            .filter(|p| p.direction == PatternDirection::Bullish)
            .count();
        let bearish = patterns.len() - bullish;

        let pattern_recommendation = if bullish > bearish {
            PatternRecommendation::Bullish
        } else if bearish > bullish {
            PatternRecommendation::Bearish
        } else {
            PatternRecommendation::Neutral
        };

        let confidences: Vec<f64> = patterns.iter().map(|p| p.confidence).collect();
        Self {
            pattern_confidence: SignalUtils::mean_or(&confidences, 0.0),
            patterns_detected: patterns,
            pattern_recommendation,
        }
    }
}

/// Moving-average crossover detection over a close series
#[derive(Debug, Clone)]
pub struct PatternDetector {
    short_period: usize,
    long_period: usize,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector {
    pub fn new() -> Self {
        Self {
            short_period: SHORT_MA_PERIOD,
            long_period: LONG_MA_PERIOD,
        }
    }

    /// Crossovers between the last two bars. Fewer than `long_period` prices
    /// yields no patterns.
    pub fn detect(&self, prices: &[f64]) -> Vec<Pattern> {
        if prices.len() < self.long_period {
            debug!(
                "Pattern detection skipped: {} prices, need {}",
                prices.len(),
                self.long_period
            );
            return Vec::new();
        }

        let short = SignalUtils::simple_moving_average(prices, self.short_period);
        let long = SignalUtils::simple_moving_average(prices, self.long_period);
        let n = prices.len();

        let (Some(short_now), Some(long_now), Some(short_prev), Some(long_prev)) =
            (short[n - 1], long[n - 1], short[n - 2], long[n - 2])
        else {
            // The long average only has one value: no previous bar to cross from
            return Vec::new();
        };

        let mut patterns = Vec::new();
        if short_now > long_now && short_prev <= long_prev {
            patterns.push(Pattern {
                pattern_type: "golden_cross".to_string(),
                direction: PatternDirection::Bullish,
                confidence: CROSSOVER_CONFIDENCE,
                description: "Golden Cross - Short MA crosses above Long MA".to_string(),
            });
        }
        if short_now < long_now && short_prev >= long_prev {
            patterns.push(Pattern {
                pattern_type: "death_cross".to_string(),
                direction: PatternDirection::Bearish,
                confidence: CROSSOVER_CONFIDENCE,
                description: "Death Cross - Short MA crosses below Long MA".to_string(),
            });
        }
        patterns
    }

    pub fn analyze(&self, prices: &[f64]) -> PatternAnalysis {
        PatternAnalysis::from_patterns(self.detect(prices))
    }
}
