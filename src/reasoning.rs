//! Human-readable reasoning trace for a finished analysis

use crate::signals::core::Evidence;
use crate::signals::inference::Judgments;
use chrono::{DateTime, Utc};

/// Categories at or below this average confidence are left out of "Key Evidence"
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// `bull_trend` -> `Bull Trend`
fn title_case(label: &str) -> String {
    label
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct ReasoningChainBuilder<'a> {
    symbol: &'a str,
    timestamp: DateTime<Utc>,
    contradictions: usize,
    confirmations: usize,
}

impl<'a> ReasoningChainBuilder<'a> {
    pub fn new(symbol: &'a str, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol,
            timestamp,
            contradictions: 0,
            confirmations: 0,
        }
    }

    pub fn contradictions(mut self, count: usize) -> Self {
        self.contradictions = count;
        self
    }

    pub fn confirmations(mut self, count: usize) -> Self {
        self.confirmations = count;
        self
    }

    /// Overall confidence is the market state confidence
    pub fn build(&self, evidence: &Evidence, judgments: &Judgments) -> Vec<String> {
        let mut chain = vec![
            format!(
                "Comprehensive Analysis for {} at {}",
                self.symbol,
                self.timestamp.format("%Y-%m-%d %H:%M")
            ),
            format!(
                "Overall Confidence: {:.1}%",
                judgments.market_state.confidence * 100.0
            ),
            format!(
                "Market State: {}",
                title_case(judgments.market_state.value.as_str())
            ),
            format!(
                "Trend Direction: {}",
                title_case(judgments.trend_direction.value.as_str())
            ),
            format!(
                "Risk Level: {}",
                title_case(judgments.risk_level.value.as_str())
            ),
        ];

        let key_evidence: Vec<String> = evidence
            .iter()
            .filter(|c| c.avg_confidence > HIGH_CONFIDENCE)
            .map(|c| format!("- {}: High confidence signals", title_case(c.category.name())))
            .collect();
        if !key_evidence.is_empty() {
            chain.push("Key Evidence:".to_string());
            chain.extend(key_evidence);
        }

        if self.contradictions > 0 {
            chain.push(format!(
                "Detected {} indicator contradictions",
                self.contradictions
            ));
        }
        if self.confirmations > 0 {
            chain.push(format!(
                "Found {} strong indicator confirmations",
                self.confirmations
            ));
        }

        chain
    }
}
