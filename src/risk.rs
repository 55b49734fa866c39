use crate::config::RiskConfig;
use crate::ml::AnomalyAnalysis;
use crate::signals::core::{Evidence, Indicator, RiskLevel, clamp_confidence};
use serde::{Deserialize, Serialize};

/// Added to the level score when the anomaly detector flags the latest bar
pub const ANOMALY_RISK_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub position_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub recommendations: Vec<String>,
}

/// Numeric risk in [0, 1] for a level, raised when an anomaly was flagged
pub fn risk_score(level: RiskLevel, anomaly: &AnomalyAnalysis) -> f64 {
    let penalty = if anomaly.is_anomaly {
        ANOMALY_RISK_PENALTY
    } else {
        0.0
    };
    clamp_confidence(level.score() + penalty)
}

/// Names of the conditions that raised the risk level
pub fn risk_factors(evidence: &Evidence, anomaly: &AnomalyAnalysis) -> Vec<String> {
    let mut factors = Vec::new();

    match evidence.volatility.label_of(Indicator::VolatilityRegime) {
        Some("high") => factors.push("high_volatility".to_string()),
        Some("medium") => factors.push("elevated_volatility".to_string()),
        _ => {}
    }
    if evidence.trend.label_of(Indicator::Adx) == Some("weak") {
        factors.push("weak_trend".to_string());
    }
    if evidence
        .momentum
        .labels()
        .any(|l| l.contains("overbought") || l.contains("oversold"))
    {
        factors.push("momentum_exhaustion".to_string());
    }
    if anomaly.is_anomaly {
        factors.push(anomaly.anomaly_type.clone());
    }

    factors
}

/// Position sizing and exit levels from a risk score. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct RiskManager {
    pub config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Capital to commit: the configured maximum scaled down by risk
    pub fn calculate_position_size(&self, risk_score: f64) -> f64 {
        let max_position_value = self.config.portfolio_value * self.config.max_position_size;
        max_position_value * (1.0 - clamp_confidence(risk_score))
    }

    pub fn calculate_stop_loss(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.config.stop_loss_percentage)
    }

    pub fn calculate_take_profit(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.config.take_profit_percentage)
    }

    /// Sizing, exits and advice for one position. The advice tier follows the
    /// same score that scales the position.
    pub fn assess(
        &self,
        risk_score: f64,
        current_price: f64,
        risk_factors: Vec<String>,
    ) -> RiskAssessment {
        let risk_score = clamp_confidence(risk_score);
        let risk_level = RiskLevel::from_score(risk_score);
        let position_size = self.calculate_position_size(risk_score);
        let stop_loss = self.calculate_stop_loss(current_price);
        let take_profit = self.calculate_take_profit(current_price);

        let mut recommendations = Vec::new();
        match risk_level {
            RiskLevel::VeryHigh | RiskLevel::High => {
                recommendations.push("Reduce position size due to elevated risk".to_string());
                recommendations.push(format!("Use a tight stop loss at {:.2}", stop_loss));
            }
            RiskLevel::Medium => {
                recommendations.push("Use standard position sizing".to_string());
                recommendations.push(format!("Set stop loss at {:.2}", stop_loss));
            }
            RiskLevel::Low | RiskLevel::VeryLow => {
                recommendations.push("Risk is contained; full position size allowed".to_string());
                recommendations.push(format!("Set stop loss at {:.2}", stop_loss));
            }
        }
        recommendations.push(format!("Take profit target at {:.2}", take_profit));
        if risk_factors.iter().any(|f| f == "high_volatility") {
            recommendations.push("Expect wide price swings; avoid adding on strength".to_string());
        }

        RiskAssessment {
            risk_score,
            risk_level,
            risk_factors,
            position_size,
            stop_loss,
            take_profit,
            recommendations,
        }
    }
}
