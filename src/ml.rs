//! Machine-learning collaborators
//!
//! The engine does not train or run models. It calls a predictor and an
//! anomaly detector through the traits below and interprets what they return.
//! Collaborator failures degrade to neutral results instead of failing the run.

use crate::market_data::MarketSnapshot;
use crate::signals::evidence::VOLATILITY_LOOKBACK;
use crate::signals::utils::SignalUtils;
use anyhow::Result;
use log::{debug, warn};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Confidence above which a directional prediction becomes a buy/sell call
pub const ML_ACTION_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MlDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl MlDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MlDirection::Bullish => "bullish",
            MlDirection::Bearish => "bearish",
            MlDirection::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    pub direction: MlDirection,
    pub confidence: f64,
}

#[cfg_attr(test, automock)]
pub trait MlPredictor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<MlPrediction>;
}

#[cfg_attr(test, automock)]
pub trait AnomalyDetector: Send + Sync {
    fn is_fitted(&self) -> bool;

    /// Raw model output; `-1` marks an outlier
    fn detect(&self, features: &[f64]) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MlRecommendation {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlAnalysis {
    pub prediction: MlDirection,
    pub confidence: f64,
    pub recommendation: MlRecommendation,
    pub anomaly_score: f64,
}

impl MlAnalysis {
    pub fn neutral() -> Self {
        Self {
            prediction: MlDirection::Neutral,
            confidence: 0.0,
            recommendation: MlRecommendation::Hold,
            anomaly_score: 0.0,
        }
    }

    fn from_prediction(prediction: MlPrediction) -> Self {
        let confidence = crate::signals::core::clamp_confidence(prediction.confidence);
        let recommendation = match prediction.direction {
            MlDirection::Bullish if confidence > ML_ACTION_THRESHOLD => MlRecommendation::Buy,
            MlDirection::Bearish if confidence > ML_ACTION_THRESHOLD => MlRecommendation::Sell,
            _ => MlRecommendation::Hold,
        };
        Self {
            prediction: prediction.direction,
            confidence,
            recommendation,
            anomaly_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAnalysis {
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub anomaly_type: String,
    pub confidence: f64,
}

impl AnomalyAnalysis {
    pub fn none() -> Self {
        Self {
            is_anomaly: false,
            anomaly_score: 0.0,
            anomaly_type: "none".to_string(),
            confidence: 0.0,
        }
    }

    /// Map raw detector output: negative (-1) is an outlier
    pub fn from_raw(raw: f64) -> Self {
        let is_anomaly = raw < 0.0;
        Self {
            is_anomaly,
            anomaly_score: raw.abs(),
            anomaly_type: if is_anomaly { "price_anomaly" } else { "normal" }.to_string(),
            confidence: if is_anomaly { 0.9 } else { 0.1 },
        }
    }
}

/// Feature vector handed to both collaborators:
/// `[last_return, volume_ratio, rsi, macd_hist, adx, annualised_volatility]`
pub fn build_features(snapshot: &MarketSnapshot) -> Vec<f64> {
    let ind = &snapshot.indicators;
    let closes = snapshot.closes();
    let window = &closes[closes.len().saturating_sub(VOLATILITY_LOOKBACK + 1)..];
    let volatility = SignalUtils::calculate_volatility(window, true).unwrap_or(0.0);
    let macd_hist = ind
        .macd_hist
        .or_else(|| ind.macd.zip(ind.macd_signal).map(|(m, s)| m - s))
        .unwrap_or(0.0);

    vec![
        snapshot.last_return(),
        snapshot.volume_ratio().unwrap_or(1.0),
        ind.rsi.unwrap_or(50.0),
        macd_hist,
        ind.adx.unwrap_or(0.0),
        volatility,
    ]
}

/// Run the predictor, degrading to a neutral result when it is disabled,
/// absent or failing
pub fn run_prediction(
    symbol: &str,
    predictor: Option<&dyn MlPredictor>,
    ml_enabled: bool,
    features: &[f64],
) -> MlAnalysis {
    let Some(predictor) = predictor.filter(|_| ml_enabled) else {
        debug!("ML prediction skipped for {}", symbol);
        return MlAnalysis::neutral();
    };

    match predictor.predict(features) {
        Ok(prediction) => MlAnalysis::from_prediction(prediction),
        Err(e) => {
            warn!("ML prediction failed for {}: {}", symbol, e);
            MlAnalysis::neutral()
        }
    }
}

/// Run the anomaly detector with the same degradation rules as prediction;
/// an unfitted detector is treated as absent
pub fn run_anomaly_detection(
    symbol: &str,
    detector: Option<&dyn AnomalyDetector>,
    ml_enabled: bool,
    features: &[f64],
) -> AnomalyAnalysis {
    let Some(detector) = detector.filter(|d| ml_enabled && d.is_fitted()) else {
        debug!("Anomaly detection skipped for {}", symbol);
        return AnomalyAnalysis::none();
    };

    match detector.detect(features) {
        Ok(raw) => AnomalyAnalysis::from_raw(raw),
        Err(e) => {
            warn!("Anomaly detection failed for {}: {}", symbol, e);
            AnomalyAnalysis::none()
        }
    }
}
