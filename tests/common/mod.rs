#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use ontotrade::market_data::{Bar, IndicatorSnapshot, MarketSnapshot};
use ontotrade::ml::{AnomalyDetector, MlDirection, MlPrediction, MlPredictor};

pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_153_600, 0).unwrap() // 2024-01-02
}

/// Slowly rising closes with constant volume, optionally doubling the last
/// bar's volume
pub fn rising_bars(count: i64, volume_spike: bool) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.1;
            let volume = if volume_spike && i == count - 1 {
                2_000_000.0
            } else {
                1_000_000.0
            };
            Bar {
                timestamp: start() + Duration::days(i),
                open: close - 0.05,
                high: close + 0.2,
                low: close - 0.2,
                close,
                volume,
            }
        })
        .collect()
}

/// Strong uptrend: very strong ADX with bullish DI, two bullish momentum
/// signals and strong accumulation on the last bar
pub fn bullish_snapshot(symbol: &str) -> MarketSnapshot {
    MarketSnapshot::new(
        symbol,
        rising_bars(60, true),
        IndicatorSnapshot {
            adx: Some(42.0),
            plus_di: Some(30.0),
            minus_di: Some(12.0),
            macd: Some(1.2),
            macd_signal: Some(0.9),
            stoch_k: Some(40.0),
            stoch_d: Some(30.0),
            ..Default::default()
        },
    )
}

/// Bearish directional index against a strongly bullish MACD
pub fn conflicted_snapshot(symbol: &str) -> MarketSnapshot {
    MarketSnapshot::new(
        symbol,
        rising_bars(60, false),
        IndicatorSnapshot {
            adx: Some(30.0),
            plus_di: Some(10.0),
            minus_di: Some(30.0),
            macd: Some(1.2),
            macd_signal: Some(0.9),
            rsi: Some(50.0),
            ..Default::default()
        },
    )
}

pub struct FixedPredictor {
    pub direction: MlDirection,
    pub confidence: f64,
}

impl MlPredictor for FixedPredictor {
    fn predict(&self, _features: &[f64]) -> Result<MlPrediction> {
        Ok(MlPrediction {
            direction: self.direction,
            confidence: self.confidence,
        })
    }
}

pub struct FixedDetector(pub f64);

impl AnomalyDetector for FixedDetector {
    fn is_fitted(&self) -> bool {
        true
    }

    fn detect(&self, _features: &[f64]) -> Result<f64> {
        Ok(self.0)
    }
}
