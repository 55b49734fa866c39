use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of prior bars the volume ratio is measured against
pub const VOLUME_LOOKBACK: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Latest values from the indicator-computation collaborator. Any reading may be
/// absent; absent readings contribute no evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSnapshot {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_20: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub mfi: Option<f64>,
    pub cci: Option<f64>,
    pub tenkan: Option<f64>,
    pub kijun: Option<f64>,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
}

impl IndicatorSnapshot {
    fn readings(&self) -> [(&'static str, Option<f64>); 18] {
        [
            ("sma_20", self.sma_20),
            ("sma_50", self.sma_50),
            ("ema_20", self.ema_20),
            ("adx", self.adx),
            ("plus_di", self.plus_di),
            ("minus_di", self.minus_di),
            ("rsi", self.rsi),
            ("macd", self.macd),
            ("macd_signal", self.macd_signal),
            ("macd_hist", self.macd_hist),
            ("stoch_k", self.stoch_k),
            ("stoch_d", self.stoch_d),
            ("mfi", self.mfi),
            ("cci", self.cci),
            ("tenkan", self.tenkan),
            ("kijun", self.kijun),
            ("senkou_a", self.senkou_a),
            ("senkou_b", self.senkou_b),
        ]
    }

    /// Non-finite readings are caller errors, never defaulted
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.readings() {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(anyhow!("Indicator {} must be finite, got: {}", name, v));
                }
            }
        }
        Ok(())
    }
}

/// Everything the engine needs to analyse one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub indicators: IndicatorSnapshot,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>, indicators: IndicatorSnapshot) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            indicators,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(anyhow!("Symbol must not be empty"));
        }
        if self.bars.is_empty() {
            return Err(anyhow!("No price data for {}", self.symbol));
        }

        for (idx, bar) in self.bars.iter().enumerate() {
            let fields = [bar.open, bar.high, bar.low, bar.close, bar.volume];
            if fields.iter().any(|v| !v.is_finite()) {
                return Err(anyhow!(
                    "Bar {} for {} contains a non-finite value",
                    idx,
                    self.symbol
                ));
            }
            if bar.close <= 0.0 {
                return Err(anyhow!(
                    "Bar {} for {} has non-positive close: {}",
                    idx,
                    self.symbol,
                    bar.close
                ));
            }
        }

        if self
            .bars
            .windows(2)
            .any(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(anyhow!(
                "Bars for {} are not sorted ascending by time",
                self.symbol
            ));
        }

        self.indicators.validate()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn current_price(&self) -> f64 {
        self.latest().map(|b| b.close).unwrap_or(0.0)
    }

    /// Percentage change of the last bar's close vs the previous close
    pub fn price_change_pct(&self) -> f64 {
        match self.bars.as_slice() {
            [.., prev, last] if prev.close > 0.0 => (last.close / prev.close - 1.0) * 100.0,
            _ => 0.0,
        }
    }

    /// Fractional close-to-close change of the last bar
    pub fn last_return(&self) -> f64 {
        self.price_change_pct() / 100.0
    }

    /// Last-bar volume relative to the mean of the preceding bars (up to
    /// [`VOLUME_LOOKBACK`]). `None` when there is no prior volume to compare.
    pub fn volume_ratio(&self) -> Option<f64> {
        let (last, prior) = self.bars.split_last()?;
        let window = &prior[prior.len().saturating_sub(VOLUME_LOOKBACK)..];
        if window.is_empty() {
            return None;
        }
        let mean = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        if mean > 0.0 {
            Some(last.volume / mean)
        } else {
            None
        }
    }

    /// Lowest lows over the last 20 and 50 bars
    pub fn support_levels(&self) -> Vec<f64> {
        [20, 50]
            .iter()
            .filter(|&&n| self.bars.len() >= n)
            .map(|&n| {
                self.bars[self.bars.len() - n..]
                    .iter()
                    .map(|b| b.low)
                    .fold(f64::INFINITY, f64::min)
            })
            .collect()
    }

    /// Highest highs over the last 20 and 50 bars
    pub fn resistance_levels(&self) -> Vec<f64> {
        [20, 50]
            .iter()
            .filter(|&&n| self.bars.len() >= n)
            .map(|&n| {
                self.bars[self.bars.len() - n..]
                    .iter()
                    .map(|b| b.high)
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_validate_rejects_nan_indicator() {
        let indicators = IndicatorSnapshot {
            rsi: Some(f64::NAN),
            ..Default::default()
        };
        let snapshot = MarketSnapshot::new("AAPL", bars(&[100.0, 101.0]), indicators);
        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("rsi"));
    }

    #[test]
    fn test_validate_rejects_empty_and_unsorted() {
        let empty = MarketSnapshot::new("AAPL", vec![], IndicatorSnapshot::default());
        assert!(empty.validate().is_err());

        let mut unsorted = bars(&[100.0, 101.0, 102.0]);
        unsorted.swap(0, 2);
        let snapshot = MarketSnapshot::new("AAPL", unsorted, IndicatorSnapshot::default());
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_price_change_and_volume_ratio() {
        let mut series = bars(&[100.0, 102.0]);
        series[1].volume = 3000.0;
        let snapshot = MarketSnapshot::new("AAPL", series, IndicatorSnapshot::default());

        assert!((snapshot.price_change_pct() - 2.0).abs() < 1e-9);
        assert!((snapshot.volume_ratio().unwrap() - 3.0).abs() < 1e-9);

        let single = MarketSnapshot::new("AAPL", bars(&[100.0]), IndicatorSnapshot::default());
        assert_eq!(single.price_change_pct(), 0.0);
        assert!(single.volume_ratio().is_none());
    }

    #[test]
    fn test_support_and_resistance_need_enough_bars() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let snapshot = MarketSnapshot::new("AAPL", bars(&closes), IndicatorSnapshot::default());

        assert_eq!(snapshot.support_levels(), vec![109.0]);
        assert_eq!(snapshot.resistance_levels(), vec![130.0]);
    }
}
