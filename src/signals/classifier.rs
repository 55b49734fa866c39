//! Signal classifiers
//!
//! Pure functions mapping one raw indicator reading (or a small tuple of
//! readings) to a qualitative label with a confidence in [0, 1]. The thresholds
//! below are the system's tuning knobs.
//!
//! Non-finite input is a caller error and is reported, never defaulted.

use super::core::Classification;
use anyhow::{Result, anyhow};

/// Deviation beyond which price is "strongly" above/below its moving average
pub const MA_DEVIATION_THRESHOLD: f64 = 0.02;

/// Histogram magnitude that makes a MACD signal "strong"
pub const MACD_STRONG_HIST: f64 = 0.02;

fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(anyhow!("{} input must be finite, got: {}", name, v));
    }
    Ok(())
}

/// Price relative to a moving average
pub fn classify_ma(current: f64, ma: f64) -> Result<Classification> {
    ensure_finite("Moving average", &[current, ma])?;
    if ma == 0.0 {
        return Err(anyhow!("Moving average must be non-zero"));
    }

    let deviation = (current - ma) / ma;
    let classification = if deviation > MA_DEVIATION_THRESHOLD {
        Classification::new("strong_above", (deviation * 2.0).min(1.0))
    } else if deviation > 0.0 {
        Classification::new("above", deviation * 1.5)
    } else if deviation < -MA_DEVIATION_THRESHOLD {
        Classification::new("strong_below", (deviation.abs() * 2.0).min(1.0))
    } else {
        Classification::new("below", deviation.abs() * 1.5)
    };
    Ok(classification)
}

/// Trend strength from ADX
pub fn classify_adx(value: f64) -> Result<Classification> {
    ensure_finite("ADX", &[value])?;
    let classification = if value > 40.0 {
        Classification::new("very_strong", 0.95)
    } else if value > 25.0 {
        Classification::new("strong", 0.8)
    } else if value > 20.0 {
        Classification::new("moderate", 0.6)
    } else {
        Classification::new("weak", 0.4)
    };
    Ok(classification)
}

pub fn classify_rsi(value: f64) -> Result<Classification> {
    ensure_finite("RSI", &[value])?;
    let classification = if value > 80.0 {
        Classification::new("extremely_overbought", 0.95)
    } else if value > 70.0 {
        Classification::new("overbought", 0.8)
    } else if value < 20.0 {
        Classification::new("extremely_oversold", 0.95)
    } else if value < 30.0 {
        Classification::new("oversold", 0.8)
    } else {
        Classification::new("neutral", 0.5)
    };
    Ok(classification)
}

pub fn classify_macd(macd: f64, signal: f64, hist: f64) -> Result<Classification> {
    ensure_finite("MACD", &[macd, signal, hist])?;

    let direction = if macd > signal && macd > 0.0 {
        "bullish"
    } else if macd < signal && macd < 0.0 {
        "bearish"
    } else {
        return Ok(Classification::new("neutral", 0.4));
    };

    if hist.abs() > MACD_STRONG_HIST {
        Ok(Classification::new(format!("strong_{direction}"), 0.85))
    } else {
        Ok(Classification::new(direction, 0.6))
    }
}

pub fn classify_stochastic(k: f64, d: f64) -> Result<Classification> {
    ensure_finite("Stochastic", &[k, d])?;
    let classification = if k > 80.0 && d > 80.0 {
        Classification::new("overbought", 0.8)
    } else if k < 20.0 && d < 20.0 {
        Classification::new("oversold", 0.8)
    } else if k > d && k < 50.0 {
        Classification::new("bullish_cross", 0.7)
    } else if k < d && k > 50.0 {
        Classification::new("bearish_cross", 0.7)
    } else {
        Classification::new("neutral", 0.5)
    };
    Ok(classification)
}

/// Money flow index uses the RSI bands
pub fn classify_mfi(value: f64) -> Result<Classification> {
    ensure_finite("MFI", &[value])?;
    classify_rsi(value)
}

pub fn classify_cci(value: f64) -> Result<Classification> {
    ensure_finite("CCI", &[value])?;
    let classification = if value > 100.0 {
        Classification::new("overbought", 0.7)
    } else if value < -100.0 {
        Classification::new("oversold", 0.7)
    } else {
        Classification::new("neutral", 0.5)
    };
    Ok(classification)
}

/// Directional-index sign (+DI vs -DI)
pub fn classify_directional_index(plus_di: f64, minus_di: f64) -> Result<Classification> {
    ensure_finite("Directional index", &[plus_di, minus_di])?;
    let classification = if plus_di > minus_di {
        Classification::new("bullish", 0.7)
    } else if plus_di < minus_di {
        Classification::new("bearish", 0.7)
    } else {
        Classification::new("neutral", 0.5)
    };
    Ok(classification)
}

/// Volume profile from the last bar's volume ratio and close-to-close change
pub fn classify_volume_profile(volume_ratio: f64, price_change: f64) -> Result<Classification> {
    ensure_finite("Volume profile", &[volume_ratio, price_change])?;
    let classification = if volume_ratio > 1.5 && price_change > 0.0 {
        Classification::new("strong_accumulation", 0.8)
    } else if volume_ratio > 1.0 && price_change > 0.0 {
        Classification::new("accumulation", 0.6)
    } else if volume_ratio > 1.0 && price_change < 0.0 {
        Classification::new("distribution", 0.7)
    } else {
        Classification::new("neutral", 0.5)
    };
    Ok(classification)
}

/// Volatility regime from annualised return volatility
pub fn classify_volatility(annualized_volatility: f64) -> Result<Classification> {
    ensure_finite("Volatility", &[annualized_volatility])?;
    let classification = if annualized_volatility > 0.40 {
        Classification::new("high", 0.8)
    } else if annualized_volatility > 0.20 {
        Classification::new("medium", 0.6)
    } else {
        Classification::new("low", 0.7)
    };
    Ok(classification)
}

/// Close relative to the ichimoku cloud
pub fn classify_ichimoku_cloud(close: f64, senkou_a: f64, senkou_b: f64) -> Result<Classification> {
    ensure_finite("Ichimoku cloud", &[close, senkou_a, senkou_b])?;
    let (top, bottom) = (senkou_a.max(senkou_b), senkou_a.min(senkou_b));
    let classification = if close > top {
        Classification::new("bullish_cloud", 0.7)
    } else if close < bottom {
        Classification::new("bearish_cloud", 0.7)
    } else {
        Classification::new("inside_cloud", 0.5)
    };
    Ok(classification)
}

/// Tenkan-sen vs kijun-sen
pub fn classify_ichimoku_cross(tenkan: f64, kijun: f64) -> Result<Classification> {
    ensure_finite("Ichimoku cross", &[tenkan, kijun])?;
    let classification = if tenkan > kijun {
        Classification::new("bullish_tk_cross", 0.6)
    } else if tenkan < kijun {
        Classification::new("bearish_tk_cross", 0.6)
    } else {
        Classification::new("neutral_tk", 0.5)
    };
    Ok(classification)
}
