//! Shared numeric helpers for evidence extraction and pattern detection

use anyhow::Result;
use statrs::statistics::Statistics;

/// Trading days used to annualise daily volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Shared signal calculation utilities
pub struct SignalUtils;

impl SignalUtils {
    /// Calculate historical volatility from price data
    ///
    /// # Arguments
    /// * `prices` - Historical price data
    /// * `annualized` - Whether to annualize the volatility (assume daily data)
    ///
    /// # Returns
    /// * `f64` - Volatility as population standard deviation of log returns
    pub fn calculate_volatility(prices: &[f64], annualized: bool) -> Result<f64> {
        if prices.len() < 2 {
            return Err(anyhow::anyhow!(
                "Need at least 2 prices for volatility calculation"
            ));
        }

        let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(anyhow::anyhow!("Prices must be positive for log returns"));
        }

        let mut volatility = returns.population_std_dev();

        if annualized {
            volatility *= TRADING_DAYS_PER_YEAR.sqrt();
        }

        Ok(volatility)
    }

    /// Simple moving average series aligned with `prices`; positions before the
    /// first full window are `None`
    pub fn simple_moving_average(prices: &[f64], period: usize) -> Vec<Option<f64>> {
        if period == 0 {
            return vec![None; prices.len()];
        }

        let mut averages = Vec::with_capacity(prices.len());
        let mut window_sum = 0.0;
        for (idx, price) in prices.iter().enumerate() {
            window_sum += price;
            if idx >= period {
                window_sum -= prices[idx - period];
            }
            if idx + 1 >= period {
                averages.push(Some(window_sum / period as f64));
            } else {
                averages.push(None);
            }
        }
        averages
    }

    /// Arithmetic mean, `default` for an empty slice
    pub fn mean_or(values: &[f64], default: f64) -> f64 {
        if values.is_empty() {
            default
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatility_calculation() {
        let prices = vec![100.0, 102.0, 101.0, 103.0, 102.5];
        let volatility = SignalUtils::calculate_volatility(&prices, false).unwrap();
        assert!(volatility > 0.0);
        assert!(volatility < 1.0);

        let annualized = SignalUtils::calculate_volatility(&prices, true).unwrap();
        assert!((annualized - volatility * 252.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_needs_two_prices() {
        assert!(SignalUtils::calculate_volatility(&[100.0], false).is_err());
        assert_eq!(
            SignalUtils::calculate_volatility(&[100.0, 100.0, 100.0], false).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_simple_moving_average() {
        let sma = SignalUtils::simple_moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(sma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);

        let too_short = SignalUtils::simple_moving_average(&[1.0, 2.0], 3);
        assert!(too_short.iter().all(Option::is_none));
    }

    #[test]
    fn test_mean_or_default() {
        assert_eq!(SignalUtils::mean_or(&[], 0.5), 0.5);
        assert!((SignalUtils::mean_or(&[0.2, 0.4], 0.5) - 0.3).abs() < 1e-12);
    }
}
