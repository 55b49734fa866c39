//! Evidence aggregation
//!
//! Runs each available indicator reading through its classifier, groups the
//! results into the five evidence categories and records every reading and
//! classification in the run's knowledge graph.

use super::classifier;
use super::core::{CategoryEvidence, Classification, Evidence, EvidenceCategory, Indicator, SignalEvidence};
use super::utils::SignalUtils;
use crate::market_data::MarketSnapshot;
use crate::ontology::{KnowledgeGraph, Predicate};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;

/// Bars used for the volatility regime
pub const VOLATILITY_LOOKBACK: usize = 20;

/// Builds categorised evidence for one snapshot
pub struct EvidenceAggregator<'a> {
    graph: &'a mut KnowledgeGraph,
    subject: String,
    timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Buckets {
    trend: Vec<SignalEvidence>,
    momentum: Vec<SignalEvidence>,
    volume: Vec<SignalEvidence>,
    volatility: Vec<SignalEvidence>,
    structure: Vec<SignalEvidence>,
}

impl Buckets {
    fn bucket(&mut self, category: EvidenceCategory) -> &mut Vec<SignalEvidence> {
        match category {
            EvidenceCategory::Trend => &mut self.trend,
            EvidenceCategory::Momentum => &mut self.momentum,
            EvidenceCategory::Volume => &mut self.volume,
            EvidenceCategory::Volatility => &mut self.volatility,
            EvidenceCategory::Structure => &mut self.structure,
        }
    }
}

impl<'a> EvidenceAggregator<'a> {
    pub fn new(graph: &'a mut KnowledgeGraph, subject: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            graph,
            subject: subject.to_string(),
            timestamp,
        }
    }

    /// Classify every available reading in `snapshot`
    pub fn aggregate(mut self, snapshot: &MarketSnapshot) -> Result<Evidence> {
        let mut buckets = Buckets::default();
        let ind = &snapshot.indicators;
        let close = snapshot.current_price();

        // Trend
        for (indicator, ma) in [
            (Indicator::Sma20, ind.sma_20),
            (Indicator::Sma50, ind.sma_50),
            (Indicator::Ema20, ind.ema_20),
        ] {
            if let Some(ma) = ma {
                self.record_value(indicator, ma);
                let class = classifier::classify_ma(close, ma)?;
                self.push(&mut buckets, EvidenceCategory::Trend, indicator, class);
            }
        }
        if let Some(adx) = ind.adx {
            self.record_value(Indicator::Adx, adx);
            let class = classifier::classify_adx(adx)?;
            self.push(&mut buckets, EvidenceCategory::Trend, Indicator::Adx, class);
        }
        if let (Some(plus), Some(minus)) = (ind.plus_di, ind.minus_di) {
            self.record_value(Indicator::DirectionalIndex, plus - minus);
            let class = classifier::classify_directional_index(plus, minus)?;
            self.push(&mut buckets, EvidenceCategory::Trend, Indicator::DirectionalIndex, class);
        }

        // Momentum
        if let Some(rsi) = ind.rsi {
            self.record_value(Indicator::Rsi, rsi);
            let class = classifier::classify_rsi(rsi)?;
            self.push(&mut buckets, EvidenceCategory::Momentum, Indicator::Rsi, class);
        }
        if let (Some(macd), Some(signal)) = (ind.macd, ind.macd_signal) {
            let hist = ind.macd_hist.unwrap_or(macd - signal);
            self.record_value(Indicator::Macd, macd);
            let class = classifier::classify_macd(macd, signal, hist)?;
            self.push(&mut buckets, EvidenceCategory::Momentum, Indicator::Macd, class);
        }
        if let (Some(k), Some(d)) = (ind.stoch_k, ind.stoch_d) {
            self.record_value(Indicator::Stochastic, k);
            let class = classifier::classify_stochastic(k, d)?;
            self.push(&mut buckets, EvidenceCategory::Momentum, Indicator::Stochastic, class);
        }
        if let Some(mfi) = ind.mfi {
            self.record_value(Indicator::Mfi, mfi);
            let class = classifier::classify_mfi(mfi)?;
            self.push(&mut buckets, EvidenceCategory::Momentum, Indicator::Mfi, class);
        }
        if let Some(cci) = ind.cci {
            self.record_value(Indicator::Cci, cci);
            let class = classifier::classify_cci(cci)?;
            self.push(&mut buckets, EvidenceCategory::Momentum, Indicator::Cci, class);
        }

        // Volume
        if let Some(ratio) = snapshot.volume_ratio() {
            self.record_value(Indicator::VolumeProfile, ratio);
            let class = classifier::classify_volume_profile(ratio, snapshot.last_return())?;
            self.push(&mut buckets, EvidenceCategory::Volume, Indicator::VolumeProfile, class);
        }

        // Volatility
        let closes = snapshot.closes();
        if closes.len() > 2 {
            let window = &closes[closes.len().saturating_sub(VOLATILITY_LOOKBACK + 1)..];
            let volatility = SignalUtils::calculate_volatility(window, true)
                .context("volatility regime")?;
            self.record_value(Indicator::VolatilityRegime, volatility);
            let class = classifier::classify_volatility(volatility)?;
            self.push(&mut buckets, EvidenceCategory::Volatility, Indicator::VolatilityRegime, class);
        }

        // Structure
        if let (Some(a), Some(b)) = (ind.senkou_a, ind.senkou_b) {
            // Distance from the cloud midpoint
            self.record_value(Indicator::IchimokuCloud, close - (a + b) / 2.0);
            let class = classifier::classify_ichimoku_cloud(close, a, b)?;
            self.push(&mut buckets, EvidenceCategory::Structure, Indicator::IchimokuCloud, class);
        }
        if let (Some(tenkan), Some(kijun)) = (ind.tenkan, ind.kijun) {
            self.record_value(Indicator::IchimokuCross, tenkan - kijun);
            let class = classifier::classify_ichimoku_cross(tenkan, kijun)?;
            self.push(&mut buckets, EvidenceCategory::Structure, Indicator::IchimokuCross, class);
        }

        let evidence = Evidence {
            trend: CategoryEvidence::new(EvidenceCategory::Trend, buckets.trend),
            momentum: CategoryEvidence::new(EvidenceCategory::Momentum, buckets.momentum),
            volume: CategoryEvidence::new(EvidenceCategory::Volume, buckets.volume),
            volatility: CategoryEvidence::new(EvidenceCategory::Volatility, buckets.volatility),
            structure: CategoryEvidence::new(EvidenceCategory::Structure, buckets.structure),
        };

        for category in evidence.iter() {
            debug!(
                "{} {}: {} signals, avg confidence {:.2}",
                self.subject,
                category.category.name(),
                category.signals.len(),
                category.avg_confidence
            );
        }

        Ok(evidence)
    }

    fn record_value(&mut self, indicator: Indicator, value: f64) {
        self.graph.assert_fact(
            &self.subject,
            Predicate::IndicatorValue(indicator),
            value,
            1.0,
            self.timestamp,
        );
    }

    fn push(
        &mut self,
        buckets: &mut Buckets,
        category: EvidenceCategory,
        indicator: Indicator,
        class: Classification,
    ) {
        self.graph.assert_fact(
            &self.subject,
            Predicate::Signal(indicator),
            class.label.as_str(),
            class.confidence,
            self.timestamp,
        );
        buckets.bucket(category).push(SignalEvidence {
            indicator,
            label: class.label,
            confidence: class.confidence,
        });
    }
}
