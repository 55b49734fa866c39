//! Signal Layer
//!
//! Turns raw indicator readings into qualitative signals, groups them into
//! evidence categories and infers the market state, trend direction and risk
//! level from that evidence.

pub mod classifier;
pub mod core;
pub mod evidence;
pub mod inference;
pub mod utils;

// Re-export core types for easy access
pub use core::{
    CategoryEvidence, Classification, Evidence, EvidenceCategory, Indicator, Judgment,
    MarketState, Polarity, RiskLevel, SignalEvidence, TrendDirection,
};
pub use evidence::EvidenceAggregator;
pub use inference::{Judgments, infer_all, infer_market_state, infer_risk_level, infer_trend_direction};
pub use utils::SignalUtils;
