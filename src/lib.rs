//! Evidence-fusion market analysis.
//!
//! Classifies precomputed indicator readings into qualitative signals, fuses
//! them into market state, trend direction and risk judgments, records every
//! step in a per-run knowledge graph and assembles an explainable report with
//! a blended buy/sell/hold recommendation.

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod market_data;
pub mod ml;
pub mod ontology;
pub mod patterns;
pub mod reasoning;
pub mod report;
pub mod risk;
pub mod signals;

pub use cache::ReportCache;
pub use config::{RiskConfig, SystemConfig};
pub use dispatch::{AnalysisDispatcher, AnalysisPoll, AnalysisTicket};
pub use engine::AnalysisEngine;
pub use market_data::{Bar, IndicatorSnapshot, MarketSnapshot};
pub use report::{AnalysisOutcome, AnalysisReport, ErrorReport, Recommendation};
