mod common;

use chrono::Duration;
use common::{bullish_snapshot, start};
use ontotrade::config::SystemConfig;
use ontotrade::engine::AnalysisEngine;
use ontotrade::report::AnalysisOutcome;
use std::sync::Arc;

#[cfg(test)]
mod cache_tests {
    use super::*;

    fn completed(outcome: &AnalysisOutcome) -> &Arc<ontotrade::report::AnalysisReport> {
        match outcome {
            AnalysisOutcome::Completed(report) => report,
            AnalysisOutcome::Failed(e) => panic!("analysis failed: {}", e.error),
        }
    }

    #[test]
    fn test_hit_within_ttl_returns_same_report() {
        let engine = AnalysisEngine::new(SystemConfig::default());
        let first = engine.analyze_at(&bullish_snapshot("AAPL"), start());
        let second = engine.analyze_at(&bullish_snapshot("AAPL"), start() + Duration::minutes(14));

        assert!(Arc::ptr_eq(completed(&first), completed(&second)));
        assert_eq!(completed(&second).timestamp, start());
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn test_expired_entry_is_replaced_on_read() {
        let engine = AnalysisEngine::new(SystemConfig::default());
        let first = engine.analyze_at(&bullish_snapshot("AAPL"), start());
        let later = start() + Duration::minutes(15);

        // Lazy expiry: the stale entry is still held until someone reads it
        assert_eq!(engine.cache().len(), 1);
        assert!(engine.cache().get("AAPL", later).is_none());
        assert!(engine.cache().is_empty());

        let second = engine.analyze_at(&bullish_snapshot("AAPL"), later);
        assert!(!Arc::ptr_eq(completed(&first), completed(&second)));
        assert_eq!(completed(&second).timestamp, later);
    }

    #[test]
    fn test_symbols_are_cached_independently() {
        let engine = AnalysisEngine::new(SystemConfig::default());
        engine.analyze_at(&bullish_snapshot("AAPL"), start());
        engine.analyze_at(&bullish_snapshot("MSFT"), start());

        assert_eq!(engine.cache().len(), 2);
        assert!(engine.cache().get("AAPL", start()).is_some());
        assert!(engine.cache().get("GOOG", start()).is_none());
    }

    #[test]
    fn test_configured_ttl_is_used() {
        let config = SystemConfig {
            cache_ttl_minutes: 1,
            ..Default::default()
        };
        let engine = AnalysisEngine::new(config);
        engine.analyze_at(&bullish_snapshot("AAPL"), start());

        assert_eq!(engine.cache().ttl(), Duration::minutes(1));
        assert!(engine.cache().get("AAPL", start() + Duration::seconds(59)).is_some());
        assert!(engine.cache().get("AAPL", start() + Duration::seconds(60)).is_none());
    }
}
