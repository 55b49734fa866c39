//! Non-blocking analysis dispatch
//!
//! The pipeline is synchronous. The dispatcher runs it on tokio's blocking
//! pool and hands back a ticket the caller can poll without blocking.

use crate::engine::AnalysisEngine;
use crate::market_data::MarketSnapshot;
use crate::report::{AnalysisOutcome, ErrorReport};
use anyhow::{Result, anyhow};
use chrono::Utc;
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Debug)]
pub enum AnalysisPoll {
    Pending,
    Ready(AnalysisOutcome),
    /// The result was already taken, or the worker went away without one
    Closed,
}

/// Handle to one in-flight analysis
#[derive(Debug)]
pub struct AnalysisTicket {
    symbol: String,
    rx: mpsc::Receiver<AnalysisOutcome>,
}

impl AnalysisTicket {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Never blocks
    pub fn try_poll(&mut self) -> AnalysisPoll {
        match self.rx.try_recv() {
            Ok(outcome) => AnalysisPoll::Ready(outcome),
            Err(TryRecvError::Empty) => AnalysisPoll::Pending,
            Err(TryRecvError::Disconnected) => AnalysisPoll::Closed,
        }
    }

    pub async fn wait(mut self) -> Result<AnalysisOutcome> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow!("Analysis for {} ended without a result", self.symbol))
    }
}

#[derive(Clone)]
pub struct AnalysisDispatcher {
    engine: Arc<AnalysisEngine>,
}

impl AnalysisDispatcher {
    pub fn new(engine: Arc<AnalysisEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Start analysing `snapshot` in the background. Must be called from
    /// within a tokio runtime.
    pub fn dispatch(&self, snapshot: MarketSnapshot) -> AnalysisTicket {
        let (tx, rx) = mpsc::channel(1);
        let symbol = snapshot.symbol.clone();
        let engine = Arc::clone(&self.engine);

        tokio::spawn({
            let symbol = symbol.clone();
            async move {
                let outcome =
                    match tokio::task::spawn_blocking(move || engine.analyze(&snapshot)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("Analysis worker for {} failed: {}", symbol, e);
                            let err = anyhow!("analysis worker failed: {}", e);
                            AnalysisOutcome::Failed(ErrorReport::new(symbol.clone(), &err, Utc::now()))
                        }
                    };

                if tx.send(outcome).await.is_err() {
                    debug!("Ticket for {} dropped before the result arrived", symbol);
                }
            }
        });

        AnalysisTicket { symbol, rx }
    }
}
