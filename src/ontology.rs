//! Per-run knowledge graph
//!
//! Append-only store of typed statements produced by the classifiers and the
//! inference layer. Contradictions and confirmations are computed on demand
//! from the stored signal statements; neither depends on insertion order.

use crate::signals::core::{Indicator, Polarity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum confidence for a statement to take part in a contradiction or
/// confirmation
pub const EVIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Raw numeric reading of an indicator
    IndicatorValue(Indicator),
    /// Qualitative classification of an indicator
    Signal(Indicator),
    MarketState,
    TrendDirection,
    RiskLevel,
    MlPrediction,
    RiskAssessment,
    Pattern,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IndicatorValue(i) => write!(f, "has_{}_value", i),
            Predicate::Signal(i) => write!(f, "has_{}_signal", i),
            Predicate::MarketState => f.write_str("has_market_state"),
            Predicate::TrendDirection => f.write_str("has_trend_direction"),
            Predicate::RiskLevel => f.write_str("has_risk_level"),
            Predicate::MlPrediction => f.write_str("has_ml_prediction"),
            Predicate::RiskAssessment => f.write_str("has_risk_assessment"),
            Predicate::Pattern => f.write_str("has_pattern"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementObject {
    Number(f64),
    Label(String),
}

impl StatementObject {
    pub fn as_label(&self) -> Option<&str> {
        match self {
            StatementObject::Label(l) => Some(l),
            StatementObject::Number(_) => None,
        }
    }
}

impl From<f64> for StatementObject {
    fn from(value: f64) -> Self {
        StatementObject::Number(value)
    }
}

impl From<&str> for StatementObject {
    fn from(value: &str) -> Self {
        StatementObject::Label(value.to_string())
    }
}

impl From<String> for StatementObject {
    fn from(value: String) -> Self {
        StatementObject::Label(value)
    }
}

/// Immutable fact recorded during one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub subject: String,
    pub predicate: Predicate,
    pub object: StatementObject,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl Statement {
    pub fn new(
        subject: impl Into<String>,
        predicate: Predicate,
        object: impl Into<StatementObject>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            confidence: crate::signals::core::clamp_confidence(confidence),
            timestamp,
        }
    }

    fn is_signal(&self) -> bool {
        matches!(self.predicate, Predicate::Signal(_))
    }

    /// Polarity of a labelled signal statement
    pub fn polarity(&self) -> Polarity {
        self.object
            .as_label()
            .map(Polarity::of_label)
            .unwrap_or(Polarity::Neutral)
    }

    fn is_strong_directional(&self) -> bool {
        self.is_signal()
            && self.confidence >= EVIDENCE_THRESHOLD
            && self.polarity() != Polarity::Neutral
    }
}

/// Two signal statements on the same subject pointing in opposite directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub subject: String,
    pub first: Statement,
    pub second: Statement,
}

/// Signal statements on the same subject agreeing on direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub subject: String,
    pub polarity: Polarity,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSummary {
    pub indicators: usize,
    pub signals: usize,
    pub inferences: usize,
    pub ml_predictions: usize,
    pub risk_assessments: usize,
    pub patterns: usize,
    pub contradictions: usize,
    pub confirmations: usize,
    pub total_statements: usize,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    statements: Vec<Statement>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn assert_fact(
        &mut self,
        subject: &str,
        predicate: Predicate,
        object: impl Into<StatementObject>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) {
        self.add(Statement::new(subject, predicate, object, confidence, timestamp));
    }

    /// Statements in insertion order
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn by_predicate(&self, predicate: Predicate) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(move |s| s.predicate == predicate)
    }

    /// Every unordered pair of confident signal statements on one subject whose
    /// directions oppose each other
    pub fn detect_contradictions(&self) -> Vec<Contradiction> {
        let strong: Vec<&Statement> = self
            .statements
            .iter()
            .filter(|s| s.is_strong_directional())
            .collect();

        let mut contradictions = Vec::new();
        for (i, first) in strong.iter().enumerate() {
            for second in &strong[i + 1..] {
                if first.subject == second.subject && first.polarity().opposes(&second.polarity()) {
                    contradictions.push(Contradiction {
                        subject: first.subject.clone(),
                        first: (*first).clone(),
                        second: (*second).clone(),
                    });
                }
            }
        }
        contradictions
    }

    /// Groups of two or more confident signal statements sharing subject and
    /// direction
    pub fn find_confirmations(&self) -> Vec<Confirmation> {
        let mut groups: Vec<Confirmation> = Vec::new();

        for statement in self.statements.iter().filter(|s| s.is_strong_directional()) {
            let polarity = statement.polarity();
            match groups
                .iter_mut()
                .find(|g| g.subject == statement.subject && g.polarity == polarity)
            {
                Some(group) => group.statements.push(statement.clone()),
                None => groups.push(Confirmation {
                    subject: statement.subject.clone(),
                    polarity,
                    statements: vec![statement.clone()],
                }),
            }
        }

        groups.retain(|g| g.statements.len() >= 2);
        groups
    }

    pub fn get_knowledge_summary(&self) -> KnowledgeSummary {
        let mut summary = KnowledgeSummary {
            total_statements: self.statements.len(),
            contradictions: self.detect_contradictions().len(),
            confirmations: self.find_confirmations().len(),
            ..Default::default()
        };

        for statement in &self.statements {
            match statement.predicate {
                Predicate::IndicatorValue(_) => summary.indicators += 1,
                Predicate::Signal(_) => summary.signals += 1,
                Predicate::MarketState | Predicate::TrendDirection | Predicate::RiskLevel => {
                    summary.inferences += 1
                }
                Predicate::MlPrediction => summary.ml_predictions += 1,
                Predicate::RiskAssessment => summary.risk_assessments += 1,
                Predicate::Pattern => summary.patterns += 1,
            }
        }

        summary
    }

    /// Snapshot of every statement for the report
    pub fn serialize(&self) -> Vec<Statement> {
        self.statements.clone()
    }
}
