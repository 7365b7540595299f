//! Clause records produced from model output, and the error records that
//! stand in for chunks or documents that produced none.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Marker written in `negotiation` when no suggestion applies.
pub const NIL: &str = "NIL";

/// Risk classification assigned to a clause by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Severe financial, legal, or operational impact. Only these clauses
    /// receive negotiation suggestions during a refinement pass.
    VeryHigh,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown risk level: {0:?}")]
pub struct UnknownRiskLevel(pub String);

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts any casing, and `_` or `-` in place of the space
/// (`"Very High"`, `"very_high"`, `"very-high"`).
impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["low"] => Ok(Self::Low),
            ["medium"] => Ok(Self::Medium),
            ["high"] => Ok(Self::High),
            ["very", "high"] => Ok(Self::VeryHigh),
            _ => Err(UnknownRiskLevel(s.to_string())),
        }
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One (possibly merged) contractual provision with its assessed risk.
///
/// When the model clubs several short clauses on the same topic together,
/// `clause_number` is the first of their numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(deserialize_with = "string_or_number")]
    pub clause_number: String,
    pub clause_text: String,
    pub clause_risk: RiskLevel,
    #[serde(default = "nil", deserialize_with = "nil_if_null")]
    pub negotiation: String,
}

impl Clause {
    pub fn is_very_high(&self) -> bool {
        self.clause_risk == RiskLevel::VeryHigh
    }
}

fn nil() -> String {
    NIL.to_string()
}

/// `"negotiation": null` reads as `"NIL"`.
fn nil_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(nil))
}

/// Models sometimes emit `"clause_number": 3` instead of `"3"`.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// A chunk-level or document-level failure. Never counted as a clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error: String,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    pub fn no_clauses_in_chunk() -> Self {
        Self::new("No clauses found in chunk")
    }

    pub fn no_text_extracted() -> Self {
        Self::new("No text extracted from document")
    }

    pub fn processing(cause: impl fmt::Display) -> Self {
        Self::new(format!("Processing error: {cause}"))
    }
}

/// One line of the output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Clause(Clause),
    Error(ErrorRecord),
}

impl From<Clause> for Record {
    fn from(clause: Clause) -> Self {
        Self::Clause(clause)
    }
}

impl From<ErrorRecord> for Record {
    fn from(err: ErrorRecord) -> Self {
        Self::Error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_accepts_spelling_variants() {
        for raw in ["very high", "Very High", "very_high", "VERY-HIGH", " very  high "] {
            assert_eq!(raw.parse::<RiskLevel>(), Ok(RiskLevel::VeryHigh), "{raw}");
        }
        assert_eq!("Medium".parse::<RiskLevel>(), Ok(RiskLevel::Medium));
        assert!("critical".parse::<RiskLevel>().is_err());
        assert!("veryhigh".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn risk_level_serializes_with_space() {
        let json = serde_json::to_string(&RiskLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"very high\"");
    }

    #[test]
    fn clause_number_may_be_numeric() {
        let json = r#"{"clause_number": 12, "clause_text": "Indemnity", "clause_risk": "high", "negotiation": "NIL"}"#;
        let clause: Clause = serde_json::from_str(json).unwrap();
        assert_eq!(clause.clause_number, "12");
        assert_eq!(clause.clause_risk, RiskLevel::High);
    }

    #[test]
    fn missing_negotiation_defaults_to_nil() {
        let json = r#"{"clause_number": "4", "clause_text": "Term", "clause_risk": "low"}"#;
        let clause: Clause = serde_json::from_str(json).unwrap();
        assert_eq!(clause.negotiation, NIL);
    }

    #[test]
    fn null_negotiation_reads_as_nil() {
        let json = r#"{"clause_number": "5", "clause_text": "Fees", "clause_risk": "medium", "negotiation": null}"#;
        let clause: Clause = serde_json::from_str(json).unwrap();
        assert_eq!(clause.negotiation, NIL);
    }

    #[test]
    fn unknown_risk_rejects_clause() {
        let json = r#"{"clause_number": "4", "clause_text": "Term", "clause_risk": "severe", "negotiation": "NIL"}"#;
        assert!(serde_json::from_str::<Clause>(json).is_err());
    }

    #[test]
    fn record_is_untagged() {
        let err: Record = ErrorRecord::no_text_extracted().into();
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"error":"No text extracted from document"}"#
        );

        let parsed: Record = serde_json::from_str(
            r#"{"clause_number": "1", "clause_text": "x", "clause_risk": "low", "negotiation": "NIL"}"#,
        )
        .unwrap();
        assert!(matches!(parsed, Record::Clause(_)));
    }

    #[test]
    fn processing_error_message() {
        let err = ErrorRecord::processing("quota exceeded");
        assert_eq!(err.error, "Processing error: quota exceeded");
    }
}
