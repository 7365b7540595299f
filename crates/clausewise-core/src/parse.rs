//! Tolerant parsing of model output into clauses.
//!
//! Models wrap JSON in markdown fences and scatter blank lines through it.
//! Both are cleaned before a strict decode; output that still fails to
//! decode is replaced by a single fallback clause so every chunk contributes
//! something downstream.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::clause::{Clause, ErrorRecord, NIL, RiskLevel};

/// Characters of chunk text kept in a fallback clause.
pub const FALLBACK_TEXT_LIMIT: usize = 1000;

/// `clause_number` of a fallback clause.
pub const UNKNOWN_CLAUSE_NUMBER: &str = "unknown";

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?[ \t]*\r?\n?").expect("valid fence regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid blank-line regex"));

/// Result of parsing one chunk's model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedChunk {
    /// Output decoded to a non-empty list; clauses are returned unchanged.
    Clauses(Vec<Clause>),
    /// Output decoded to an empty list.
    Empty(ErrorRecord),
    /// Output did not decode; the chunk itself stands in as one clause.
    Fallback(Clause),
}

impl ParsedChunk {
    pub fn clauses(&self) -> &[Clause] {
        match self {
            Self::Clauses(clauses) => clauses.as_slice(),
            Self::Empty(_) => &[],
            Self::Fallback(clause) => std::slice::from_ref(clause),
        }
    }

    pub fn into_parts(self) -> (Vec<Clause>, Option<ErrorRecord>) {
        match self {
            Self::Clauses(clauses) => (clauses, None),
            Self::Empty(err) => (Vec::new(), Some(err)),
            Self::Fallback(clause) => (vec![clause], None),
        }
    }
}

/// Strip markdown code fences and collapse blank-line runs.
pub fn clean_response(raw: &str) -> String {
    let unfenced = FENCE.replace_all(raw, "");
    BLANK_LINES.replace_all(&unfenced, "\n").trim().to_string()
}

/// Parse raw model output for the chunk it was generated from.
pub fn parse_response(raw: &str, chunk_text: &str) -> ParsedChunk {
    let cleaned = clean_response(raw);
    match serde_json::from_str::<Vec<Clause>>(&cleaned) {
        Ok(clauses) if clauses.is_empty() => ParsedChunk::Empty(ErrorRecord::no_clauses_in_chunk()),
        Ok(clauses) => ParsedChunk::Clauses(clauses),
        Err(e) => {
            debug!(error = %e, response_len = raw.len(), "model output did not decode, using fallback clause");
            ParsedChunk::Fallback(fallback_clause(chunk_text))
        }
    }
}

/// The clause substituted for undecodable output.
pub fn fallback_clause(chunk_text: &str) -> Clause {
    Clause {
        clause_number: UNKNOWN_CLAUSE_NUMBER.to_string(),
        clause_text: chunk_text.chars().take(FALLBACK_TEXT_LIMIT).collect(),
        clause_risk: RiskLevel::Medium,
        negotiation: NIL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: &str = "7. Liability. The Vendor's liability shall be unlimited.";

    #[test]
    fn valid_output_is_returned_unchanged() {
        let raw = r#"[{"clause_number":"1","clause_text":"Liability...","clause_risk":"low","negotiation":"NIL"},
                     {"clause_number":"2","clause_text":"Penalty of 200%","clause_risk":"very high","negotiation":"Cap penalties"}]"#;
        let parsed = parse_response(raw, CHUNK);
        let clauses = parsed.clauses();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].clause_text, "Liability...");
        assert_eq!(clauses[1].clause_risk, RiskLevel::VeryHigh);
        assert_eq!(clauses[1].negotiation, "Cap penalties");
    }

    #[test]
    fn null_negotiation_keeps_the_whole_list() {
        let raw = r#"[{"clause_number":"1","clause_text":"Term","clause_risk":"low","negotiation":null},
                     {"clause_number":"2","clause_text":"Penalty","clause_risk":"very high","negotiation":"Cap penalties"}]"#;
        let parsed = parse_response(raw, CHUNK);
        let ParsedChunk::Clauses(clauses) = parsed else {
            panic!("expected decoded clauses");
        };
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].negotiation, "NIL");
        assert_eq!(clauses[1].negotiation, "Cap penalties");
    }

    #[test]
    fn fenced_output_with_blank_lines_decodes() {
        let raw = "```json\n[\n\n  {\"clause_number\": \"3\",\n\n\n \"clause_text\": \"Term\", \"clause_risk\": \"medium\", \"negotiation\": \"NIL\"}\n]\n```\n";
        let parsed = parse_response(raw, CHUNK);
        assert!(matches!(parsed, ParsedChunk::Clauses(ref c) if c.len() == 1 && c[0].clause_number == "3"));
    }

    #[test]
    fn bare_fence_without_language_tag() {
        assert_eq!(clean_response("```\n[]\n```"), "[]");
    }

    #[test]
    fn empty_list_yields_error_record() {
        let parsed = parse_response("```json\n[]\n```", CHUNK);
        assert_eq!(
            parsed,
            ParsedChunk::Empty(ErrorRecord::new("No clauses found in chunk"))
        );
        assert!(parsed.clauses().is_empty());
        let (clauses, err) = parsed.into_parts();
        assert!(clauses.is_empty());
        assert!(err.is_some());
    }

    #[test]
    fn undecodable_output_falls_back_to_chunk() {
        let parsed = parse_response("Here are the clauses: 1. Liability", CHUNK);
        let ParsedChunk::Fallback(clause) = parsed else {
            panic!("expected fallback clause");
        };
        assert_eq!(clause.clause_number, "unknown");
        assert_eq!(clause.clause_text, CHUNK);
        assert_eq!(clause.clause_risk, RiskLevel::Medium);
        assert_eq!(clause.negotiation, "NIL");
    }

    #[test]
    fn fallback_truncates_to_first_thousand_chars() {
        let chunk = "§".repeat(1500);
        let clause = fallback_clause(&chunk);
        assert_eq!(clause.clause_text.chars().count(), FALLBACK_TEXT_LIMIT);
        assert!(chunk.starts_with(&clause.clause_text));
    }

    #[test]
    fn single_object_is_not_a_list() {
        let raw = r#"{"clause_number":"1","clause_text":"x","clause_risk":"low","negotiation":"NIL"}"#;
        assert!(matches!(parse_response(raw, CHUNK), ParsedChunk::Fallback(_)));
    }

    #[test]
    fn unknown_risk_level_falls_back() {
        let raw = r#"[{"clause_number":"1","clause_text":"x","clause_risk":"catastrophic","negotiation":"NIL"}]"#;
        assert!(matches!(parse_response(raw, CHUNK), ParsedChunk::Fallback(_)));
    }

    #[test]
    fn empty_response_falls_back() {
        assert!(matches!(parse_response("", CHUNK), ParsedChunk::Fallback(_)));
    }
}
