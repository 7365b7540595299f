//! Prompt construction for clause extraction.

/// Clause count above which a refinement pass runs, and the cap on
/// very-high-risk clauses kept from it.
pub const REFINEMENT_THRESHOLD: usize = 50;

/// Per-invocation settings threaded through prompt construction and model calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassContext {
    /// Whose interests the analysis takes, e.g. "client", "vendor", "lawyer".
    pub role: String,
    pub jurisdiction: String,
    pub is_final_pass: bool,
    /// Clauses found by the first pass. Only meaningful when `is_final_pass`.
    pub total_clause_count: usize,
    /// Count above which a final pass asks for negotiation suggestions.
    pub refinement_threshold: usize,
}

impl PassContext {
    pub fn first_pass(role: impl Into<String>, jurisdiction: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            jurisdiction: jurisdiction.into(),
            is_final_pass: false,
            total_clause_count: 0,
            refinement_threshold: REFINEMENT_THRESHOLD,
        }
    }

    pub fn with_refinement_threshold(self, refinement_threshold: usize) -> Self {
        Self {
            refinement_threshold,
            ..self
        }
    }

    /// The refinement-pass context derived from a first-pass one.
    pub fn final_pass(&self, total_clause_count: usize) -> Self {
        Self {
            is_final_pass: true,
            total_clause_count,
            ..self.clone()
        }
    }

    /// Whether the prompt should ask for negotiation suggestions.
    pub fn wants_negotiation(&self) -> bool {
        self.is_final_pass && self.total_clause_count > self.refinement_threshold
    }
}

const NEGOTIATION_NIL: &str = "'NIL' for all risks";
const NEGOTIATION_SUGGEST: &str =
    "'NIL' for low/medium/high risk, concise negotiation suggestion for very high risk";

/// Build the extraction instruction for one chunk. The chunk text is
/// embedded verbatim after the trailing `Text: ` marker.
pub fn build_prompt(ctx: &PassContext, chunk_text: &str) -> String {
    let (negotiation_rule, example_negotiation) = if ctx.wants_negotiation() {
        (NEGOTIATION_SUGGEST, "Limit liability...")
    } else {
        (NEGOTIATION_NIL, "NIL")
    };

    format!(
        "As a {role} in {jurisdiction}, extract concise numbered clauses from the legal text. \
         Club short clauses under the same topic (e.g., liability, penalties, obligations) \
         into a single clause with combined text. \
         Assess their risk (low, medium, high, very high). Very high risk includes clauses with \
         severe financial, legal, or operational impact (e.g., unlimited liability, strict penalties). \
         Return a JSON list of objects with: 'clause_number' (string, use the first number if clubbing), \
         'clause_text' (string, concise and combined for same-topic clauses), \
         'clause_risk' (low, medium, high, very high), 'negotiation' ({negotiation_rule}). \
         Ensure valid JSON output. \
         Example: [{{\"clause_number\": \"1\", \"clause_text\": \"Combined liability clauses...\", \
         \"clause_risk\": \"very high\", \"negotiation\": \"{example_negotiation}\"}}]. \
         Text: {chunk_text}",
        role = ctx.role,
        jurisdiction = ctx.jurisdiction,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PassContext {
        PassContext::first_pass("vendor", "India")
    }

    #[test]
    fn embeds_role_jurisdiction_and_chunk() {
        let prompt = build_prompt(&ctx(), "12. The Supplier shall bear all losses.");
        assert!(prompt.starts_with("As a vendor in India,"));
        assert!(prompt.ends_with("Text: 12. The Supplier shall bear all losses."));
        assert!(prompt.contains("Ensure valid JSON output."));
        assert!(prompt.contains("use the first number if clubbing"));
    }

    #[test]
    fn first_pass_requests_nil_for_everything() {
        let prompt = build_prompt(&ctx(), "text");
        assert!(prompt.contains(NEGOTIATION_NIL));
        assert!(!prompt.contains("negotiation suggestion"));
    }

    #[test]
    fn final_pass_above_threshold_requests_suggestions() {
        let prompt = build_prompt(&ctx().final_pass(51), "text");
        assert!(prompt.contains(NEGOTIATION_SUGGEST));
        assert!(prompt.contains("\"negotiation\": \"Limit liability...\""));
    }

    #[test]
    fn final_pass_at_threshold_still_requests_nil() {
        let final_ctx = ctx().final_pass(REFINEMENT_THRESHOLD);
        assert!(!final_ctx.wants_negotiation());
        assert_eq!(
            build_prompt(&final_ctx, "text"),
            build_prompt(&ctx(), "text")
        );
    }

    #[test]
    fn lowered_threshold_applies_to_the_final_pass() {
        let final_ctx = ctx().with_refinement_threshold(5).final_pass(6);
        assert!(final_ctx.wants_negotiation());
        assert!(build_prompt(&final_ctx, "text").contains(NEGOTIATION_SUGGEST));
        assert!(!ctx().with_refinement_threshold(5).final_pass(5).wants_negotiation());
    }

    #[test]
    fn count_is_ignored_outside_final_pass() {
        let mut first = ctx();
        first.total_clause_count = 500;
        assert!(!first.wants_negotiation());
    }
}
