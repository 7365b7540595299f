//! Two-pass clause analysis: collect clauses from every chunk, then, when
//! the document is large, re-run with negotiation prompts and keep the
//! highest-risk clauses.

use std::collections::HashSet;

use clausewise_ai::{GenerativeModel, InvokeError, ModelInvoker};
use clausewise_core::{
    Chunk, Clause, DEFAULT_CHUNK_SIZE, ErrorRecord, ParsedChunk, PassContext,
    REFINEMENT_THRESHOLD, Record, build_prompt, chunk_text, parse_response,
};
use tracing::{debug, info, warn};

/// Run-level settings for [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub role: String,
    pub jurisdiction: String,
    pub chunk_size: usize,
    /// First-pass clause count above which the refinement pass runs.
    pub refinement_threshold: usize,
    /// Maximum very-high-risk clauses kept from the refinement pass.
    pub selection_cap: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            role: "client".to_string(),
            jurisdiction: "India".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            refinement_threshold: REFINEMENT_THRESHOLD,
            selection_cap: REFINEMENT_THRESHOLD,
        }
    }
}

/// What a run decided.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Final clause sequence, error records excluded.
    pub clauses: Vec<Clause>,
    /// Error records from every pass, in the order they occurred.
    pub errors: Vec<ErrorRecord>,
    /// Whether the refinement pass ran.
    pub refined: bool,
    pub first_pass_clauses: usize,
}

impl AnalysisOutcome {
    fn empty_document() -> Self {
        Self {
            errors: vec![ErrorRecord::no_text_extracted()],
            ..Self::default()
        }
    }

    /// Lines for the output artifact: the final clauses, or the error
    /// records when no clause survived.
    pub fn persisted_records(&self) -> Vec<Record> {
        if self.clauses.is_empty() {
            self.errors.iter().cloned().map(Record::from).collect()
        } else {
            self.clauses.iter().cloned().map(Record::from).collect()
        }
    }
}

/// In-memory stand-in for the artifact while a pass is running.
#[derive(Debug, Default)]
struct PassBuffer {
    clauses: Vec<Clause>,
    errors: Vec<ErrorRecord>,
}

impl PassBuffer {
    fn append(&mut self, parsed: ParsedChunk) {
        let (clauses, error) = parsed.into_parts();
        self.clauses.extend(clauses);
        self.errors.extend(error);
    }

    fn record_error(&mut self, error: ErrorRecord) {
        self.errors.push(error);
    }
}

/// Drives chunks through prompt construction, model invocation, and parsing.
pub struct Analyzer<M> {
    invoker: ModelInvoker<M>,
    settings: AnalysisSettings,
}

impl<M: GenerativeModel> Analyzer<M> {
    pub fn new(invoker: ModelInvoker<M>, settings: AnalysisSettings) -> Self {
        Self { invoker, settings }
    }

    /// Chunk `text` and analyze it. Whitespace-only text short-circuits
    /// with a single "no text extracted" error.
    pub async fn analyze_text(&self, text: &str) -> AnalysisOutcome {
        let chunks = chunk_text(text, self.settings.chunk_size);
        self.analyze_chunks(&chunks).await
    }

    pub async fn analyze_chunks(&self, chunks: &[Chunk]) -> AnalysisOutcome {
        if chunks.is_empty() {
            warn!("no text extracted from document");
            return AnalysisOutcome::empty_document();
        }

        let first_ctx =
            PassContext::first_pass(self.settings.role.clone(), self.settings.jurisdiction.clone())
                .with_refinement_threshold(self.settings.refinement_threshold);
        let mut first = PassBuffer::default();
        self.run_pass(chunks, &first_ctx, &mut first).await;

        let total = first.clauses.len();
        info!(
            chunks = chunks.len(),
            clauses = total,
            errors = first.errors.len(),
            "first pass complete"
        );

        if total <= self.settings.refinement_threshold {
            return AnalysisOutcome {
                clauses: first.clauses,
                errors: first.errors,
                refined: false,
                first_pass_clauses: total,
            };
        }

        // Fresh buffer: nothing from the first pass carries into refinement output.
        let mut refined = PassBuffer::default();
        self.run_pass(chunks, &first_ctx.final_pass(total), &mut refined)
            .await;

        let candidates: Vec<Clause> = refined
            .clauses
            .iter()
            .filter(|c| c.is_very_high())
            .cloned()
            .collect();
        let candidate_count = candidates.len();
        let selected = select_very_high(candidates, self.settings.selection_cap);
        info!(
            candidates = candidate_count,
            selected = selected.len(),
            errors = refined.errors.len(),
            "refinement pass complete"
        );

        let mut errors = first.errors;
        errors.extend(refined.errors);
        AnalysisOutcome {
            clauses: merge_refined(first.clauses, selected),
            errors,
            refined: true,
            first_pass_clauses: total,
        }
    }

    async fn run_pass(&self, chunks: &[Chunk], ctx: &PassContext, buffer: &mut PassBuffer) {
        for chunk in chunks {
            match self.process_chunk(chunk, ctx).await {
                Ok(parsed) => {
                    debug!(
                        chunk = chunk.index,
                        final_pass = ctx.is_final_pass,
                        clauses = parsed.clauses().len(),
                        "chunk parsed"
                    );
                    buffer.append(parsed);
                }
                Err(e) => {
                    warn!(
                        chunk = chunk.index,
                        final_pass = ctx.is_final_pass,
                        attempts = e.attempts(),
                        error = %e,
                        "chunk failed"
                    );
                    buffer.record_error(ErrorRecord::processing(&e));
                }
            }
        }
    }

    async fn process_chunk(&self, chunk: &Chunk, ctx: &PassContext) -> Result<ParsedChunk, InvokeError> {
        let prompt = build_prompt(ctx, &chunk.text);
        let raw = self.invoker.invoke(&prompt).await?;
        Ok(parse_response(&raw, &chunk.text))
    }
}

/// Stable sort by `clause_number` as a plain string, keeping the first `cap`.
///
/// "10" sorts before "2"; non-numeric numbers are not normalised.
pub fn select_very_high(mut candidates: Vec<Clause>, cap: usize) -> Vec<Clause> {
    candidates.sort_by(|a, b| a.clause_number.cmp(&b.clause_number));
    candidates.truncate(cap);
    candidates
}

/// First-pass clauses that are not very-high risk, in order, followed by
/// the selected refinement clauses.
///
/// A selected clause replaces any first-pass clause with the same
/// `clause_number`, whatever its first-pass risk. Remaining first-pass
/// very-high clauses fall outside the cap and are dropped.
pub fn merge_refined(first_pass: Vec<Clause>, selected: Vec<Clause>) -> Vec<Clause> {
    let mut merged: Vec<Clause> = {
        let selected_numbers: HashSet<&str> =
            selected.iter().map(|c| c.clause_number.as_str()).collect();
        first_pass
            .into_iter()
            .filter(|clause| {
                if selected_numbers.contains(clause.clause_number.as_str()) {
                    debug!(
                        clause_number = %clause.clause_number,
                        first_pass_risk = %clause.clause_risk,
                        "first-pass clause replaced by refined clause"
                    );
                    return false;
                }
                if clause.is_very_high() {
                    debug!(clause_number = %clause.clause_number, "first-pass clause not selected");
                    return false;
                }
                true
            })
            .collect()
    };
    merged.extend(selected);
    merged
}
