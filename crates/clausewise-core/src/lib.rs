//! Core types and pure transformations for clause extraction: the clause
//! data model, document chunking, prompt construction, and model-output parsing.

pub mod chunk;
pub mod clause;
pub mod parse;
pub mod prompt;

pub use chunk::{Chunk, DEFAULT_CHUNK_SIZE, chunk_text};
pub use clause::{Clause, ErrorRecord, NIL, Record, RiskLevel, UnknownRiskLevel};
pub use parse::{ParsedChunk, clean_response, fallback_clause, parse_response};
pub use prompt::{PassContext, REFINEMENT_THRESHOLD, build_prompt};
