//! Splits document text into bounded-length chunks for per-chunk model calls.

/// Default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A contiguous slice of document text. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Pack whitespace-delimited words greedily into chunks of at most
/// `chunk_size` characters, joined by single spaces.
///
/// Words longer than `chunk_size` are split on character boundaries.
/// Whitespace-only text produces no chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<Chunk> {
    let limit = chunk_size.max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        for part in split_long_word(word, limit) {
            let part_len = part.chars().count();
            let needed = if current_len == 0 {
                part_len
            } else {
                current_len + 1 + part_len
            };

            if needed > limit && current_len > 0 {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(part);
            current_len += part_len;
        }
    }
    if current_len > 0 {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk { index: i + 1, text })
        .collect()
}

fn split_long_word(word: &str, limit: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = word;
    while rest.chars().count() > limit {
        let cut = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        parts.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    parts.push(rest);
    parts
}
