//! # Byte-Bounded Text Chunking
//!
//! Splits paragraph text into chunks that each fit a synthesis payload
//! limit, measured in UTF-8 bytes. Lines are accumulated greedily and
//! rejoined with `\n`; a single line wider than the limit is split on
//! character boundaries so no chunk ever lands mid-codepoint.

/// Splits `lines` into chunks whose UTF-8 size never exceeds
/// `max_bytes`.
///
/// Lines are packed greedily in order: a line joins the current chunk when
/// the chunk plus one joining newline plus the line still fits, otherwise
/// the chunk is sealed and a new one starts. Empty input yields no chunks.
/// Concatenating the chunks with `\n` restored between sealed boundaries
/// reproduces the input text exactly.
pub fn chunk_lines(lines: &[&str], max_bytes: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in lines {
        if line.len() > max_bytes {
            // Oversized line: seal whatever is pending, then split the line
            // itself on char boundaries.
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(split_oversized(line, max_bytes));
            continue;
        }

        if current.is_empty() {
            current.push_str(line);
        } else if current.len() + 1 + line.len() <= max_bytes {
            current.push('\n');
            current.push_str(line);
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Splits one oversized line into chunks of at most `max_bytes` UTF-8
/// bytes, never cutting inside a codepoint.
///
/// A single character wider than `max_bytes` is emitted alone rather than
/// dropped; that chunk exceeds the limit, which downstream accepts over
/// losing text.
fn split_oversized(line: &str, max_bytes: usize) -> Vec<String> {
    let mut pieces: Vec<String> = Vec::new();
    let mut piece = String::new();

    for ch in line.chars() {
        if !piece.is_empty() && piece.len() + ch.len_utf8() > max_bytes {
            pieces.push(std::mem::take(&mut piece));
        }
        piece.push(ch);
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
