//! Read-only statement validation
//!
//! A lightweight SQL scanner that knows just enough about comments and quoting
//! to find the leading keyword and any statement separator.

use crate::StorageError;

const READ_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

/// Accept only a single statement that starts with `SELECT` or `WITH`.
///
/// `WITH` can prefix a write in SQLite, so callers must still run the
/// statement on a read-only connection.
pub fn validate_read_only(text: &str) -> Result<(), StorageError> {
    let bytes = text.as_bytes();

    let start = skip_trivia(bytes, 0);
    if start == bytes.len() {
        return Err(StorageError::InvalidQuery("empty query".to_string()));
    }

    let end = start
        + bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
    let keyword = &text[start..end];
    if !READ_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
        return Err(StorageError::InvalidQuery(format!(
            "only SELECT statements are allowed, got `{}`",
            first_token(&text[start..])
        )));
    }

    let mut i = end;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, quote)?,
            b'[' => i = skip_quoted(bytes, i, b']')?,
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b';' => {
                let mut j = i + 1;
                loop {
                    j = skip_trivia(bytes, j);
                    if bytes.get(j) == Some(&b';') {
                        j += 1;
                    } else {
                        break;
                    }
                }
                if j < bytes.len() {
                    return Err(StorageError::InvalidQuery(
                        "multiple statements are not allowed".to_string(),
                    ));
                }
                return Ok(());
            }
            _ => i += 1,
        }
    }

    Ok(())
}

fn first_token(text: &str) -> &str {
    text.split(|c: char| c.is_whitespace() || c == ';' || c == '(')
        .next()
        .unwrap_or(text)
}

/// Skip whitespace and comments, returning the next significant offset
fn skip_trivia(bytes: &[u8], mut i: usize) -> usize {
    loop {
        match bytes.get(i) {
            Some(b) if b.is_ascii_whitespace() => i += 1,
            Some(b'-') if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            Some(b'/') if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            _ => return i,
        }
    }
}

fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
    bytes[i..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| i + p + 1)
}

// SQLite closes an unterminated block comment at end of input
fn skip_block_comment(bytes: &[u8], i: usize) -> usize {
    bytes[i + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| i + 2 + p + 2)
}

/// Skip a quoted run opened at `i`. Doubled quotes (`'it''s'`) fall out
/// naturally as two adjacent runs.
fn skip_quoted(bytes: &[u8], i: usize, close: u8) -> Result<usize, StorageError> {
    bytes[i + 1..]
        .iter()
        .position(|&b| b == close)
        .map(|p| i + 1 + p + 1)
        .ok_or_else(|| StorageError::InvalidQuery("unterminated quoted text".to_string()))
}
