//! SQL script splitting.
//!
//! Splits a multi-statement script into individual statements. Delimiters
//! inside quoted strings, quoted identifiers and comments are ignored, and
//! client-side `DELIMITER` directives (as used around triggers and routines)
//! change the statement terminator.

use tracing::debug;

use super::traits::DatabaseSession;
use crate::error::{Error, Result};

const DEFAULT_DELIMITER: &str = ";";

/// Execute every statement of `script` in order, stopping at the first
/// failure. Returns the number of statements executed.
///
/// Statements that ran before a failure are not undone.
pub async fn run_script(session: &mut dyn DatabaseSession, script: &str) -> Result<usize> {
    let statements = split_statements(script);
    let total = statements.len();

    for (n, statement) in statements.iter().enumerate() {
        session.execute(statement).await.map_err(|e| match e {
            Error::Execution(message) => Error::Execution(format!(
                "statement {} of {} failed: {}",
                n + 1,
                total,
                message
            )),
            other => other,
        })?;
    }

    debug!("Executed script of {} statements", total);
    Ok(total)
}

/// Split `script` into statements, in order.
///
/// Statements are trimmed and no longer carry their delimiter. Chunks that
/// contain nothing but whitespace and comments are dropped.
pub fn split_statements(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut delimiter: Vec<char> = DEFAULT_DELIMITER.chars().collect();
    let mut current = String::new();
    let mut has_content = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if !has_content && !c.is_whitespace() {
            if let Some((new_delimiter, consumed)) = delimiter_directive(&chars[i..]) {
                delimiter = new_delimiter;
                current.clear();
                i += consumed;
                continue;
            }
        }

        if !delimiter.is_empty() && chars[i..].starts_with(&delimiter) {
            if has_content {
                statements.push(current.trim().to_string());
            }
            current.clear();
            has_content = false;
            i += delimiter.len();
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                let end = quoted_end(&chars, i);
                current.extend(&chars[i..end]);
                has_content = true;
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-')
                && chars.get(i + 2).is_none_or(|n| n.is_whitespace()) =>
            {
                let end = line_end(&chars, i);
                current.extend(&chars[i..end]);
                i = end;
            }
            '#' => {
                let end = line_end(&chars, i);
                current.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = block_comment_end(&chars, i);
                current.extend(&chars[i..end]);
                i = end;
            }
            _ => {
                current.push(c);
                if !c.is_whitespace() {
                    has_content = true;
                }
                i += 1;
            }
        }
    }

    if has_content {
        statements.push(current.trim().to_string());
    }
    statements
}

/// Parse `DELIMITER <token>` at the start of `rest`. Returns the new
/// delimiter and the number of chars consumed, through the end of the line.
fn delimiter_directive(rest: &[char]) -> Option<(Vec<char>, usize)> {
    const KEYWORD: &str = "DELIMITER";
    let keyword_len = KEYWORD.len();
    if rest.len() <= keyword_len {
        return None;
    }

    let word: String = rest[..keyword_len].iter().collect();
    if !word.eq_ignore_ascii_case(KEYWORD) || !matches!(rest[keyword_len], ' ' | '\t') {
        return None;
    }

    let end = line_end(rest, 0);
    let token: Vec<char> = rest[keyword_len..end]
        .iter()
        .copied()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| !c.is_whitespace())
        .collect();
    if token.is_empty() {
        return None;
    }
    Some((token, end))
}

/// Index just past the closing quote of the quoted section starting at `start`.
fn quoted_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if quote != '`' => i += 2,
            c if c == quote => {
                // doubled quote is an escaped quote
                if chars.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    chars.len()
}

fn line_end(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&c| c == '\n')
        .map(|p| start + p)
        .unwrap_or(chars.len())
}

fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}
