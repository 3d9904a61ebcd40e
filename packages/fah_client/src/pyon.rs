//! PyON payload normalization.
//!
//! The peer writes payloads as Python literals: JSON plus bare `True`,
//! `False` and `None`, and `\xHH` escapes inside strings. These are rewritten
//! to their JSON spellings so `serde_json` can parse the result.

use serde_json::Value;
use std::borrow::Cow;

/// Rewrite Python-only tokens to JSON. Borrows when nothing needs rewriting.
pub fn normalize(text: &str) -> Cow<'_, str> {
    if !needs_rewrite(text) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;

    while let Some((idx, c)) = chars.next() {
        if in_string {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'x')) => out.push_str("\\u00"),
                    Some((_, escaped)) => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    None => out.push('\\'),
                },
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                _ => out.push(c),
            }
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
        } else if c.is_ascii_alphabetic() {
            let mut end = idx + c.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = next_idx + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            out.push_str(match &text[idx..end] {
                "True" => "true",
                "False" => "false",
                "None" => "null",
                word => word,
            });
        } else {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

/// Normalize then parse a payload region.
pub fn parse(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(&normalize(text))
}

fn needs_rewrite(text: &str) -> bool {
    text.contains("True") || text.contains("False") || text.contains("None") || text.contains("\\x")
}
