//! Block framing for the PyON stream.
//!
//! A block looks like:
//!
//! ```text
//! PyON 1 units\n
//! [ ...payload... ]\n
//! ---\n
//! ```
//!
//! The version number is optional (`PyONHeartbeat\n` is accepted). Anything
//! after the last complete block is returned as the remainder, which the caller
//! must prepend to the next chunk it reads.

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::kind::MessageKind;
use crate::message::RawMessage;
use crate::pyon;

pub const HEADER_TOKEN: &str = "PyON";
pub const TERMINATOR: &str = "\n---\n";

/// Stateless framer. All state lives in the caller's buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageExtractor;

impl MessageExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Lazily walk `input`, yielding one item per complete block.
    ///
    /// Calling this twice on the same input yields the same blocks and the
    /// same remainder.
    pub fn extract<'a>(&self, input: &'a str) -> Extraction<'a> {
        Extraction {
            input,
            consumed: 0,
        }
    }

    /// Eagerly drain `input`, returning the results and the unconsumed tail.
    pub fn extract_all<'a>(
        &self,
        input: &'a str,
    ) -> (Vec<Result<RawMessage, ExtractError>>, &'a str) {
        let mut extraction = self.extract(input);
        let results = extraction.by_ref().collect();
        (results, extraction.remainder())
    }
}

/// Iterator over the complete blocks of one buffer.
#[derive(Debug, Clone)]
pub struct Extraction<'a> {
    input: &'a str,
    consumed: usize,
}

impl<'a> Extraction<'a> {
    /// Text after the last block yielded so far.
    ///
    /// Once the iterator returns `None` this is the partial tail to retain.
    pub fn remainder(&self) -> &'a str {
        &self.input[self.consumed..]
    }

    /// Byte offset into the input where the remainder starts.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn next_block(&self) -> Option<Block<'a>> {
        let rest = &self.input[self.consumed..];
        let start = rest.find(HEADER_TOKEN)?;
        let header_end = start + rest[start..].find('\n')?;
        let term = header_end + rest[header_end..].find(TERMINATOR)?;

        let header = &rest[start + HEADER_TOKEN.len()..header_end];
        let payload = if term > header_end {
            &rest[header_end + 1..term]
        } else {
            ""
        };

        Some(Block {
            skipped: &rest[..start],
            kind_name: kind_name(header),
            payload,
            end: self.consumed + term + TERMINATOR.len(),
        })
    }
}

impl Iterator for Extraction<'_> {
    type Item = Result<RawMessage, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.next_block()?;
        self.consumed = block.end;

        if !block.skipped.trim().is_empty() {
            debug!(skipped = block.skipped.len(), "Skipping text before block header");
        }

        Some(block.decode())
    }
}

struct Block<'a> {
    skipped: &'a str,
    kind_name: &'a str,
    payload: &'a str,
    end: usize,
}

impl Block<'_> {
    fn decode(&self) -> Result<RawMessage, ExtractError> {
        let kind: MessageKind = self.kind_name.parse().map_err(|_| {
            warn!(name = self.kind_name, "Unknown message kind in block header");
            ExtractError::UnknownKind {
                name: self.kind_name.to_string(),
            }
        })?;

        let payload = pyon::parse(self.payload).map_err(|e| {
            warn!(%kind, error = %e, "Failed to decode block payload");
            ExtractError::Decode {
                kind,
                message: e.to_string(),
                payload: self.payload.to_string(),
            }
        })?;

        debug!(%kind, bytes = self.payload.len(), "Extracted block");
        Ok(RawMessage::received(kind, payload, Utc::now()))
    }
}

/// Length of the prefix of `buffered` that can never become part of a block:
/// everything before the first header token, or, with no header in sight,
/// everything but a trailing partial token.
pub fn dead_prefix_len(buffered: &str) -> usize {
    if let Some(start) = buffered.find(HEADER_TOKEN) {
        return start;
    }
    let partial = (1..HEADER_TOKEN.len())
        .rev()
        .find(|&k| buffered.ends_with(&HEADER_TOKEN[..k]))
        .unwrap_or(0);
    buffered.len() - partial
}

/// `" 1 units"` -> `"units"`, `"Heartbeat"` -> `"Heartbeat"`.
fn kind_name(header: &str) -> &str {
    let mut tokens = header.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(version), Some(name)) if version.bytes().all(|b| b.is_ascii_digit()) => name,
        (Some(name), _) => name,
        (None, _) => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(results: &[Result<RawMessage, ExtractError>]) -> Vec<MessageKind> {
        results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|m| m.key()))
            .collect()
    }

    #[test]
    fn complete_block_then_partial_tail() {
        let input = "PyONHeartbeat\n{\"value\": 42}\n---\nPyONInfo\n{\"version\"";
        let (results, tail) = MessageExtractor::new().extract_all(input);

        assert_eq!(results.len(), 1);
        let msg = results[0].as_ref().unwrap();
        assert_eq!(msg.key(), MessageKind::Heartbeat);
        assert_eq!(msg.payload(), &json!({"value": 42}));
        assert_eq!(tail, "PyONInfo\n{\"version\"");
    }

    #[test]
    fn versioned_header_and_banner() {
        let input = "Welcome to the Folding@home Client command server.\n> \
                     PyON 1 heartbeat\n7\n---\n> PyON 1 units\n[]\n---\n";
        let (results, tail) = MessageExtractor::new().extract_all(input);

        assert_eq!(kinds(&results), vec![MessageKind::Heartbeat, MessageKind::Units]);
        assert_eq!(results[0].as_ref().unwrap().payload(), &json!(7));
        assert_eq!(tail, "");
    }

    #[test]
    fn bad_payload_does_not_stop_extraction() {
        let input = "PyON 1 options\n{not json\n---\nPyON 1 heartbeat\n1\n---\n";
        let (results, _) = MessageExtractor::new().extract_all(input);

        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results[0],
            Err(ExtractError::Decode {
                kind: MessageKind::Options,
                ..
            })
        ));
        assert_eq!(kinds(&results), vec![MessageKind::Heartbeat]);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let input = "PyON 1 queue-stats\n{}\n---\n";
        let (results, tail) = MessageExtractor::new().extract_all(input);

        assert_eq!(
            results,
            vec![Err(ExtractError::UnknownKind {
                name: "queue-stats".into()
            })]
        );
        assert_eq!(tail, "");
    }

    #[test]
    fn empty_payload_is_a_decode_failure() {
        let (results, tail) = MessageExtractor::new().extract_all("PyON 1 slots\n---\n");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
        assert_eq!(tail, "");
    }

    #[test]
    fn remainder_tracks_iteration() {
        let input = "PyON 1 heartbeat\n1\n---\nPyON 1 heartbeat\n2\n---\nPyON";
        let mut extraction = MessageExtractor::new().extract(input);
        assert_eq!(extraction.remainder(), input);

        extraction.next().unwrap().unwrap();
        assert_eq!(extraction.remainder(), "PyON 1 heartbeat\n2\n---\nPyON");

        extraction.next().unwrap().unwrap();
        assert!(extraction.next().is_none());
        assert_eq!(extraction.remainder(), "PyON");
    }

    #[test]
    fn dead_prefix() {
        assert_eq!(dead_prefix_len(""), 0);
        assert_eq!(dead_prefix_len("> \n> "), 5);
        assert_eq!(dead_prefix_len("> Py"), 2);
        assert_eq!(dead_prefix_len("> PyON 1 un"), 2);
        assert_eq!(dead_prefix_len("PyON"), 0);
        assert_eq!(dead_prefix_len("caf\u{e9} P"), "caf\u{e9} ".len());
    }

    #[test]
    fn header_parsing() {
        assert_eq!(kind_name(" 1 slot-options"), "slot-options");
        assert_eq!(kind_name("Heartbeat"), "Heartbeat");
        assert_eq!(kind_name(" units"), "units");
        assert_eq!(kind_name(""), "");
    }
}
