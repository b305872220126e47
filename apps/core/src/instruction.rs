//! Locates the structured instruction a backend reply may carry.
//!
//! Replies are untrusted prose. The scanner only considers balanced top-level
//! `{ ... }` spans (string- and escape-aware, bounded in depth and size), and
//! a reply yields an instruction only when exactly one span decodes to one.
//! Anything else, including unbalanced braces, means "no instruction".

use std::ops::Range;

use serde::Deserialize;
use serde_json::{Map, Value};

const MAX_DEPTH: usize = 16;
const MAX_SPAN_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command_type", rename_all = "lowercase")]
pub enum Instruction {
    Terminal {
        command: String,
        #[serde(default)]
        description: Option<String>,
    },
    System {
        action: String,
        #[serde(default)]
        parameters: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub instruction: Instruction,
    pub span: Range<usize>,
}

pub fn extract(reply: &str) -> Option<Extracted> {
    let spans = object_spans(reply)?;
    let mut found: Option<Extracted> = None;

    for span in spans {
        let Some(instruction) = decode(&reply[span.clone()]) else {
            continue;
        };
        if found.is_some() {
            log::debug!("reply carries more than one instruction; ignoring all");
            return None;
        }
        found = Some(Extracted { instruction, span });
    }

    found
}

/// The reply with the instruction span (and a code fence wrapped tightly
/// around it) removed.
pub fn strip(reply: &str, span: &Range<usize>) -> String {
    let before = reply[..span.start].trim_end();
    let after = reply[span.end..].trim_start();

    let before = strip_fence_open(before);
    let after = after.strip_prefix("```").unwrap_or(after);

    let before = before.trim_end();
    let after = after.trim_start();
    match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (false, true) => before.to_string(),
        (true, false) => after.to_string(),
        (false, false) => format!("{before}\n{after}"),
    }
}

fn strip_fence_open(text: &str) -> &str {
    for fence in ["```json", "```JSON", "```"] {
        if let Some(rest) = text.strip_suffix(fence) {
            return rest;
        }
    }
    text
}

fn decode(candidate: &str) -> Option<Instruction> {
    let value = serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| json5::from_str::<Value>(candidate).ok())?;
    if !value.get("command_type").is_some_and(Value::is_string) {
        return None;
    }

    let instruction = serde_json::from_value::<Instruction>(value).ok()?;
    match &instruction {
        Instruction::Terminal { command, .. } if command.trim().is_empty() => None,
        Instruction::System { action, .. } if action.trim().is_empty() => None,
        _ => Some(instruction),
    }
}

/// Byte ranges of every balanced top-level object. `None` when a span is
/// left open, nests too deep or grows past the size cap.
fn object_spans(text: &str) -> Option<Vec<Range<usize>>> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if depth > 0 && index - start > MAX_SPAN_BYTES {
            return None;
        }

        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' if depth > 0 => quote = Some(ch),
            '{' => {
                if depth == 0 {
                    start = index;
                }
                depth += 1;
                if depth > MAX_DEPTH {
                    return None;
                }
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(start..index + 1);
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        return None;
    }
    Some(spans)
}
