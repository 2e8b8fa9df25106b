//! Best-effort repair of JSON broken by unescaped quotes inside strings.
//!
//! 1. Typographic double quotes become `\"`, single ones become `'`.
//! 2. While parsing fails, take the parser's error position, look back a few
//!    bytes for an unescaped `"` and escape it. Bounded by
//!    [`MAX_REPAIR_ITERATIONS`].
//!
//! This is a heuristic. Deeply nested damage can send the backward scan to
//! the wrong quote; in that case the result is `None`.

use serde_json::Value;
use tracing::debug;

pub const MAX_REPAIR_ITERATIONS: usize = 20;
/// How far back from the reported error position a stray quote is looked for.
const BACKWARD_WINDOW: usize = 4;

pub fn repair_json(text: &str) -> Option<Value> {
    let mut repaired = text
        .replace(['\u{201C}', '\u{201D}'], "\\\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    for iteration in 0..MAX_REPAIR_ITERATIONS {
        let err = match serde_json::from_str::<Value>(&repaired) {
            Ok(v) => return Some(v),
            Err(e) => e,
        };
        let pos = error_offset(&repaired, err.line(), err.column());
        if pos == 0 || pos >= repaired.len() {
            return None;
        }
        let Some(quote) = stray_quote_before(repaired.as_bytes(), pos) else {
            debug!(target: "generation", iteration, pos, "no quote near parse error");
            return None;
        };
        repaired.replace_range(quote..quote + 1, "\\\"");
    }

    serde_json::from_str(&repaired).ok()
}

/// Byte offset of the character `serde_json` reports (1-based line, column
/// counted in bytes with the offending byte included).
fn error_offset(text: &str, line: usize, column: usize) -> usize {
    let before: usize = text
        .split('\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    before + column.saturating_sub(1)
}

fn stray_quote_before(bytes: &[u8], pos: usize) -> Option<usize> {
    let lo = pos.saturating_sub(BACKWARD_WINDOW);
    (lo..=pos)
        .rev()
        .find(|&i| bytes.get(i) == Some(&b'"') && (i == 0 || bytes[i - 1] != b'\\'))
}
