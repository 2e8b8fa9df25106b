//! Pull a JSON payload out of free-form generated text.
//!
//! Order of attempts:
//! 1. strip a fenced code block (```` ```json ... ``` ````) if present;
//! 2. parse what is left as-is;
//! 3. parse the outermost bracketed (or braced) region;
//! 4. hand that region (or the whole text) to [`repair_json`].
//!
//! A parse that yields the wrong top-level shape counts as a failure.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

use super::repair::repair_json;
use super::PayloadShape;

fn fence_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)\n?```").unwrap())
}

fn region_re(shape: PayloadShape) -> &'static Regex {
    static ARRAY: OnceCell<Regex> = OnceCell::new();
    static OBJECT: OnceCell<Regex> = OnceCell::new();
    match shape {
        PayloadShape::Array => ARRAY.get_or_init(|| Regex::new(r"(?s)\[.*\]").unwrap()),
        PayloadShape::Object => OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap()),
    }
}

/// Body of the first fenced block, or the text itself.
pub fn strip_fences(text: &str) -> &str {
    fence_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn parse_shaped(text: &str, shape: PayloadShape) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| shape.matches(v))
}

pub fn extract_payload(raw: &str, shape: PayloadShape) -> Option<Value> {
    let text = strip_fences(raw).trim();
    if let Some(v) = parse_shaped(text, shape) {
        return Some(v);
    }

    let region = region_re(shape).find(text).map(|m| m.as_str());
    if let Some(v) = region.and_then(|r| parse_shaped(r, shape)) {
        return Some(v);
    }

    repair_json(region.unwrap_or(text)).filter(|v| shape.matches(v))
}
