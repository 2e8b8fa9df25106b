//! Phase contracts. Validators never fail; they return every violation
//! found, in document order. An empty list means the payload is valid.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{json, Value};

use super::{PayloadShape, PhaseSpec};

pub const MIN_CANDIDATES: usize = 5;
pub const MIN_EDITORIAL_ITEMS: usize = 2;
pub const MIN_BILLET_CHARS: usize = 200;

/// JSON truthiness: `null`, `false`, `0`, blank strings and empty
/// containers are all "missing".
pub fn is_truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn has(item: &Value, field: &str) -> bool {
    is_truthy(item.get(field))
}

/// Candidate list: an array of at least `min_items` objects, each with
/// non-empty `title`, `url` and `source`.
pub fn validate_candidates(data: &Value, min_items: usize) -> Vec<String> {
    let Some(items) = data.as_array() else {
        return vec!["Expected a JSON array of articles".to_string()];
    };

    let mut errors = Vec::new();
    if items.len() < min_items {
        errors.push(format!(
            "Too few articles: {} (minimum {min_items})",
            items.len()
        ));
    }
    for (i, item) in items.iter().enumerate() {
        if !item.is_object() {
            errors.push(format!("Article {i}: not a JSON object"));
            continue;
        }
        for field in ["title", "url", "source"] {
            if !has(item, field) {
                errors.push(format!("Article {i}: missing or empty '{field}'"));
            }
        }
    }
    errors
}

/// Editorial batch: synthesis at position 0, then rewritten articles.
/// A trailing `is_not_serious` item (batches of 3+) must carry
/// `not_serious_tag` in its `matched_topics`.
pub fn validate_editorial(data: &Value, not_serious_tag: &str) -> Vec<String> {
    let Some(items) = data.as_array() else {
        return vec!["Response is not a JSON array".to_string()];
    };
    if items.len() < MIN_EDITORIAL_ITEMS {
        return vec!["Expected at least 2 articles (1 synthesis + 1 article)".to_string()];
    }

    let mut errors = Vec::new();
    let synth = &items[0];
    if !has(synth, "is_synthesis") {
        errors.push("Position 0 must have is_synthesis: true".to_string());
    }
    if !has(synth, "editorial_title") {
        errors.push("Synthesis missing editorial_title".to_string());
    }
    if !has(synth, "editorial_summary") {
        errors.push("Synthesis missing editorial_summary".to_string());
    }

    for (i, item) in items.iter().enumerate().skip(1) {
        if !item.is_object() {
            errors.push(format!("Article {i}: not a JSON object"));
            continue;
        }
        for field in ["editorial_title", "editorial_summary", "url"] {
            if !has(item, field) {
                errors.push(format!("Article {i}: missing {field}"));
            }
        }
    }

    if items.len() >= 3 {
        let last = &items[items.len() - 1];
        if has(last, "is_not_serious") {
            let tagged = last
                .get("matched_topics")
                .and_then(Value::as_array)
                .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(not_serious_tag)));
            if !tagged {
                errors.push(format!(
                    "'{not_serious_tag}' article should have matched_topics containing '{not_serious_tag}'"
                ));
            }
        }
    }
    errors
}

/// Social post: object with `post` (length-bounded), `comment` and
/// `image_prompt`.
pub fn validate_social(data: &Value, min_chars: usize, max_chars: usize) -> Vec<String> {
    if !data.is_object() {
        return vec!["Response is not a JSON object".to_string()];
    }

    let mut errors = Vec::new();
    match data.get("post").and_then(Value::as_str).filter(|s| !s.trim().is_empty()) {
        None => errors.push("Missing 'post' field".to_string()),
        Some(post) => {
            let n = post.chars().count();
            if n < min_chars {
                errors.push(format!("Post too short ({n} chars, min {min_chars})"));
            } else if n > max_chars {
                errors.push(format!("Post too long ({n} chars, max {max_chars})"));
            }
        }
    }
    if !has(data, "comment") {
        errors.push("Missing 'comment' field".to_string());
    }
    if !has(data, "image_prompt") {
        errors.push("Missing 'image_prompt' field".to_string());
    }
    errors
}

/// Split a `[TITRE]` / `[BILLET]` response into `{"title", "billet"}`.
/// The title runs to the first blank line or the `[BILLET]` marker; the
/// column runs to the end. A missing marker yields an empty string.
pub fn parse_billet(text: &str) -> Value {
    static RE_TITLE: OnceCell<Regex> = OnceCell::new();
    static RE_BODY: OnceCell<Regex> = OnceCell::new();
    let re_title = RE_TITLE.get_or_init(|| {
        Regex::new(r"(?s)\[TITRE\]\s*\n(.+?)(?:\n\s*\n|\n\[BILLET\])").unwrap()
    });
    let re_body = RE_BODY.get_or_init(|| Regex::new(r"(?s)\[BILLET\]\s*\n(.+)").unwrap());

    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str().trim())
            .to_string()
    };
    json!({ "title": capture(re_title), "billet": capture(re_body) })
}

/// Opinion column: non-empty `title`, `billet` of at least `min_chars`.
pub fn validate_billet(data: &Value, min_chars: usize) -> Vec<String> {
    let mut errors = Vec::new();
    if !has(data, "title") {
        errors.push("Missing or empty title. Use the [TITRE] marker followed by the title.".to_string());
    }
    match data.get("billet").and_then(Value::as_str).filter(|s| !s.trim().is_empty()) {
        None => errors.push(
            "Missing or empty column. Use the [BILLET] marker followed by the text.".to_string(),
        ),
        Some(body) => {
            let n = body.chars().count();
            if n < min_chars {
                errors.push(format!(
                    "Column too short ({n} chars, min {min_chars}). Write 10-15 sentences."
                ));
            }
        }
    }
    errors
}

pub fn candidates_phase(min_items: usize) -> PhaseSpec {
    PhaseSpec::new("candidates", PayloadShape::Array, move |v| {
        validate_candidates(v, min_items)
    })
}

pub fn editorial_phase(not_serious_tag: impl Into<String>) -> PhaseSpec {
    let tag = not_serious_tag.into();
    PhaseSpec::new("editorial", PayloadShape::Array, move |v| {
        validate_editorial(v, &tag)
    })
}

pub fn social_phase(min_chars: usize, max_chars: usize) -> PhaseSpec {
    PhaseSpec::new("social", PayloadShape::Object, move |v| {
        validate_social(v, min_chars, max_chars)
    })
}

pub fn billet_phase(min_chars: usize) -> PhaseSpec {
    PhaseSpec::new("billet", PayloadShape::Object, move |v| {
        validate_billet(v, min_chars)
    })
    .with_parser(|raw| Some(parse_billet(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "C'est pas serieux";

    fn good_editorial() -> Value {
        json!([
            {"is_synthesis": true, "editorial_title": "Week", "editorial_summary": "Sum"},
            {"editorial_title": "A", "editorial_summary": "a", "url": "https://a.com/1"},
            {"editorial_title": "B", "editorial_summary": "b", "url": "https://b.com/1"}
        ])
    }

    #[test]
    fn editorial_happy_path() {
        assert!(validate_editorial(&good_editorial(), TAG).is_empty());
    }

    #[test]
    fn editorial_position_zero_without_synthesis() {
        let mut v = good_editorial();
        v[0].as_object_mut().unwrap().remove("is_synthesis");
        let errs = validate_editorial(&v, TAG);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("Position 0"));
    }

    #[test]
    fn editorial_single_item_gives_exactly_one_error() {
        for v in [json!([{}]), json!([{"is_synthesis": true}]), json!([42])] {
            let errs = validate_editorial(&v, TAG);
            assert_eq!(errs, vec!["Expected at least 2 articles (1 synthesis + 1 article)"]);
        }
    }

    #[test]
    fn editorial_reports_every_missing_field() {
        let v = json!([
            {"is_synthesis": true},
            {"editorial_title": "", "url": "https://a.com"},
            "oops"
        ]);
        let errs = validate_editorial(&v, TAG);
        assert_eq!(
            errs,
            vec![
                "Synthesis missing editorial_title",
                "Synthesis missing editorial_summary",
                "Article 1: missing editorial_title",
                "Article 1: missing editorial_summary",
                "Article 2: not a JSON object",
            ]
        );
    }

    #[test]
    fn not_serious_item_needs_its_tag() {
        let mut v = good_editorial();
        v[2]["is_not_serious"] = json!(true);
        v[2]["matched_topics"] = json!(["Culture"]);
        let errs = validate_editorial(&v, TAG);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("matched_topics"));

        v[2]["matched_topics"] = json!(["Culture", TAG]);
        assert!(validate_editorial(&v, TAG).is_empty());
    }

    #[test]
    fn not_serious_is_ignored_in_two_item_batches() {
        let v = json!([
            {"is_synthesis": true, "editorial_title": "W", "editorial_summary": "S"},
            {"editorial_title": "A", "editorial_summary": "a", "url": "u", "is_not_serious": true}
        ]);
        assert!(validate_editorial(&v, TAG).is_empty());
    }

    #[test]
    fn editorial_not_an_array() {
        assert_eq!(
            validate_editorial(&json!({"a": 1}), TAG),
            vec!["Response is not a JSON array"]
        );
    }

    #[test]
    fn candidates_contract() {
        let v = json!([
            {"title": "t", "url": "u", "source": "s"},
            {"title": "", "url": "u"},
            7
        ]);
        let errs = validate_candidates(&v, MIN_CANDIDATES);
        assert_eq!(
            errs,
            vec![
                "Too few articles: 3 (minimum 5)",
                "Article 1: missing or empty 'title'",
                "Article 1: missing or empty 'source'",
                "Article 2: not a JSON object",
            ]
        );
        assert_eq!(
            validate_candidates(&json!("x"), MIN_CANDIDATES),
            vec!["Expected a JSON array of articles"]
        );
    }

    #[test]
    fn social_bounds() {
        let ok = json!({"post": "p".repeat(250), "comment": "c", "image_prompt": "i"});
        assert!(validate_social(&ok, 200, 3000).is_empty());

        let short = json!({"post": "p".repeat(20), "comment": "c"});
        assert_eq!(
            validate_social(&short, 200, 3000),
            vec!["Post too short (20 chars, min 200)", "Missing 'image_prompt' field"]
        );

        let long = json!({"post": "p".repeat(3001), "comment": "c", "image_prompt": "i"});
        assert_eq!(
            validate_social(&long, 200, 3000),
            vec!["Post too long (3001 chars, max 3000)"]
        );
        assert_eq!(
            validate_social(&json!([]), 200, 3000),
            vec!["Response is not a JSON object"]
        );
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!("  "))));
        assert!(!is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!("x"))));
    }

    #[test]
    fn billet_markers_are_split() {
        let raw = "Sure.\n[TITRE]\nThe quiet week\n\n[BILLET]\nFirst line.\nSecond line.\n";
        let v = parse_billet(raw);
        assert_eq!(v["title"], "The quiet week");
        assert_eq!(v["billet"], "First line.\nSecond line.");

        // title right before the body marker, no blank line
        let v = parse_billet("[TITRE]\nTight\n[BILLET]\nBody");
        assert_eq!(v["title"], "Tight");
        assert_eq!(v["billet"], "Body");
    }

    #[test]
    fn billet_without_markers_is_empty() {
        let v = parse_billet("Here is my column about models.");
        assert_eq!(v, json!({"title": "", "billet": ""}));
        let errors = validate_billet(&v, MIN_BILLET_CHARS);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("[TITRE]"));
        assert!(errors[1].contains("[BILLET]"));
    }

    #[test]
    fn billet_length_is_counted_in_chars() {
        let short = json!({"title": "T", "billet": "é".repeat(199)});
        let errors = validate_billet(&short, MIN_BILLET_CHARS);
        assert_eq!(errors, vec!["Column too short (199 chars, min 200). Write 10-15 sentences."]);
        let ok = json!({"title": "T", "billet": "é".repeat(200)});
        assert!(validate_billet(&ok, MIN_BILLET_CHARS).is_empty());
    }

    #[test]
    fn billet_phase_uses_its_own_parser() {
        let spec = billet_phase(10);
        let payload = spec.extract("[TITRE]\nHello\n\n[BILLET]\nA long enough body.").unwrap();
        assert!(spec.validate(&payload).is_empty());
        assert!(spec.parse_failure_message().contains("output format"));
    }
}
