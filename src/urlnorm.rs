//! URL canonicalization used for equality checks (dedup, history).
//!
//! Key = lowercase host without leading `www.` + path without trailing `/`.
//! Scheme, query string and fragment are dropped, so `http`/`https`
//! variants of the same page collapse. The function is idempotent: a key
//! fed back in (it has no scheme) parses as `host[/path]` and comes out
//! unchanged.

use url::Url;

pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        if let Ok(parsed) = Url::parse(raw) {
            if let Some(host) = parsed.host_str() {
                let mut key = strip_www(&host.to_ascii_lowercase()).to_string();
                if let Some(port) = parsed.port() {
                    key.push(':');
                    key.push_str(&port.to_string());
                }
                key.push_str(parsed.path().trim_end_matches('/'));
                return key;
            }
        }
    }
    normalize_loose(raw)
}

/// Host part of the normalized key (`example.com` for
/// `https://www.example.com/a/b`).
pub fn domain_of(raw: &str) -> String {
    let key = normalize_url(raw);
    match key.find('/') {
        Some(i) => key[..i].to_string(),
        None => key,
    }
}

/// Fallback for strings `Url` cannot handle (no scheme, no host).
fn normalize_loose(raw: &str) -> String {
    let rest = match raw.find("://") {
        Some(i) => &raw[i + 3..],
        None => raw,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let rest = &rest[..end];
    let (host, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    // drop userinfo
    let host = host.rsplit('@').next().unwrap_or(host).to_ascii_lowercase();
    format!("{}{}", strip_www(&host), path.trim_end_matches('/'))
}

fn strip_www(host: &str) -> &str {
    let mut h = host;
    while let Some(rest) = h.strip_prefix("www.") {
        h = rest;
    }
    h
}
