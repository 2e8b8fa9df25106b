//! # Source authority
//!
//! Maps outlet names (e.g. "Le Monde", "MIT Technology Review") to an integer
//! authority used by dedup (cluster representative) and ranking (score cap 25).
//!
//! - Case-insensitive lookup with normalization of punctuation, dashes, etc.
//! - Aliases map alternative spellings to canonical outlets.
//! - Fallback order: aliases → exact match → substring match → default.
//!
//! Substring fallback picks the longest matching key so the result does not
//! depend on map iteration order.

use serde::Deserialize;
use std::collections::HashMap;

use crate::article::DEFAULT_AUTHORITY;

fn default_default_authority() -> i32 {
    DEFAULT_AUTHORITY
}

/// `[sources]` section of the pipeline config.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeights {
    #[serde(default = "default_default_authority")]
    pub default_authority: i32,
    /// Explicit authority for canonical outlet names.
    #[serde(default)]
    pub authority: HashMap<String, i32>,
    /// Non-canonical name → canonical name.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            default_authority: DEFAULT_AUTHORITY,
            authority: HashMap::new(),
            aliases: HashMap::new(),
        }
    }
}

impl SourceWeights {
    /// Re-key both tables by their normalized form.
    pub fn normalized(self) -> Self {
        Self {
            default_authority: self.default_authority,
            authority: self
                .authority
                .into_iter()
                .map(|(k, v)| (normalize(&k), v))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
            aliases: self
                .aliases
                .into_iter()
                .map(|(k, v)| (normalize(&k), normalize(&v)))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
        }
    }

    /// Authority for a given outlet name.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical → authority.
    /// 2. Exact match.
    /// 3. Substring fallback ("The Verge Tech" → "the verge").
    /// 4. Default.
    pub fn authority_for(&self, source: &str) -> i32 {
        let s = normalize(source);
        if s.is_empty() {
            return self.default_authority;
        }

        // 1) Alias resolution.
        if let Some(canon) = self.aliases.get(&s) {
            if let Some(&a) = self.authority.get(canon) {
                return a;
            }
        }

        // 2) Exact match.
        if let Some(&a) = self.authority.get(&s) {
            return a;
        }

        // 3) Substring fallback, longest key wins.
        self.authority
            .iter()
            .filter(|(k, _)| s.contains(k.as_str()))
            .max_by(|(ka, _), (kb, _)| ka.len().cmp(&kb.len()).then_with(|| kb.cmp(ka)))
            .map(|(_, &a)| a)
            // 4) Default.
            .unwrap_or(self.default_authority)
    }
}

/// Lowercase, replace punctuation/dashes with spaces, collapse whitespace.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '‚', '’', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SourceWeights {
        let mut authority = HashMap::new();
        for (k, v) in [
            ("Le Monde", 20),
            ("MIT Technology Review", 22),
            ("The Verge", 15),
            ("Verge", 9),
            ("Ars Technica", 18),
        ] {
            authority.insert(k.to_string(), v);
        }
        let mut aliases = HashMap::new();
        aliases.insert("lemonde.fr".to_string(), "Le Monde".to_string());
        aliases.insert("MIT Tech Review".to_string(), "mit technology review".to_string());
        SourceWeights {
            default_authority: 10,
            authority,
            aliases,
        }
        .normalized()
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let c = cfg();
        assert_eq!(c.authority_for("LE MONDE"), 20);
        assert_eq!(c.authority_for("le monde"), 20);
    }

    #[test]
    fn alias_match() {
        let c = cfg();
        assert_eq!(c.authority_for("lemonde.fr"), 20);
        assert_eq!(c.authority_for("MIT Tech-Review"), 22);
    }

    #[test]
    fn substring_prefers_longest_key() {
        let c = cfg();
        assert_eq!(c.authority_for("The Verge - AI"), 15);
        assert_eq!(c.authority_for("Ars Technica (Feed)"), 18);
    }

    #[test]
    fn default_used_for_unknown_and_blank() {
        let c = cfg();
        assert_eq!(c.authority_for("Totally Unknown Blog"), 10);
        assert_eq!(c.authority_for("   "), 10);
    }

    #[test]
    fn dash_and_typography_normalization() {
        let c = cfg();
        assert_eq!(c.authority_for("Ars—Technica"), 18);
        assert_eq!(c.authority_for("Ars_Technica"), 18);
    }
}
