//! Asset URL normalization for response bodies
//!
//! Servers still hand out relative `/uploads/...` paths and URLs on legacy
//! hosts. Every string leaf of a parsed response is rewritten onto the
//! canonical asset host; structure and non-string leaves are untouched.

use bookmart_domain::constants::{
    DEFAULT_LEGACY_ASSET_PREFIXES, PROD_API_BASE, UPLOADS_PATH_PREFIX,
};
use serde_json::Value;

use crate::endpoint::normalize_base;

/// Rewrites upload paths and legacy-host URLs onto the canonical host.
///
/// `normalize` is idempotent: rewritten strings start with the canonical
/// host, and strings that already do are never rewritten again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrlNormalizer {
    canonical_host: String,
    legacy_prefixes: Vec<String>,
}

impl AssetUrlNormalizer {
    pub fn new<I, S>(canonical_host: &str, legacy_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let legacy_prefixes = legacy_prefixes
            .into_iter()
            .map(|prefix| normalize_base(prefix.as_ref()))
            .filter(|prefix| !prefix.is_empty())
            .collect();
        Self { canonical_host: normalize_base(canonical_host), legacy_prefixes }
    }

    pub fn canonical_host(&self) -> &str {
        &self.canonical_host
    }

    /// Recursively rewrite every string leaf of `value`.
    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::String(text) => match self.rewrite(&text) {
                Some(rewritten) => Value::String(rewritten),
                None => Value::String(text),
            },
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.normalize(item)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter().map(|(key, item)| (key, self.normalize(item))).collect(),
            ),
            other => other,
        }
    }

    /// Rewritten form of `raw`, or `None` when it passes through unchanged.
    pub fn rewrite(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.canonical_host.is_empty() {
            return None;
        }
        if trimmed.starts_with(&self.canonical_host) {
            return None;
        }
        if trimmed.starts_with(UPLOADS_PATH_PREFIX) {
            return Some(format!("{}{trimmed}", self.canonical_host));
        }
        self.legacy_prefixes.iter().find_map(|prefix| {
            trimmed
                .strip_prefix(prefix.as_str())
                .map(|rest| format!("{}{rest}", self.canonical_host))
        })
    }
}

impl Default for AssetUrlNormalizer {
    fn default() -> Self {
        Self::new(PROD_API_BASE, DEFAULT_LEGACY_ASSET_PREFIXES)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn uploads_path_gets_canonical_host() {
        let normalizer = AssetUrlNormalizer::default();
        assert_eq!(
            normalizer.normalize(json!("/uploads/x.png")),
            json!("https://api.example.com/uploads/x.png")
        );
    }

    #[test]
    fn legacy_http_host_is_upgraded() {
        let normalizer = AssetUrlNormalizer::default();
        assert_eq!(
            normalizer.normalize(json!("http://api.example.com/uploads/a.jpg?w=200")),
            json!("https://api.example.com/uploads/a.jpg?w=200")
        );
    }

    #[test]
    fn unrelated_strings_pass_through() {
        let normalizer = AssetUrlNormalizer::default();
        assert_eq!(
            normalizer.normalize(json!("https://unrelated.example/x")),
            json!("https://unrelated.example/x")
        );
        assert_eq!(normalizer.normalize(json!("  padded  ")), json!("  padded  "));
        assert_eq!(normalizer.normalize(json!("uploads/not-rooted")), json!("uploads/not-rooted"));
    }

    #[test]
    fn non_string_leaves_and_structure_are_preserved() {
        let normalizer = AssetUrlNormalizer::default();
        let input = json!({
            "id": 7,
            "price": 12.5,
            "onSale": true,
            "seller": null,
            "images": ["/uploads/a.png", "https://cdn.other/b.png"],
            "nested": { "cover": "http://api.example.com/uploads/c.png" }
        });

        let output = normalizer.normalize(input);
        assert_eq!(
            output,
            json!({
                "id": 7,
                "price": 12.5,
                "onSale": true,
                "seller": null,
                "images": ["https://api.example.com/uploads/a.png", "https://cdn.other/b.png"],
                "nested": { "cover": "https://api.example.com/uploads/c.png" }
            })
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let normalizer = AssetUrlNormalizer::default();
        let inputs = [
            json!("/uploads/x.png"),
            json!(" /uploads/padded.png "),
            json!("http://api.example.com/a"),
            json!("https://api.example.com/b"),
            json!("https://unrelated.example/x"),
            json!({ "list": ["/uploads/1", { "deep": "http://api.example.com/2" }], "n": 1 }),
            json!(null),
        ];

        for input in inputs {
            let once = normalizer.normalize(input);
            let twice = normalizer.normalize(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn idempotent_when_legacy_prefix_prefixes_canonical_host() {
        let normalizer = AssetUrlNormalizer::new(
            "https://assets.example.com.cdn",
            ["https://assets.example.com"],
        );
        let once = normalizer.normalize(json!("https://assets.example.com/p.png"));
        assert_eq!(once, json!("https://assets.example.com.cdn/p.png"));
        assert_eq!(normalizer.normalize(once.clone()), once);
    }
}
