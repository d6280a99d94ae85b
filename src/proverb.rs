//! Proverb types - the unit of storage
//!
//! A proverb is a short, non-empty text with a set of distinct,
//! case-sensitive tags. Identity is assigned by the backend that stores it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Separator between tags inside one source field
pub const TAG_DELIMITER: char = '|';

/// Backend-assigned identity. Opaque outside the backend that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProverbId(String);

impl ProverbId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProverbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a candidate record was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidProverb {
    #[error("proverb text is empty")]
    EmptyText,
    #[error("empty tag in {0:?}")]
    EmptyTag(String),
    #[error("duplicate tag {0:?}")]
    DuplicateTag(String),
    #[error("tag {0:?} contains a control character")]
    ControlCharacter(String),
}

/// A validated proverb that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProverb {
    text: String,
    tags: BTreeSet<String>,
}

impl NewProverb {
    /// Build a candidate from text and already-split tags.
    pub fn new<I, S>(text: impl Into<String>, tags: I) -> Result<Self, InvalidProverb>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(InvalidProverb::EmptyText);
        }

        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.into();
            validate_tag(&tag)?;
            if !set.insert(tag.clone()) {
                return Err(InvalidProverb::DuplicateTag(tag));
            }
        }

        Ok(Self { text, tags: set })
    }

    /// Build a candidate from the raw `tags` field of a source row.
    ///
    /// An entirely blank field means "no tags"; otherwise every
    /// `TAG_DELIMITER`-separated token must be non-empty after trimming.
    pub fn parse(raw_tags: &str, text: impl Into<String>) -> Result<Self, InvalidProverb> {
        Self::new(text, parse_tags(raw_tags)?)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Attach the identity a backend assigned to this record
    pub fn into_proverb(self, id: ProverbId) -> Proverb {
        Proverb { id, text: self.text, tags: self.tags }
    }
}

/// A stored proverb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proverb {
    pub id: ProverbId,
    pub text: String,
    pub tags: BTreeSet<String>,
}

impl Proverb {
    /// Case-insensitive, unanchored containment. An empty needle matches.
    pub fn matches_text(&self, needle: &str) -> bool {
        text_contains(&self.text, needle)
    }

    /// Exact, case-sensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Content without identity, for comparing stores that assign ids differently
    pub fn content(&self) -> (&str, &BTreeSet<String>) {
        (&self.text, &self.tags)
    }
}

impl std::fmt::Display for Proverb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        write!(f, "{}  [{}]", self.text, tags.join(", "))
    }
}

/// Case folding used by every backend for substring search.
///
/// Folds one character at a time. `str::to_lowercase` applies the
/// final-sigma rule, which would fold a trailing `Σ` differently from a lone
/// `Σ` needle and break containment.
pub fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

pub fn text_contains(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || fold_case(haystack).contains(&fold_case(needle))
}

fn parse_tags(raw: &str) -> Result<Vec<String>, InvalidProverb> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(TAG_DELIMITER)
        .map(|token| {
            let token = token.trim();
            if token.is_empty() {
                Err(InvalidProverb::EmptyTag(raw.to_string()))
            } else {
                Ok(token.to_string())
            }
        })
        .collect()
}

fn validate_tag(tag: &str) -> Result<(), InvalidProverb> {
    if tag.is_empty() {
        return Err(InvalidProverb::EmptyTag(tag.to_string()));
    }
    if tag.chars().any(char::is_control) {
        return Err(InvalidProverb::ControlCharacter(tag.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let p = NewProverb::parse("cgo | unsafe", "Cgo is not Go.").unwrap();
        assert_eq!(p.text(), "Cgo is not Go.");
        assert!(p.tags().contains("cgo"));
        assert!(p.tags().contains("unsafe"));
        assert_eq!(p.tags().len(), 2);
    }

    #[test]
    fn test_blank_tag_field_means_no_tags() {
        let p = NewProverb::parse("  ", "Clear is better than clever.").unwrap();
        assert!(p.tags().is_empty());
    }

    #[test]
    fn test_malformed_tags_rejected() {
        assert!(matches!(NewProverb::parse("a||b", "x"), Err(InvalidProverb::EmptyTag(_))));
        assert!(matches!(NewProverb::parse("a|", "x"), Err(InvalidProverb::EmptyTag(_))));
        assert_eq!(
            NewProverb::parse("a|a", "x"),
            Err(InvalidProverb::DuplicateTag("a".to_string()))
        );
        assert!(matches!(NewProverb::new("x", ["a\tb"]), Err(InvalidProverb::ControlCharacter(_))));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let p = NewProverb::parse("Error|error", "Errors are values").unwrap();
        assert_eq!(p.tags().len(), 2);
    }

    #[test]
    fn test_empty_text_rejected() {
        assert_eq!(NewProverb::parse("go", "   "), Err(InvalidProverb::EmptyText));
    }

    #[test]
    fn test_matches_text_is_case_insensitive() {
        let p = NewProverb::parse("cgo", "Cgo is not Go.").unwrap().into_proverb(ProverbId::new("1"));
        assert!(p.matches_text("cgo"));
        assert!(p.matches_text("CGO"));
        assert!(p.matches_text(""));
        assert!(!p.matches_text("rust"));
        assert!(p.has_tag("cgo"));
        assert!(!p.has_tag("Cgo"));
    }

    #[test]
    fn test_fold_case_keeps_containment() {
        assert!(text_contains("ΟΔΟΣ", "Σ"));
        assert!(text_contains("ΟΔΟΣ", "σ"));
        assert!(text_contains("İZMİR", "i"));
        assert_eq!(fold_case("ΟΔΟΣ"), "οδοσ");
    }

    #[test]
    fn test_display() {
        let p = NewProverb::parse("b|a", "Don't panic.").unwrap().into_proverb(ProverbId::new("9"));
        assert_eq!(p.to_string(), "Don't panic.  [a, b]");
    }
}
