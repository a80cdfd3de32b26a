//! # Text Normalizer Module
//!
//! This module canonicalizes raw ingredient mentions and food descriptions
//! into a comparable form so that exact and fuzzy lookups operate on the
//! same vocabulary.
//!
//! ## Features
//!
//! - ASCII transliteration and lowercasing ("Jalapeño" -> "jalapeno")
//! - Stripping of digits and punctuation (quantities are discarded, not parsed)
//! - Removal of filler tokens (measurement units, size/prep adjectives)
//! - Whitespace collapsing and trimming
//!
//! Normalization is pure, deterministic and idempotent:
//! `normalize(normalize(x)) == normalize(x)` for every input.

use deunicode::deunicode;
use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use std::collections::HashSet;

/// Default filler vocabulary: measurement units and size/prep adjectives
/// that carry no identity information for matching.
const DEFAULT_FILLER_TOKENS: &[&str] = &[
    // prep/size adjectives
    "chopped", "diced", "sliced", "fresh", "large", "small", "medium",
    // volume units
    "cup", "cups", "tbsp", "tablespoon", "tablespoons", "tsp", "teaspoon",
    "teaspoons", "ml",
    // weight units
    "g", "gram", "grams", "kg", "oz", "ounce", "ounces",
];

lazy_static! {
    /// Everything outside lowercase letters and space is noise once the
    /// text has been transliterated and lowercased. Digits are dropped on
    /// purpose: embedded quantities are discarded, never parsed.
    static ref NON_LETTER: Regex = Regex::new(r"[^a-z ]").expect("non-letter pattern should be valid");
}

/// Configuration options for text normalization
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Tokens removed from the text after punctuation and digits are
    /// stripped. Matching is whole-token after lowercasing.
    pub filler_tokens: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            filler_tokens: DEFAULT_FILLER_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// Canonicalizes raw strings into a comparable form
///
/// # Examples
///
/// ```rust
/// use nutrimap::text_normalizer::TextNormalizer;
///
/// let normalizer = TextNormalizer::new();
/// assert_eq!(normalizer.normalize("2 cups Chopped Onions"), "onions");
/// ```
pub struct TextNormalizer {
    filler: HashSet<String>,
}

impl TextNormalizer {
    /// Create a normalizer with the default filler vocabulary
    pub fn new() -> Self {
        Self::with_config(NormalizerConfig::default())
    }

    /// Create a normalizer with a custom configuration
    pub fn with_config(config: NormalizerConfig) -> Self {
        debug!(
            "Creating TextNormalizer with {} filler tokens",
            config.filler_tokens.len()
        );
        Self {
            filler: config
                .filler_tokens
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    /// Normalize a raw string into its canonical comparable form
    ///
    /// Steps, in order: transliterate to plain ASCII and lowercase; strip
    /// every character outside lowercase letters and space (this removes
    /// digits, i.e. embedded quantities); drop filler tokens; collapse
    /// whitespace; trim.
    ///
    /// Stripping runs before the filler filter so that punctuation glued to
    /// a filler word ("cup," in "1 cup, chopped onions") never shields it.
    pub fn normalize(&self, raw: &str) -> String {
        let ascii = deunicode(raw).to_lowercase();
        let stripped = NON_LETTER.replace_all(&ascii, " ");

        let kept: Vec<&str> = stripped
            .split_whitespace()
            .filter(|token| !self.filler.contains(*token))
            .collect();
        let result = kept.join(" ");

        trace!("Normalized '{}' -> '{}'", raw, result);
        result
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_normalizer() -> TextNormalizer {
        TextNormalizer::new()
    }

    #[test]
    fn test_spec_example() {
        let normalizer = create_normalizer();
        assert_eq!(normalizer.normalize("2 cups Chopped Onions"), "onions");
    }

    #[test]
    fn test_lowercases_and_trims() {
        let normalizer = create_normalizer();
        assert_eq!(normalizer.normalize("  Chicken Breast  "), "chicken breast");
    }

    #[test]
    fn test_removes_filler_tokens() {
        let normalizer = create_normalizer();
        assert_eq!(normalizer.normalize("1 tbsp fresh ginger"), "ginger");
        assert_eq!(normalizer.normalize("500 g large tomatoes"), "tomatoes");
    }

    #[test]
    fn test_strips_digits_and_punctuation() {
        let normalizer = create_normalizer();
        assert_eq!(normalizer.normalize("onions, yellow (raw)"), "onions yellow raw");
        assert_eq!(normalizer.normalize("2% milk"), "milk");
    }

    #[test]
    fn test_transliterates_to_ascii() {
        let normalizer = create_normalizer();
        assert_eq!(normalizer.normalize("Jalapeño crème"), "jalapeno creme");
    }

    #[test]
    fn test_empty_and_noise_only_inputs() {
        let normalizer = create_normalizer();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("2 cups"), "");
        assert_eq!(normalizer.normalize("  123 !!! "), "");
    }

    #[test]
    fn test_filler_adjacent_to_punctuation_removed() {
        let normalizer = create_normalizer();
        // "cup," must not survive its trailing comma
        assert_eq!(normalizer.normalize("1 cup, chopped onions"), "onions");
        assert_eq!(normalizer.normalize("250ml milk"), "milk");
    }

    #[test]
    fn test_idempotent() {
        let normalizer = create_normalizer();
        let inputs = [
            "2 cups Chopped Onions",
            "1 cup, chopped onions",
            "Chicken breast raw",
            "1/2 tsp crème fraîche",
            "",
            "paneer",
        ];
        for raw in inputs {
            let once = normalizer.normalize(raw);
            let twice = normalizer.normalize(&once);
            assert_eq!(once, twice, "normalize should be idempotent for '{}'", raw);
        }
    }

    #[test]
    fn test_deterministic() {
        let normalizer = create_normalizer();
        let a = normalizer.normalize("2 cups Chopped Onions");
        let b = normalizer.normalize("2 cups Chopped Onions");
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_filler_vocabulary() {
        let config = NormalizerConfig {
            filler_tokens: vec!["organic".to_string()],
        };
        let normalizer = TextNormalizer::with_config(config);
        assert_eq!(normalizer.normalize("organic onions"), "onions");
        // default fillers no longer apply
        assert_eq!(normalizer.normalize("chopped onions"), "chopped onions");
    }

    #[test]
    fn test_filler_matches_whole_tokens_only() {
        let normalizer = create_normalizer();
        // "cupboard" contains "cup" but is not a filler token
        assert_eq!(normalizer.normalize("cupboard staples"), "cupboard staples");
    }
}
