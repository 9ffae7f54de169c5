//! Tokenization shared by the parser, the index and the embedders.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Question filler words dropped from concept phrases and index signatures.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "are", "as", "at", "be", "by", "can", "could", "data",
    "did", "do", "does", "for", "from", "give", "how", "i", "in", "is", "it", "know", "like",
    "me", "much", "my", "of", "on", "or", "please", "s", "show", "tell", "that", "the", "their",
    "there", "this", "to", "value", "was", "were", "what", "whats", "which", "who", "will",
    "with", "would", "you", "year", "during", "many",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

pub fn is_stop_word(token: &str) -> bool {
    STOP_SET.contains(token)
}

/// Lower-cased alphanumeric runs. `+` and `-` stay inside tokens so that
/// "65+" and "15-24" survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| !t.is_empty() && *t != "+")
        .map(str::to_string)
        .collect()
}

/// [`tokenize`] without stop words.
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .collect()
}

/// Collapse runs of whitespace into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_ranges() {
        assert_eq!(
            tokenize("Population ages 65+ (% of total), 15-24!"),
            vec!["population", "ages", "65+", "of", "total", "15-24"]
        );
    }

    #[test]
    fn test_content_tokens_drop_fillers() {
        assert_eq!(content_tokens("What is the GDP of"), vec!["gdp"]);
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash_whitespace("  a \n b\tc "), "a b c");
    }
}
