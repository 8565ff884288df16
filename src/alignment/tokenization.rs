use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::TextToken;

// Alternation order matters: whitespace runs, then word runs, then any single character.
// Every character is consumed by exactly one match, so the token stream covers the text.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(?P<space>\s+)|(?P<word>[\p{L}\p{N}\p{M}]+(?:['’\-][\p{L}\p{N}\p{M}]+)*)|(?P<other>.)",
    )
    .expect("token pattern is valid")
});

pub fn tokenize_passage(text: &str) -> Vec<TextToken> {
    let mut tokens = Vec::new();
    let mut next_word_position = 0usize;

    for caps in TOKEN_RE.captures_iter(text) {
        if let Some(word) = caps.name("word") {
            tokens.push(TextToken::word(word.as_str(), next_word_position));
            next_word_position += 1;
        } else if let Some(m) = caps.get(0) {
            tokens.push(TextToken::non_word(m.as_str()));
        }
    }

    debug_assert_eq!(
        tokens.iter().map(|t| t.raw.as_str()).collect::<String>(),
        text,
        "tokenization round-trip contract violated"
    );

    tokens
}

pub fn word_count(tokens: &[TextToken]) -> usize {
    tokens.iter().filter(|t| t.is_word).count()
}
