use crate::config::EstimatorConfig;
use crate::types::{EstimatedWordTiming, TextToken};

const SENTENCE_PAUSE_MARKS: [&str; 4] = [".", ",", "!", "?"];
const CLAUSE_PAUSE_MARKS: [&str; 2] = [";", ":"];

/// Lowercases, folds curly apostrophes to `'`, and keeps only `[a-z0-9']`.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '\'')
        .collect()
}

/// Relative spoken weight of the word token at `token_idx`, including any pause that follows it.
pub(crate) fn word_weight(tokens: &[TextToken], token_idx: usize, config: &EstimatorConfig) -> f64 {
    let len = normalize_word(&tokens[token_idx].raw).chars().count();
    let weighted_chars = len.min(config.max_weighted_chars) as f64;
    config.base_weight + weighted_chars * config.per_char_weight + pause_bonus(tokens, token_idx, config)
}

fn pause_bonus(tokens: &[TextToken], token_idx: usize, config: &EstimatorConfig) -> f64 {
    let next = tokens
        .iter()
        .skip(token_idx + 1)
        .find(|t| !t.is_whitespace());
    match next.map(|t| t.raw.as_str()) {
        Some(mark) if SENTENCE_PAUSE_MARKS.contains(&mark) => config.sentence_pause_bonus,
        Some(mark) if CLAUSE_PAUSE_MARKS.contains(&mark) => config.clause_pause_bonus,
        _ => 0.0,
    }
}

pub fn estimate_word_timings(
    tokens: &[TextToken],
    config: &EstimatorConfig,
) -> Vec<EstimatedWordTiming> {
    // (word position, start weight, end weight)
    let mut spans: Vec<(usize, f64, f64)> = Vec::new();
    let mut total = 0.0f64;
    for (token_idx, token) in tokens.iter().enumerate() {
        let Some(index) = token.word_position else {
            continue;
        };
        let weight = word_weight(tokens, token_idx, config).max(0.0);
        let start = total;
        total += weight;
        spans.push((index, start, total));
    }

    if spans.is_empty() || !total.is_finite() || total <= 0.0 {
        return Vec::new();
    }

    let mut estimate: Vec<EstimatedWordTiming> = spans
        .into_iter()
        .map(|(index, start, end)| EstimatedWordTiming {
            index,
            start_ratio: start / total,
            end_ratio: end / total,
        })
        .collect();
    if let Some(last) = estimate.last_mut() {
        last.end_ratio = 1.0;
    }

    tracing::debug!(
        word_count = estimate.len(),
        total_weight = format!("{total:.3}"),
        "estimation: built proportional word timings"
    );

    estimate
}
