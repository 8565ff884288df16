use std::cmp::Ordering;

use crate::alignment::estimation::word_weight;
use crate::alignment::payload::SegmentTiming;
use crate::alignment::tokenization::tokenize_passage;
use crate::config::EstimatorConfig;
use crate::types::AudioWordTiming;

/// Spreads each segment's time span over the words in its text.
///
/// Word positions run on across segments, so the segments' texts are expected to cover
/// the passage in reading order. Within a segment, each word gets a share of the span
/// proportional to its estimated weight.
pub fn derive_word_timings(
    segments: &[SegmentTiming],
    config: &EstimatorConfig,
) -> Vec<AudioWordTiming> {
    let mut ordered: Vec<&SegmentTiming> = segments
        .iter()
        .filter(|s| s.start.is_finite() && s.end.is_finite() && s.end > s.start)
        .collect();
    ordered.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

    let mut timings = Vec::new();
    let mut next_index = 0usize;
    for segment in ordered {
        let tokens = tokenize_passage(&segment.text);
        let weighted: Vec<(usize, &str, f64)> = tokens
            .iter()
            .enumerate()
            .filter_map(|(token_idx, token)| {
                token.word_position.map(|pos| {
                    let weight = word_weight(&tokens, token_idx, config).max(0.0);
                    (pos, token.raw.as_str(), weight)
                })
            })
            .collect();
        if weighted.is_empty() {
            continue;
        }

        let total: f64 = weighted.iter().map(|(_, _, w)| w).sum();
        let span = segment.end - segment.start;
        let word_total = weighted.len();
        let mut cursor = 0.0f64;
        for (pos, word, weight) in weighted {
            let (start_frac, end_frac) = if total > 0.0 {
                let start = cursor / total;
                cursor += weight;
                (start, cursor / total)
            } else {
                (
                    pos as f64 / word_total as f64,
                    (pos + 1) as f64 / word_total as f64,
                )
            };
            let end = if pos + 1 == word_total {
                segment.end
            } else {
                segment.start + end_frac * span
            };
            timings.push(AudioWordTiming {
                index: next_index + pos,
                word: word.to_string(),
                start: segment.start + start_frac * span,
                end,
            });
        }
        next_index += word_total;
    }

    tracing::debug!(
        segment_count = segments.len(),
        word_count = timings.len(),
        "segments: derived word timings from segment spans"
    );

    timings
}
