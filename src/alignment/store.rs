use std::cmp::Ordering;

use crate::alignment::payload::WordTimingRow;
use crate::types::{AlignmentSource, AudioWordTiming};

/// Externally supplied timing for the passage currently on screen.
///
/// Written once per passage by the fetch collaborator and read on every playback tick.
/// `timings` always satisfies: sorted by `start` and `index`, non-overlapping, `end > start`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentStore {
    source: AlignmentSource,
    timings: Vec<AudioWordTiming>,
}

impl AlignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> AlignmentSource {
        self.source
    }

    pub fn timings(&self) -> &[AudioWordTiming] {
        &self.timings
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn clear(&mut self) {
        self.source = AlignmentSource::None;
        self.timings.clear();
    }

    /// Validates untrusted rows and stores the survivors. Returns the number kept.
    ///
    /// Rows indexing past `word_count` are dropped before ordering is enforced.
    pub fn set_rows(
        &mut self,
        source: AlignmentSource,
        rows: &[WordTimingRow],
        word_count: usize,
    ) -> usize {
        let candidates: Vec<AudioWordTiming> = rows.iter().filter_map(validate_row).collect();
        let rejected = rows.len() - candidates.len();
        if rejected > 0 {
            tracing::debug!(
                rejected,
                total = rows.len(),
                "alignment store: dropped malformed timing rows"
            );
        }
        self.set_timings(source, candidates, word_count)
    }

    /// Stores already-typed timings after enforcing range, ordering and non-overlap.
    /// Returns the number kept.
    pub fn set_timings(
        &mut self,
        source: AlignmentSource,
        timings: Vec<AudioWordTiming>,
        word_count: usize,
    ) -> usize {
        let before = timings.len();
        let in_range: Vec<AudioWordTiming> = timings
            .into_iter()
            .filter(|t| t.start.is_finite() && t.end.is_finite() && t.end > t.start)
            .filter(|t| t.index < word_count)
            .collect();
        if in_range.len() != before {
            tracing::debug!(
                dropped = before - in_range.len(),
                word_count,
                "alignment store: dropped rows outside the passage"
            );
        }

        let timings = coerce_monotonic(in_range);
        self.source = if timings.is_empty() {
            AlignmentSource::None
        } else {
            source
        };
        self.timings = timings;
        self.timings.len()
    }
}

fn validate_row(row: &WordTimingRow) -> Option<AudioWordTiming> {
    let index = row.index?;
    let start = row.start?;
    let end = row.end?;
    if !index.is_finite() || !start.is_finite() || !end.is_finite() {
        return None;
    }
    if end <= start || index < 0.0 || index.fract() != 0.0 || index > usize::MAX as f64 {
        return None;
    }
    Some(AudioWordTiming {
        index: index as usize,
        word: row.word.clone().unwrap_or_default(),
        start,
        end,
    })
}

/// Sorts by start time and keeps the longest chain of rows that advance both the word
/// index and the clock without overlapping. Ties go to the chain ending earliest.
fn coerce_monotonic(mut timings: Vec<AudioWordTiming>) -> Vec<AudioWordTiming> {
    timings.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    let n = timings.len();
    let mut chain_len = vec![1usize; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        for j in 0..i {
            let extends = timings[j].index < timings[i].index && timings[j].end <= timings[i].start;
            if extends && chain_len[j] + 1 > chain_len[i] {
                chain_len[i] = chain_len[j] + 1;
                parent[i] = Some(j);
            }
        }
    }

    let mut tail = None;
    for i in 0..n {
        if tail.map_or(true, |t: usize| chain_len[i] > chain_len[t]) {
            tail = Some(i);
        }
    }
    let mut keep = vec![false; n];
    while let Some(i) = tail {
        keep[i] = true;
        tail = parent[i];
    }

    let kept: Vec<AudioWordTiming> = timings
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();
    if kept.len() != n {
        tracing::debug!(
            dropped = n - kept.len(),
            "alignment store: dropped overlapping or out-of-order rows"
        );
    }
    kept
}
