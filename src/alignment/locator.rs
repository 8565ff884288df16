use crate::types::{AudioWordTiming, EstimatedWordTiming};

/// A row of a sorted, non-overlapping interval table keyed by word position.
pub trait TimedInterval {
    fn word_index(&self) -> usize;
    fn interval_start(&self) -> f64;
    fn interval_end(&self) -> f64;
}

impl TimedInterval for AudioWordTiming {
    fn word_index(&self) -> usize {
        self.index
    }

    fn interval_start(&self) -> f64 {
        self.start
    }

    fn interval_end(&self) -> f64 {
        self.end
    }
}

impl TimedInterval for EstimatedWordTiming {
    fn word_index(&self) -> usize {
        self.index
    }

    fn interval_start(&self) -> f64 {
        self.start_ratio
    }

    fn interval_end(&self) -> f64 {
        self.end_ratio
    }
}

/// Finds the word owning `position`, or the nearest word when `position` falls outside every row.
///
/// Rows are half-open `[start, end)`. In a gap, the distance to the previous row's end is
/// compared with the distance to the next row's start; equal distances pick the previous row.
/// Returns `None` only for an empty table or a non-finite position.
pub fn locate_word<T: TimedInterval>(position: f64, table: &[T]) -> Option<usize> {
    if !position.is_finite() || table.is_empty() {
        return None;
    }

    // Invariant: rows before `lo` end at or before `position`; rows from `hi` start after it.
    let mut lo = 0usize;
    let mut hi = table.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let row = &table[mid];
        if position < row.interval_start() {
            hi = mid;
        } else if position >= row.interval_end() {
            lo = mid + 1;
        } else {
            return Some(row.word_index());
        }
    }

    let below = lo.checked_sub(1).map(|i| &table[i]);
    let above = table.get(lo);
    match (below, above) {
        (Some(prev), Some(next)) => {
            let to_prev = position - prev.interval_end();
            let to_next = next.interval_start() - position;
            if to_prev <= to_next {
                Some(prev.word_index())
            } else {
                Some(next.word_index())
            }
        }
        (Some(prev), None) => Some(prev.word_index()),
        (None, Some(next)) => Some(next.word_index()),
        (None, None) => None,
    }
}

/// Crude fallback: maps a progress ratio straight onto the word range.
pub fn proportional_word(ratio: f64, word_count: usize) -> Option<usize> {
    if word_count == 0 || !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return None;
    }
    let position = (ratio * word_count as f64).floor() as usize;
    Some(position.min(word_count - 1))
}
