use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextToken {
    /// Exact substring of the passage; concatenating every `raw` rebuilds the text.
    pub raw: String,
    pub is_word: bool,
    /// Zero-based position among word tokens. `None` for whitespace and punctuation.
    pub word_position: Option<usize>,
}

impl TextToken {
    pub fn word(raw: impl Into<String>, word_position: usize) -> Self {
        Self {
            raw: raw.into(),
            is_word: true,
            word_position: Some(word_position),
        }
    }

    pub fn non_word(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            is_word: false,
            word_position: None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        !self.raw.is_empty() && self.raw.chars().all(char::is_whitespace)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioWordTiming {
    /// Word position this row is aligned to.
    pub index: usize,
    pub word: String,
    /// Seconds; interval is [start, end).
    pub start: f64,
    /// Seconds; interval is [start, end).
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimatedWordTiming {
    pub index: usize,
    /// Fraction of the estimated passage duration; interval is [start_ratio, end_ratio).
    pub start_ratio: f64,
    pub end_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentSource {
    WordLevel,
    SegmentDerived,
    #[default]
    None,
}

impl AlignmentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WordLevel => "word_level",
            Self::SegmentDerived => "segment_derived",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncQuality {
    Aligning,
    Precise,
    Approximate,
    Estimated,
}

impl SyncQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aligning => "aligning",
            Self::Precise => "precise",
            Self::Approximate => "approximate",
            Self::Estimated => "estimated",
        }
    }
}

impl std::fmt::Display for SyncQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub id: String,
    pub content_text: String,
}

impl Passage {
    pub fn new(id: impl Into<String>, content_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_text: content_text.into(),
        }
    }
}

/// Latest reading of the playback clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    /// Elapsed playback time in seconds.
    pub elapsed: f64,
    /// Total media duration in seconds. `None` (or non-finite) before metadata loads.
    pub duration: Option<f64>,
}

impl ClockReading {
    pub fn new(elapsed: f64, duration: Option<f64>) -> Self {
        Self { elapsed, duration }
    }

    /// Playback progress in [0, 1], or `None` when it cannot be computed.
    pub fn progress_ratio(&self) -> Option<f64> {
        if !self.elapsed.is_finite() || self.elapsed < 0.0 {
            return None;
        }
        let duration = self.duration.filter(|d| d.is_finite() && *d > 0.0)?;
        let ratio = self.elapsed / duration;
        (0.0..=1.0).contains(&ratio).then_some(ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Progress(ClockReading),
    Seek(ClockReading),
    Play(ClockReading),
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncUpdate {
    pub active_word: Option<usize>,
    /// Set when the active word moved to a different word that should be scrolled into view.
    pub scroll_into_view: Option<usize>,
    /// Playback finished; any paired practice-time counter should stop.
    pub stop_practice_timer: bool,
}
