use crate::alignment::locator::{locate_word, proportional_word};
use crate::alignment::payload::AlignmentPayload;
use crate::alignment::segments::derive_word_timings;
use crate::alignment::store::AlignmentStore;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::pipeline::traits::{AlignmentProvider, DurationEstimator, Tokenizer};
use crate::types::{
    AlignmentSource, ClockReading, EstimatedWordTiming, Passage, PlaybackEvent, SyncQuality,
    SyncUpdate, TextToken,
};

/// Identifies one alignment fetch. A result is applied only if its ticket is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    passage_id: String,
    generation: u64,
}

impl FetchTicket {
    pub fn passage_id(&self) -> &str {
        &self.passage_id
    }
}

struct PassageView {
    id: String,
    tokens: Vec<TextToken>,
    estimate: Vec<EstimatedWordTiming>,
    word_count: usize,
}

/// Drives the active word of the displayed passage from playback clock events.
pub struct SyncEngine {
    config: SyncConfig,
    tokenizer: Box<dyn Tokenizer>,
    estimator: Box<dyn DurationEstimator>,
    passage: Option<PassageView>,
    store: AlignmentStore,
    generation: u64,
    pending_generation: Option<u64>,
    follow: bool,
    active_word: Option<usize>,
}

pub(crate) struct SyncEngineParts {
    pub config: SyncConfig,
    pub tokenizer: Box<dyn Tokenizer>,
    pub estimator: Box<dyn DurationEstimator>,
    pub follow: bool,
}

impl SyncEngine {
    pub(crate) fn from_parts(parts: SyncEngineParts) -> Self {
        Self {
            config: parts.config,
            tokenizer: parts.tokenizer,
            estimator: parts.estimator,
            passage: None,
            store: AlignmentStore::new(),
            generation: 0,
            pending_generation: None,
            follow: parts.follow,
            active_word: None,
        }
    }

    /// Switches to a new passage and returns the ticket its alignment fetch must present.
    ///
    /// Alignment from the previous passage is discarded immediately, so playback runs on
    /// the estimate until the new fetch resolves.
    pub fn load_passage(&mut self, passage: &Passage) -> FetchTicket {
        self.active_word = None;
        self.store.clear();
        self.generation += 1;
        self.pending_generation = Some(self.generation);

        let tokens = self.tokenizer.tokenize(&passage.content_text);
        let estimate = self.estimator.estimate(&tokens, &self.config.estimator);
        let word_count = tokens.iter().filter(|t| t.is_word).count();
        tracing::debug!(
            passage_id = passage.id.as_str(),
            token_count = tokens.len(),
            word_count,
            generation = self.generation,
            "sync: loaded passage"
        );
        self.passage = Some(PassageView {
            id: passage.id.clone(),
            tokens,
            estimate,
            word_count,
        });

        FetchTicket {
            passage_id: passage.id.clone(),
            generation: self.generation,
        }
    }

    /// Drops the current passage; every output becomes empty.
    pub fn clear_passage(&mut self) {
        self.active_word = None;
        self.store.clear();
        self.generation += 1;
        self.pending_generation = None;
        self.passage = None;
    }

    /// Applies a finished alignment fetch. Returns `false` when the ticket is stale.
    pub fn apply_alignment(
        &mut self,
        ticket: &FetchTicket,
        result: Result<AlignmentPayload, SyncError>,
    ) -> bool {
        let is_current = self.pending_generation == Some(ticket.generation)
            && self.passage_id() == Some(ticket.passage_id.as_str());
        if !is_current {
            tracing::debug!(
                passage_id = ticket.passage_id.as_str(),
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "sync: discarded stale alignment response"
            );
            return false;
        }
        self.pending_generation = None;

        let payload = match result {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    passage_id = ticket.passage_id.as_str(),
                    error = %err,
                    "sync: alignment fetch failed; using estimated timing"
                );
                self.store.clear();
                return true;
            }
        };

        self.store_payload(&payload);
        tracing::info!(
            passage_id = ticket.passage_id.as_str(),
            source = self.store.source().as_str(),
            aligned_words = self.store.len(),
            rows_received = payload.word_timings.len(),
            segments_received = payload.segments.len(),
            "sync: alignment applied"
        );
        true
    }

    fn store_payload(&mut self, payload: &AlignmentPayload) {
        if payload.source == AlignmentSource::None {
            self.store.clear();
            return;
        }
        let word_count = self.word_count();
        if !payload.word_timings.is_empty() {
            self.store
                .set_rows(payload.source, &payload.word_timings, word_count);
        } else if !payload.segments.is_empty() {
            let derived = derive_word_timings(&payload.segments, &self.config.estimator);
            self.store
                .set_timings(AlignmentSource::SegmentDerived, derived, word_count);
        } else {
            self.store.clear();
        }
    }

    pub fn handle_event(&mut self, event: PlaybackEvent) -> SyncUpdate {
        match event {
            PlaybackEvent::Progress(clock)
            | PlaybackEvent::Seek(clock)
            | PlaybackEvent::Play(clock) => {
                let next = if self.follow { self.locate(&clock) } else { None };
                self.transition(next, false)
            }
            PlaybackEvent::Ended => self.transition(None, true),
        }
    }

    pub fn set_follow(&mut self, follow: bool) -> SyncUpdate {
        self.follow = follow;
        if follow {
            SyncUpdate {
                active_word: self.active_word,
                ..SyncUpdate::default()
            }
        } else {
            self.transition(None, false)
        }
    }

    fn transition(&mut self, next: Option<usize>, stop_practice_timer: bool) -> SyncUpdate {
        let changed = next != self.active_word;
        self.active_word = next;
        SyncUpdate {
            active_word: next,
            scroll_into_view: if changed { next } else { None },
            stop_practice_timer,
        }
    }

    /// Resolves a clock reading to a word position without touching engine state.
    pub fn locate(&self, clock: &ClockReading) -> Option<usize> {
        let passage = self.passage.as_ref()?;
        if !clock.elapsed.is_finite() || clock.elapsed < 0.0 {
            return None;
        }
        if self.store.source() != AlignmentSource::None && !self.store.is_empty() {
            return locate_word(clock.elapsed, self.store.timings());
        }

        let ratio = clock.progress_ratio()?;
        if passage.estimate.is_empty() {
            proportional_word(ratio, passage.word_count)
        } else {
            locate_word(ratio, &passage.estimate)
        }
    }

    pub fn quality(&self) -> SyncQuality {
        if self.pending_generation.is_some() {
            return SyncQuality::Aligning;
        }
        match (self.store.source(), self.store.is_empty()) {
            (AlignmentSource::WordLevel, false) => SyncQuality::Precise,
            (AlignmentSource::SegmentDerived, false) => SyncQuality::Approximate,
            _ => SyncQuality::Estimated,
        }
    }

    pub fn is_aligning(&self) -> bool {
        self.pending_generation.is_some()
    }

    pub fn passage_id(&self) -> Option<&str> {
        self.passage.as_ref().map(|p| p.id.as_str())
    }

    pub fn tokens(&self) -> &[TextToken] {
        self.passage
            .as_ref()
            .map(|p| p.tokens.as_slice())
            .unwrap_or(&[])
    }

    pub fn estimate(&self) -> &[EstimatedWordTiming] {
        self.passage
            .as_ref()
            .map(|p| p.estimate.as_slice())
            .unwrap_or(&[])
    }

    pub fn word_count(&self) -> usize {
        self.passage.as_ref().map_or(0, |p| p.word_count)
    }

    pub fn alignment(&self) -> &AlignmentStore {
        &self.store
    }

    pub fn aligned_word_count(&self) -> usize {
        self.store.len()
    }

    pub fn active_word(&self) -> Option<usize> {
        self.active_word
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}

/// Runs the provider for `ticket` and hands both back for [`SyncEngine::apply_alignment`].
pub async fn fetch_alignment<P: AlignmentProvider + ?Sized>(
    provider: &P,
    ticket: FetchTicket,
) -> (FetchTicket, Result<AlignmentPayload, SyncError>) {
    let result = provider.fetch(ticket.passage_id()).await;
    (ticket, result)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use futures::executor::block_on;

    use super::*;
    use crate::alignment::payload::{SegmentTiming, WordTimingRow};
    use crate::config::EstimatorConfig;
    use crate::pipeline::builder::SyncEngineBuilder;

    fn engine() -> SyncEngine {
        SyncEngineBuilder::new(SyncConfig::default()).build()
    }

    fn progress(elapsed: f64, duration: f64) -> PlaybackEvent {
        PlaybackEvent::Progress(ClockReading::new(elapsed, Some(duration)))
    }

    fn word_level_payload() -> AlignmentPayload {
        AlignmentPayload {
            source: AlignmentSource::WordLevel,
            word_timings: vec![
                WordTimingRow::new(0.0, "Hello", 0.0, 0.4),
                WordTimingRow::new(1.0, "world", 0.5, 0.9),
            ],
            segments: Vec::new(),
        }
    }

    #[test]
    fn fresh_engine_is_empty() {
        let mut engine = engine();
        assert!(engine.tokens().is_empty());
        assert_eq!(engine.passage_id(), None);
        assert_eq!(engine.quality(), SyncQuality::Estimated);
        assert_eq!(engine.handle_event(progress(1.0, 2.0)).active_word, None);
    }

    #[test]
    fn loading_passage_marks_aligning() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert_eq!(ticket.passage_id(), "p1");
        assert_eq!(engine.quality(), SyncQuality::Aligning);
        assert_eq!(engine.word_count(), 2);
        assert_eq!(engine.tokens().len(), 5);
        assert_eq!(engine.estimate().len(), 2);
    }

    #[test]
    fn word_level_timings_drive_active_word() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert!(engine.apply_alignment(&ticket, Ok(word_level_payload())));
        assert_eq!(engine.quality(), SyncQuality::Precise);
        assert_eq!(engine.aligned_word_count(), 2);

        let update = engine.handle_event(progress(0.45, 1.0));
        assert_eq!(update.active_word, Some(0));
        assert_eq!(update.scroll_into_view, Some(0));

        let update = engine.handle_event(progress(0.7, 1.0));
        assert_eq!(update.active_word, Some(1));
        assert_eq!(update.scroll_into_view, Some(1));

        let update = engine.handle_event(progress(0.75, 1.0));
        assert_eq!(update.active_word, Some(1));
        assert_eq!(update.scroll_into_view, None);
    }

    #[test]
    fn time_path_works_before_duration_is_known() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        engine.apply_alignment(&ticket, Ok(word_level_payload()));
        let update = engine.handle_event(PlaybackEvent::Play(ClockReading::new(0.6, None)));
        assert_eq!(update.active_word, Some(1));
    }

    #[test]
    fn estimate_drives_active_word_without_alignment() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert!(engine.apply_alignment(&ticket, Ok(AlignmentPayload::empty())));
        assert_eq!(engine.quality(), SyncQuality::Estimated);

        assert_eq!(engine.handle_event(progress(0.5, 2.0)).active_word, Some(0));
        assert_eq!(engine.handle_event(progress(1.5, 2.0)).active_word, Some(1));
        assert_eq!(engine.handle_event(progress(2.0, 2.0)).active_word, Some(1));
    }

    #[test]
    fn invalid_clock_readings_clear_active_word() {
        let mut engine = engine();
        engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert_eq!(engine.handle_event(progress(0.5, 2.0)).active_word, Some(0));

        let unknown = PlaybackEvent::Progress(ClockReading::new(0.5, None));
        assert_eq!(engine.handle_event(unknown).active_word, None);
        assert_eq!(engine.handle_event(progress(f64::NAN, 2.0)).active_word, None);
        assert_eq!(engine.handle_event(progress(-1.0, 2.0)).active_word, None);
        assert_eq!(engine.handle_event(progress(0.0, 0.0)).active_word, None);
        assert_eq!(engine.handle_event(progress(3.0, 2.0)).active_word, None);
    }

    #[test]
    fn negative_elapsed_is_rejected_on_time_path() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        engine.apply_alignment(&ticket, Ok(word_level_payload()));
        assert_eq!(engine.handle_event(progress(-0.1, 1.0)).active_word, None);
        assert_eq!(engine.handle_event(progress(f64::INFINITY, 1.0)).active_word, None);
    }

    #[test]
    fn ended_clears_and_stops_practice_timer() {
        let mut engine = engine();
        engine.load_passage(&Passage::new("p1", "Hello, world!"));
        engine.handle_event(progress(0.5, 2.0));
        let update = engine.handle_event(PlaybackEvent::Ended);
        assert_eq!(update.active_word, None);
        assert!(update.stop_practice_timer);
        assert_eq!(engine.active_word(), None);
    }

    #[test]
    fn follow_toggle_gates_highlighting() {
        let mut engine = engine();
        engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert_eq!(engine.handle_event(progress(0.5, 2.0)).active_word, Some(0));

        let update = engine.set_follow(false);
        assert_eq!(update.active_word, None);
        assert!(!engine.follow());
        assert_eq!(engine.handle_event(progress(1.5, 2.0)).active_word, None);

        engine.set_follow(true);
        let update = engine.handle_event(PlaybackEvent::Seek(ClockReading::new(1.5, Some(2.0))));
        assert_eq!(update.active_word, Some(1));
        assert_eq!(update.scroll_into_view, Some(1));
    }

    #[test]
    fn follow_default_comes_from_config() {
        let config = SyncConfig {
            follow_by_default: false,
            ..SyncConfig::default()
        };
        let mut engine = SyncEngineBuilder::new(config).build();
        assert!(!engine.config().follow_by_default);
        engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert!(!engine.follow());
        assert_eq!(engine.handle_event(progress(0.5, 2.0)).active_word, None);
    }

    #[test]
    fn quality_degrades_with_source() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        engine.apply_alignment(&ticket, Ok(word_level_payload()));
        assert_eq!(engine.quality(), SyncQuality::Precise);

        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        let mut payload = word_level_payload();
        payload.source = AlignmentSource::SegmentDerived;
        engine.apply_alignment(&ticket, Ok(payload));
        assert_eq!(engine.quality(), SyncQuality::Approximate);

        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        let mut payload = word_level_payload();
        payload.source = AlignmentSource::None;
        engine.apply_alignment(&ticket, Ok(payload));
        assert_eq!(engine.quality(), SyncQuality::Estimated);
        assert_eq!(engine.aligned_word_count(), 0);

        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        let mut payload = word_level_payload();
        payload.word_timings.clear();
        engine.apply_alignment(&ticket, Ok(payload));
        assert_eq!(engine.quality(), SyncQuality::Estimated);
    }

    #[test]
    fn failed_fetch_degrades_to_estimated() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert!(engine.apply_alignment(&ticket, Err(SyncError::fetch("p1", "timeout"))));
        assert_eq!(engine.quality(), SyncQuality::Estimated);
        assert_eq!(engine.handle_event(progress(1.5, 2.0)).active_word, Some(1));
    }

    #[test]
    fn stale_fetch_is_never_applied() {
        let mut engine = engine();
        let old_ticket = engine.load_passage(&Passage::new("old", "Hello, world!"));
        let new_ticket = engine.load_passage(&Passage::new("new", "Good morning, class."));

        assert!(!engine.apply_alignment(&old_ticket, Ok(word_level_payload())));
        assert_eq!(engine.quality(), SyncQuality::Aligning);
        assert_eq!(engine.alignment().source(), AlignmentSource::None);
        assert!(engine.alignment().is_empty());
        // Still on the estimate for the new passage.
        assert_eq!(engine.handle_event(progress(2.9, 3.0)).active_word, Some(2));

        assert!(engine.apply_alignment(&new_ticket, Ok(AlignmentPayload::empty())));
        assert_eq!(engine.quality(), SyncQuality::Estimated);
        assert!(!engine.apply_alignment(&new_ticket, Ok(word_level_payload())));
    }

    #[test]
    fn reloading_same_passage_invalidates_earlier_ticket() {
        let mut engine = engine();
        let first = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        let second = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        assert_ne!(first, second);
        assert!(!engine.apply_alignment(&first, Ok(word_level_payload())));
        assert!(engine.apply_alignment(&second, Ok(word_level_payload())));
    }

    #[test]
    fn passage_change_clears_state() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        engine.apply_alignment(&ticket, Ok(word_level_payload()));
        engine.handle_event(progress(0.2, 1.0));
        assert_eq!(engine.active_word(), Some(0));

        engine.load_passage(&Passage::new("p2", "Another text"));
        assert_eq!(engine.active_word(), None);
        assert!(engine.alignment().is_empty());
        assert_eq!(engine.alignment().source(), AlignmentSource::None);

        engine.clear_passage();
        assert!(engine.tokens().is_empty());
        assert_eq!(engine.quality(), SyncQuality::Estimated);
        assert!(!engine.apply_alignment(&ticket, Ok(word_level_payload())));
    }

    #[test]
    fn rows_beyond_word_count_are_ignored() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        let mut payload = word_level_payload();
        payload
            .word_timings
            .push(WordTimingRow::new(7.0, "extra", 1.0, 1.5));
        engine.apply_alignment(&ticket, Ok(payload));
        assert_eq!(engine.aligned_word_count(), 2);
        assert_eq!(engine.handle_event(progress(1.2, 2.0)).active_word, Some(1));
    }

    #[test]
    fn stray_early_row_keeps_the_rest_of_the_table() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "one two three four"));
        let payload = AlignmentPayload {
            source: AlignmentSource::WordLevel,
            word_timings: vec![
                WordTimingRow::new(999.0, "stray", 0.0, 0.1),
                WordTimingRow::new(0.0, "one", 0.2, 0.5),
                WordTimingRow::new(1.0, "two", 0.6, 1.0),
                WordTimingRow::new(2.0, "three", 1.1, 1.5),
                WordTimingRow::new(3.0, "four", 1.6, 2.0),
            ],
            segments: Vec::new(),
        };
        assert!(engine.is_aligning());
        engine.apply_alignment(&ticket, Ok(payload));
        assert!(!engine.is_aligning());
        assert_eq!(engine.aligned_word_count(), 4);
        assert_eq!(engine.quality(), SyncQuality::Precise);
        assert_eq!(engine.handle_event(progress(0.05, 2.0)).active_word, Some(0));
        assert_eq!(engine.handle_event(progress(1.7, 2.0)).active_word, Some(3));
    }

    #[test]
    fn segments_produce_approximate_alignment() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world! See you."));
        let payload = AlignmentPayload {
            source: AlignmentSource::SegmentDerived,
            word_timings: Vec::new(),
            segments: vec![
                SegmentTiming {
                    start: 0.0,
                    end: 1.0,
                    text: "Hello, world!".to_string(),
                },
                SegmentTiming {
                    start: 2.0,
                    end: 3.0,
                    text: "See you.".to_string(),
                },
            ],
        };
        engine.apply_alignment(&ticket, Ok(payload));
        assert_eq!(engine.quality(), SyncQuality::Approximate);
        assert_eq!(engine.aligned_word_count(), 4);
        assert_eq!(engine.handle_event(progress(0.1, 3.0)).active_word, Some(0));
        assert_eq!(engine.handle_event(progress(2.9, 3.0)).active_word, Some(3));
    }

    #[test]
    fn empty_passage_never_panics() {
        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("empty", ""));
        engine.apply_alignment(&ticket, Ok(word_level_payload()));
        assert_eq!(engine.word_count(), 0);
        assert_eq!(engine.aligned_word_count(), 0);
        assert_eq!(engine.handle_event(progress(0.5, 1.0)).active_word, None);
    }

    #[test]
    fn proportional_fallback_when_estimate_is_empty() {
        let config = SyncConfig {
            estimator: EstimatorConfig {
                base_weight: 0.0,
                per_char_weight: 0.0,
                max_weighted_chars: 0,
                sentence_pause_bonus: 0.0,
                clause_pause_bonus: 0.0,
            },
            follow_by_default: true,
        };
        let mut engine = SyncEngineBuilder::new(config).build();
        engine.load_passage(&Passage::new("p1", "one two three four"));
        assert!(engine.estimate().is_empty());
        assert_eq!(engine.handle_event(progress(0.0, 4.0)).active_word, Some(0));
        assert_eq!(engine.handle_event(progress(2.1, 4.0)).active_word, Some(2));
        assert_eq!(engine.handle_event(progress(4.0, 4.0)).active_word, Some(3));
    }

    struct FixedProvider {
        payloads: HashMap<String, String>,
    }

    #[async_trait]
    impl AlignmentProvider for FixedProvider {
        async fn fetch(&self, passage_id: &str) -> Result<AlignmentPayload, SyncError> {
            let body = self
                .payloads
                .get(passage_id)
                .ok_or_else(|| SyncError::fetch(passage_id, "404 not found"))?;
            AlignmentPayload::from_json_str(body)
        }
    }

    #[test]
    fn fetch_alignment_round_trip_through_provider() {
        let mut payloads = HashMap::new();
        payloads.insert(
            "p1".to_string(),
            r#"{"source":"word_level","word_timings":[{"index":0,"word":"Hello","start":0,"end":0.4}]}"#
                .to_string(),
        );
        let provider = FixedProvider { payloads };

        let mut engine = engine();
        let ticket = engine.load_passage(&Passage::new("p1", "Hello, world!"));
        let (ticket, result) = block_on(fetch_alignment(&provider, ticket));
        assert!(engine.apply_alignment(&ticket, result));
        assert_eq!(engine.quality(), SyncQuality::Precise);
        assert_eq!(engine.aligned_word_count(), 1);

        let ticket = engine.load_passage(&Passage::new("p2", "Nothing here"));
        let (ticket, result) = block_on(fetch_alignment(&provider, ticket));
        assert!(result.is_err());
        assert!(engine.apply_alignment(&ticket, result));
        assert_eq!(engine.quality(), SyncQuality::Estimated);
    }
}
