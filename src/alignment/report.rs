use std::collections::HashSet;

use serde::Serialize;

use crate::error::SyncError;
use crate::pipeline::runtime::SyncEngine;
use crate::types::{AlignmentSource, ClockReading, PlaybackEvent, SyncQuality};

const SCHEMA_VERSION: u32 = 1;
const MAX_SAMPLES: usize = 1_000_000;

#[derive(Debug, Clone, Serialize)]
pub struct TimelineReport {
    pub schema_version: u32,
    pub meta: TimelineMeta,
    pub samples: Vec<TimelineSample>,
    pub aggregates: TimelineAggregates,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineMeta {
    pub generated_at: String,
    pub passage_id: String,
    pub source: AlignmentSource,
    pub quality: SyncQuality,
    pub word_count: usize,
    pub aligned_word_count: usize,
    pub duration_sec: f64,
    pub step_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSample {
    pub time_sec: f64,
    pub active_word: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineAggregates {
    pub sample_count: usize,
    pub unresolved_sample_count: usize,
    pub distinct_word_count: usize,
    /// Share of the passage's words that were active in at least one sample.
    pub word_coverage_ratio: f32,
    /// Samples whose active word precedes the previous sample's.
    pub backward_step_count: u32,
}

/// Plays the loaded passage through the engine at a fixed step and records each active word.
pub fn sample_timeline(
    engine: &mut SyncEngine,
    duration_sec: f64,
    step_sec: f64,
) -> Result<Vec<TimelineSample>, SyncError> {
    if !duration_sec.is_finite() || duration_sec <= 0.0 {
        return Err(SyncError::invalid_input(format!(
            "duration must be a positive number of seconds, got {duration_sec}"
        )));
    }
    if !step_sec.is_finite() || step_sec <= 0.0 {
        return Err(SyncError::invalid_input(format!(
            "step must be a positive number of seconds, got {step_sec}"
        )));
    }

    let steps = (duration_sec / step_sec).floor();
    if steps >= MAX_SAMPLES as f64 {
        return Err(SyncError::invalid_input(format!(
            "step {step_sec}s over {duration_sec}s needs more than {MAX_SAMPLES} samples"
        )));
    }
    let sample_count = steps as usize + 1;
    let mut samples = Vec::with_capacity(sample_count);
    for i in 0..sample_count {
        let time_sec = (i as f64 * step_sec).min(duration_sec);
        let clock = ClockReading::new(time_sec, Some(duration_sec));
        let event = if i == 0 {
            PlaybackEvent::Play(clock)
        } else {
            PlaybackEvent::Progress(clock)
        };
        let active_word = engine.handle_event(event).active_word;
        samples.push(TimelineSample {
            time_sec,
            active_word,
            word: active_word.and_then(|pos| word_text(engine, pos)),
        });
    }
    engine.handle_event(PlaybackEvent::Ended);
    Ok(samples)
}

fn word_text(engine: &SyncEngine, position: usize) -> Option<String> {
    engine
        .tokens()
        .iter()
        .find(|t| t.word_position == Some(position))
        .map(|t| t.raw.clone())
}

pub fn aggregate_samples(samples: &[TimelineSample], word_count: usize) -> TimelineAggregates {
    let distinct: HashSet<usize> = samples.iter().filter_map(|s| s.active_word).collect();
    let mut backward_step_count = 0u32;
    let mut previous: Option<usize> = None;
    for current in samples.iter().filter_map(|s| s.active_word) {
        if previous.is_some_and(|prev| current < prev) {
            backward_step_count += 1;
        }
        previous = Some(current);
    }

    TimelineAggregates {
        sample_count: samples.len(),
        unresolved_sample_count: samples.iter().filter(|s| s.active_word.is_none()).count(),
        distinct_word_count: distinct.len(),
        word_coverage_ratio: if word_count == 0 {
            0.0
        } else {
            distinct.len() as f32 / word_count as f32
        },
        backward_step_count,
    }
}

pub fn build_timeline_report(
    engine: &mut SyncEngine,
    duration_sec: f64,
    step_sec: f64,
    generated_at: String,
) -> Result<TimelineReport, SyncError> {
    let samples = sample_timeline(engine, duration_sec, step_sec)?;
    let aggregates = aggregate_samples(&samples, engine.word_count());
    Ok(TimelineReport {
        schema_version: SCHEMA_VERSION,
        meta: TimelineMeta {
            generated_at,
            passage_id: engine.passage_id().unwrap_or_default().to_string(),
            source: engine.alignment().source(),
            quality: engine.quality(),
            word_count: engine.word_count(),
            aligned_word_count: engine.aligned_word_count(),
            duration_sec,
            step_sec,
        },
        samples,
        aggregates,
    })
}
