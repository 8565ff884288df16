pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use alignment::locator::{locate_word, proportional_word, TimedInterval};
pub use alignment::payload::{AlignmentPayload, SegmentTiming, WordTimingRow};
pub use alignment::report::{build_timeline_report, TimelineReport, TimelineSample};
pub use alignment::store::AlignmentStore;
pub use config::{EstimatorConfig, SyncConfig};
pub use error::SyncError;
pub use pipeline::builder::SyncEngineBuilder;
pub use pipeline::runtime::{fetch_alignment, FetchTicket, SyncEngine};
pub use pipeline::traits::{AlignmentProvider, DurationEstimator, Tokenizer};
pub use types::{
    AlignmentSource, AudioWordTiming, ClockReading, EstimatedWordTiming, Passage, PlaybackEvent,
    SyncQuality, SyncUpdate, TextToken,
};
