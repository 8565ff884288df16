use async_trait::async_trait;

use crate::alignment::payload::AlignmentPayload;
use crate::config::EstimatorConfig;
use crate::error::SyncError;
use crate::types::{EstimatedWordTiming, TextToken};

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<TextToken>;
}

pub trait DurationEstimator: Send + Sync {
    fn estimate(&self, tokens: &[TextToken], config: &EstimatorConfig)
        -> Vec<EstimatedWordTiming>;
}

/// Collaborator that fetches the alignment payload for a passage.
#[async_trait]
pub trait AlignmentProvider: Send + Sync {
    async fn fetch(&self, passage_id: &str) -> Result<AlignmentPayload, SyncError>;
}
