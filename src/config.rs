use std::path::Path;

use serde::Deserialize;

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub estimator: EstimatorConfig,
    /// Initial state of the "follow" toggle for a new engine.
    pub follow_by_default: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            follow_by_default: true,
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| SyncError::io("read sync config", e))?;
        serde_json::from_str(&data).map_err(|e| SyncError::json("parse sync config", e))
    }
}

/// Weights used when no alignment is available and word durations are estimated from text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub base_weight: f64,
    pub per_char_weight: f64,
    /// Characters beyond this count add no extra weight.
    pub max_weighted_chars: usize,
    /// Bonus when the next non-whitespace token is `. , ! ?`.
    pub sentence_pause_bonus: f64,
    /// Bonus when the next non-whitespace token is `; :`.
    pub clause_pause_bonus: f64,
}

impl EstimatorConfig {
    pub const DEFAULT_BASE_WEIGHT: f64 = 1.0;
    pub const DEFAULT_PER_CHAR_WEIGHT: f64 = 0.06;
    pub const DEFAULT_MAX_WEIGHTED_CHARS: usize = 12;
    pub const DEFAULT_SENTENCE_PAUSE_BONUS: f64 = 0.55;
    pub const DEFAULT_CLAUSE_PAUSE_BONUS: f64 = 0.30;
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            base_weight: Self::DEFAULT_BASE_WEIGHT,
            per_char_weight: Self::DEFAULT_PER_CHAR_WEIGHT,
            max_weighted_chars: Self::DEFAULT_MAX_WEIGHTED_CHARS,
            sentence_pause_bonus: Self::DEFAULT_SENTENCE_PAUSE_BONUS,
            clause_pause_bonus: Self::DEFAULT_CLAUSE_PAUSE_BONUS,
        }
    }
}
