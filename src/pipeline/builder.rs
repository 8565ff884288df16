use std::path::Path;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::pipeline::defaults::{WeightedDurationEstimator, WordRunTokenizer};
use crate::pipeline::runtime::{SyncEngine, SyncEngineParts};
use crate::pipeline::traits::{DurationEstimator, Tokenizer};

pub struct SyncEngineBuilder {
    config: SyncConfig,
    follow: Option<bool>,
    tokenizer: Option<Box<dyn Tokenizer>>,
    estimator: Option<Box<dyn DurationEstimator>>,
}

impl SyncEngineBuilder {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            follow: None,
            tokenizer: None,
            estimator: None,
        }
    }

    pub fn from_config_path(path: &Path) -> Result<Self, SyncError> {
        Ok(Self::new(SyncConfig::load(path)?))
    }

    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = Some(follow);
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn with_estimator(mut self, estimator: Box<dyn DurationEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn build(self) -> SyncEngine {
        let follow = self.follow.unwrap_or(self.config.follow_by_default);
        SyncEngine::from_parts(SyncEngineParts {
            config: self.config,
            tokenizer: self
                .tokenizer
                .unwrap_or_else(|| Box::new(WordRunTokenizer)),
            estimator: self
                .estimator
                .unwrap_or_else(|| Box::new(WeightedDurationEstimator)),
            follow,
        })
    }
}

impl Default for SyncEngineBuilder {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}
