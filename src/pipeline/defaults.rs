use crate::alignment::estimation::estimate_word_timings;
use crate::alignment::tokenization::tokenize_passage;
use crate::config::EstimatorConfig;
use crate::pipeline::traits::{DurationEstimator, Tokenizer};
use crate::types::{EstimatedWordTiming, TextToken};

pub struct WordRunTokenizer;

impl Tokenizer for WordRunTokenizer {
    fn tokenize(&self, text: &str) -> Vec<TextToken> {
        tokenize_passage(text)
    }
}

pub struct WeightedDurationEstimator;

impl DurationEstimator for WeightedDurationEstimator {
    fn estimate(
        &self,
        tokens: &[TextToken],
        config: &EstimatorConfig,
    ) -> Vec<EstimatedWordTiming> {
        estimate_word_timings(tokens, config)
    }
}
