use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::types::AlignmentSource;

/// Alignment response as received from the payload collaborator, before validation.
///
/// Field values are kept as loosely typed as they arrive so that the store can drop
/// bad rows one by one instead of rejecting the whole response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentPayload {
    pub source: AlignmentSource,
    pub word_timings: Vec<WordTimingRow>,
    pub segments: Vec<SegmentTiming>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordTimingRow {
    pub index: Option<f64>,
    pub word: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl WordTimingRow {
    pub fn new(index: f64, word: &str, start: f64, end: f64) -> Self {
        Self {
            index: Some(index),
            word: Some(word.to_string()),
            start: Some(start),
            end: Some(end),
        }
    }
}

/// Sentence- or phrase-level timing used when word rows are unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTiming {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl AlignmentPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(data: &str) -> Result<Self, SyncError> {
        let value: Value =
            serde_json::from_str(data).map_err(|e| SyncError::json("parse alignment payload", e))?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, SyncError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SyncError::invalid_payload("expected a JSON object"))?;

        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .map(parse_source)
            .unwrap_or_default();

        let word_timings: Vec<WordTimingRow> = first_array(obj, &["word_timings", "words"])
            .map(|rows| rows.iter().map(parse_row).collect())
            .unwrap_or_default();

        let segments: Vec<SegmentTiming> = first_array(obj, &["segments"])
            .map(|rows| rows.iter().filter_map(parse_segment).collect())
            .unwrap_or_default();

        Ok(Self {
            source,
            word_timings,
            segments,
        })
    }
}

fn parse_source(raw: &str) -> AlignmentSource {
    match raw.trim().to_ascii_lowercase().as_str() {
        "word_level" | "word" | "words" => AlignmentSource::WordLevel,
        "segment_derived" | "segment" | "segments" => AlignmentSource::SegmentDerived,
        _ => AlignmentSource::None,
    }
}

fn first_array<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_array))
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_row(value: &Value) -> WordTimingRow {
    let Some(obj) = value.as_object() else {
        return WordTimingRow::default();
    };
    WordTimingRow {
        index: number_field(obj, "index"),
        word: obj.get("word").and_then(Value::as_str).map(str::to_string),
        start: number_field(obj, "start"),
        end: number_field(obj, "end"),
    }
}

fn parse_segment(value: &Value) -> Option<SegmentTiming> {
    let obj = value.as_object()?;
    let start = number_field(obj, "start")?;
    let end = number_field(obj, "end")?;
    let text = obj.get("text").and_then(Value::as_str)?;
    if !start.is_finite() || !end.is_finite() || end <= start {
        return None;
    }
    Some(SegmentTiming {
        start,
        end,
        text: text.to_string(),
    })
}
