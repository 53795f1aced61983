//! The full output of one transcription pass, from one model.

use super::Word;
use serde::{Deserialize, Serialize};

/// A fully transcribed artifact: ordered words plus derived aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Concatenation of word texts, single-space separated.
    pub full_text: String,

    /// Ordered, time-monotonic words.
    pub words: Vec<Word>,

    /// Arithmetic mean of word confidences, or 0.0 if empty.
    pub overall_confidence: f32,

    /// Total audio duration in milliseconds.
    pub duration_ms: u64,

    /// Detected or requested language.
    pub language: String,

    /// Identifier of the model that produced this result.
    pub model_name: String,

    /// Raw provider response, retained for debugging only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl TranscriptionResult {
    /// Build a result from words, deriving `full_text` and `overall_confidence`.
    pub fn from_words(
        words: Vec<Word>,
        duration_ms: u64,
        language: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        let full_text = join_words(&words);
        let overall_confidence = mean_confidence(&words);
        Self {
            full_text,
            words,
            overall_confidence,
            duration_ms,
            language: language.into(),
            model_name: model_name.into(),
            raw_response: None,
        }
    }

    /// Attach the raw provider response for debugging.
    pub fn with_raw_response(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }

    /// Total number of words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// All words whose span lies entirely within `[start_ms, end_ms]`.
    pub fn words_in_range(&self, start_ms: u64, end_ms: u64) -> Vec<&Word> {
        self.words
            .iter()
            .filter(|w| w.start_ms >= start_ms && w.end_ms <= end_ms)
            .collect()
    }

    /// Concatenated text of the words in `[start_ms, end_ms]`.
    pub fn text_in_range(&self, start_ms: u64, end_ms: u64) -> String {
        self.words_in_range(start_ms, end_ms)
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Up to `word_count` words ending at or before `position_ms`.
    pub fn context_before(&self, position_ms: u64, word_count: usize) -> String {
        let before: Vec<&Word> = self
            .words
            .iter()
            .filter(|w| w.end_ms <= position_ms)
            .collect();
        let start = before.len().saturating_sub(word_count);
        before[start..]
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Up to `word_count` words starting at or after `position_ms`.
    pub fn context_after(&self, position_ms: u64, word_count: usize) -> String {
        self.words
            .iter()
            .filter(|w| w.start_ms >= position_ms)
            .take(word_count)
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether `words` is monotonic: for all consecutive pairs,
    /// `wi.end_ms <= wi+1.start_ms`.
    pub fn is_monotonic(&self) -> bool {
        self.words
            .windows(2)
            .all(|pair| pair[0].end_ms <= pair[1].start_ms)
    }
}

pub(crate) fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn mean_confidence(words: &[Word]) -> f32 {
    if words.is_empty() {
        return 0.0;
    }
    words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(text: &str, start: u64, end: u64, conf: f32) -> Word {
        Word::new(text, start, end, conf, None).unwrap()
    }

    #[test]
    fn from_words_derives_full_text_and_confidence() {
        let words = vec![w("hello", 0, 100, 0.9), w("world", 100, 200, 0.8)];
        let result = TranscriptionResult::from_words(words, 200, "en", "test");
        assert_eq!(result.full_text, "hello world");
        assert!((result.overall_confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn empty_words_yield_zero_confidence() {
        let result = TranscriptionResult::from_words(vec![], 0, "en", "test");
        assert_eq!(result.overall_confidence, 0.0);
        assert_eq!(result.full_text, "");
    }

    #[test]
    fn context_before_and_after_respect_word_count() {
        let words = vec![
            w("a", 0, 100, 0.9),
            w("b", 100, 200, 0.9),
            w("c", 200, 300, 0.9),
            w("d", 300, 400, 0.9),
        ];
        let result = TranscriptionResult::from_words(words, 400, "en", "test");
        assert_eq!(result.context_before(300, 2), "b c");
        assert_eq!(result.context_after(200, 1), "c");
    }

    #[test]
    fn detects_non_monotonic_words() {
        let words = vec![w("a", 0, 200, 0.9), w("b", 100, 300, 0.9)];
        let result = TranscriptionResult::from_words(words, 300, "en", "test");
        assert!(!result.is_monotonic());
    }
}
