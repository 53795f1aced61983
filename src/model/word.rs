//! A single transcribed word with timing, confidence and speaker metadata.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A transcribed token with timestamps, confidence and an optional speaker tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The transcribed word text. Non-empty, no internal whitespace.
    pub text: String,

    /// Start time in milliseconds, relative to the original audio.
    pub start_ms: u64,

    /// End time in milliseconds, relative to the original audio.
    pub end_ms: u64,

    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f32,

    /// Speaker identifier, if diarization was enabled.
    pub speaker: Option<String>,
}

impl Word {
    /// Construct a word, validating the invariants spec.md places on it.
    pub fn new(
        text: impl Into<String>,
        start_ms: u64,
        end_ms: u64,
        confidence: f32,
        speaker: Option<String>,
    ) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(Error::InvalidAudio("word text must not be empty".into()));
        }
        if text.chars().any(char::is_whitespace) {
            return Err(Error::InvalidAudio(format!(
                "word text must not contain whitespace: {text:?}"
            )));
        }
        if start_ms > end_ms {
            return Err(Error::InvalidAudio(format!(
                "word start_ms ({start_ms}) must be <= end_ms ({end_ms})"
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidAudio(format!(
                "word confidence ({confidence}) must be in [0.0, 1.0]"
            )));
        }
        Ok(Self {
            text,
            start_ms,
            end_ms,
            confidence,
            speaker,
        })
    }

    /// Duration of the word in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Whether this word's confidence falls below `threshold`.
    pub fn is_low_confidence(&self, threshold: f32) -> bool {
        self.confidence < threshold
    }

    /// Return a copy of this word with its timestamps shifted forward by
    /// `offset_ms`. Used to re-anchor segment-local timestamps back onto
    /// the original audio's timeline.
    pub fn shifted_by(&self, offset_ms: u64) -> Self {
        Self {
            text: self.text.clone(),
            start_ms: self.start_ms + offset_ms,
            end_ms: self.end_ms + offset_ms,
            confidence: self.confidence,
            speaker: self.speaker.clone(),
        }
    }

    /// Return a copy of this word with its confidence overwritten.
    pub fn with_confidence(&self, confidence: f32) -> Self {
        Self {
            text: self.text.clone(),
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            confidence,
            speaker: self.speaker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_text() {
        assert!(Word::new("", 0, 100, 0.9, None).is_err());
    }

    #[test]
    fn rejects_internal_whitespace() {
        assert!(Word::new("two words", 0, 100, 0.9, None).is_err());
    }

    #[test]
    fn rejects_inverted_timestamps() {
        assert!(Word::new("ok", 100, 50, 0.9, None).is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(Word::new("ok", 0, 100, 1.5, None).is_err());
        assert!(Word::new("ok", 0, 100, -0.1, None).is_err());
    }

    #[test]
    fn shifted_by_preserves_duration() {
        let w = Word::new("hi", 100, 300, 0.9, None).unwrap();
        let shifted = w.shifted_by(1_000);
        assert_eq!(shifted.start_ms, 1_100);
        assert_eq!(shifted.end_ms, 1_300);
        assert_eq!(shifted.duration_ms(), w.duration_ms());
    }
}
