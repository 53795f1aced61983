//! An uncertain time interval flagged by the confidence analyzer.

use super::Word;
use serde::{Deserialize, Serialize};

/// A contiguous, low-confidence time interval queued for re-transcription
/// and arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncertainSegment {
    /// Start time in milliseconds, inclusive.
    pub start_ms: u64,

    /// End time in milliseconds, inclusive.
    pub end_ms: u64,

    /// The contiguous low-confidence words from the primary result.
    pub original_words: Vec<Word>,

    /// Average confidence of `original_words`.
    pub average_confidence: f32,

    /// Up to `K` words of primary-transcript text preceding the segment.
    pub context_before: String,

    /// Up to `K` words of primary-transcript text following the segment.
    pub context_after: String,
}

impl UncertainSegment {
    /// Duration of the segment in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Concatenated text of `original_words`.
    pub fn original_text(&self) -> String {
        super::transcription::join_words(&self.original_words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(text: &str, start: u64, end: u64, conf: f32) -> Word {
        Word::new(text, start, end, conf, None).unwrap()
    }

    #[test]
    fn duration_and_text_are_derived() {
        let segment = UncertainSegment {
            start_ms: 500,
            end_ms: 2000,
            original_words: vec![w("the", 500, 800, 0.3), w("patient", 800, 2000, 0.4)],
            average_confidence: 0.35,
            context_before: "hello".into(),
            context_after: "is sick".into(),
        };
        assert_eq!(segment.duration_ms(), 1500);
        assert_eq!(segment.original_text(), "the patient");
    }
}
