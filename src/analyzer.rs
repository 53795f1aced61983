//! Identifies low-confidence stretches of a primary transcript for
//! re-transcription and arbitration.
//!
//! Ported from `confidence_analyzer.py`: group consecutive low-confidence
//! words, discard short runs, attach context, merge nearby groups, split
//! long ones along word boundaries.

use crate::config::OrchestratorConfig;
use crate::model::{TranscriptionResult, UncertainSegment, Word};
use serde::{Deserialize, Serialize};

/// Confidence distribution over a transcript, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceStatistics {
    /// Total word count.
    pub total_words: usize,
    /// Words below the configured threshold.
    pub low_confidence_words: usize,
    /// `low_confidence_words / total_words * 100`, or `0.0` if empty.
    pub low_confidence_percentage: f32,
    /// Mean confidence across all words.
    pub average_confidence: f32,
    /// Minimum word confidence.
    pub min_confidence: f32,
    /// Maximum word confidence.
    pub max_confidence: f32,
    /// The threshold statistics were computed against.
    pub confidence_threshold: f32,
}

/// Scans a transcript for uncertain regions according to an
/// [`OrchestratorConfig`]'s thresholds.
pub struct ConfidenceAnalyzer {
    confidence_threshold: f32,
    min_segment_duration_ms: u64,
    max_segment_duration_ms: u64,
    context_window_words: usize,
    merge_gap_ms: u64,
}

impl ConfidenceAnalyzer {
    /// Build an analyzer from orchestrator configuration.
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            min_segment_duration_ms: config.min_segment_ms,
            max_segment_duration_ms: config.max_segment_ms,
            context_window_words: config.context_window_words,
            merge_gap_ms: config.merge_gap_ms,
        }
    }

    /// Group consecutive low-confidence words into [`UncertainSegment`]s,
    /// discard runs shorter than `min_segment_duration_ms`, merge runs
    /// separated by a small gap, and split runs longer than
    /// `max_segment_duration_ms`.
    pub fn identify_uncertain_segments(
        &self,
        transcription: &TranscriptionResult,
    ) -> Vec<UncertainSegment> {
        let mut segments = Vec::new();
        let mut current: Vec<Word> = Vec::new();

        for word in &transcription.words {
            if word.confidence < self.confidence_threshold {
                current.push(word.clone());
            } else if !current.is_empty() {
                if let Some(segment) = self.create_segment(&current, transcription) {
                    segments.push(segment);
                }
                current.clear();
            }
        }
        if !current.is_empty() {
            if let Some(segment) = self.create_segment(&current, transcription) {
                segments.push(segment);
            }
        }

        let segments = self.merge_adjacent_segments(segments);
        self.split_long_segments(segments)
    }

    /// Confidence distribution over the whole transcript.
    pub fn statistics(&self, transcription: &TranscriptionResult) -> ConfidenceStatistics {
        if transcription.words.is_empty() {
            return ConfidenceStatistics {
                total_words: 0,
                low_confidence_words: 0,
                low_confidence_percentage: 0.0,
                average_confidence: 0.0,
                min_confidence: 0.0,
                max_confidence: 0.0,
                confidence_threshold: self.confidence_threshold,
            };
        }

        let confidences: Vec<f32> = transcription.words.iter().map(|w| w.confidence).collect();
        let low_count = confidences
            .iter()
            .filter(|&&c| c < self.confidence_threshold)
            .count();
        let total = confidences.len();
        let sum: f32 = confidences.iter().sum();
        let min = confidences.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = confidences
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);

        ConfidenceStatistics {
            total_words: total,
            low_confidence_words: low_count,
            low_confidence_percentage: (low_count as f32 / total as f32) * 100.0,
            average_confidence: sum / total as f32,
            min_confidence: min,
            max_confidence: max,
            confidence_threshold: self.confidence_threshold,
        }
    }

    fn create_segment(
        &self,
        words: &[Word],
        transcription: &TranscriptionResult,
    ) -> Option<UncertainSegment> {
        let first = words.first()?;
        let last = words.last()?;
        let start_ms = first.start_ms;
        let end_ms = last.end_ms;

        if end_ms - start_ms < self.min_segment_duration_ms {
            return None;
        }

        let average_confidence =
            words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
        let context_before = transcription.context_before(start_ms, self.context_window_words);
        let context_after = transcription.context_after(end_ms, self.context_window_words);

        Some(UncertainSegment {
            start_ms,
            end_ms,
            original_words: words.to_vec(),
            average_confidence,
            context_before,
            context_after,
        })
    }

    fn merge_adjacent_segments(&self, segments: Vec<UncertainSegment>) -> Vec<UncertainSegment> {
        let mut merged: Vec<UncertainSegment> = Vec::new();

        for segment in segments {
            match merged.last_mut() {
                Some(last) if segment.start_ms.saturating_sub(last.end_ms) <= self.merge_gap_ms => {
                    let last_count = last.original_words.len();
                    let next_count = segment.original_words.len();
                    let total = last_count + next_count;

                    last.end_ms = segment.end_ms;
                    last.average_confidence = (last.average_confidence * last_count as f32
                        + segment.average_confidence * next_count as f32)
                        / total as f32;
                    last.original_words.extend(segment.original_words);
                    last.context_after = segment.context_after;
                }
                _ => merged.push(segment),
            }
        }

        merged
    }

    fn split_long_segments(&self, segments: Vec<UncertainSegment>) -> Vec<UncertainSegment> {
        let mut result = Vec::new();

        for segment in segments {
            if segment.end_ms - segment.start_ms <= self.max_segment_duration_ms {
                result.push(segment);
                continue;
            }

            let mut chunk: Vec<Word> = Vec::new();
            let mut chunk_start_ms = segment
                .original_words
                .first()
                .map(|w| w.start_ms)
                .unwrap_or(segment.start_ms);

            for word in &segment.original_words {
                chunk.push(word.clone());
                if word.end_ms - chunk_start_ms >= self.max_segment_duration_ms {
                    result.push(chunk_segment(&chunk, chunk_start_ms, &segment));
                    chunk_start_ms = word.end_ms;
                    chunk = Vec::new();
                }
            }
            if !chunk.is_empty() {
                result.push(chunk_segment(&chunk, chunk_start_ms, &segment));
            }
        }

        result
    }
}

fn chunk_segment(chunk: &[Word], chunk_start_ms: u64, parent: &UncertainSegment) -> UncertainSegment {
    let avg_confidence = chunk.iter().map(|w| w.confidence).sum::<f32>() / chunk.len() as f32;
    UncertainSegment {
        start_ms: chunk_start_ms,
        end_ms: chunk.last().map(|w| w.end_ms).unwrap_or(chunk_start_ms),
        original_words: chunk.to_vec(),
        average_confidence: avg_confidence,
        context_before: parent.context_before.clone(),
        context_after: parent.context_after.clone(),
    }
}

/// Normalize transcript text: collapse whitespace, tighten punctuation
/// spacing, capitalize the first letter. Ported from
/// `text_utils.py::clean_transcription_text`.
pub fn clean_transcription_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut tightened = String::with_capacity(collapsed.len());
    let chars: Vec<char> = collapsed.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ' ' {
            // Skip whitespace directly before sentence punctuation.
            if let Some(&next) = chars.get(i + 1) {
                if is_sentence_punct(next) {
                    i += 1;
                    continue;
                }
            }
        }
        tightened.push(c);
        i += 1;
    }

    let mut spaced = String::with_capacity(tightened.len());
    let tchars: Vec<char> = tightened.chars().collect();
    let mut i = 0;
    while i < tchars.len() {
        let c = tchars[i];
        spaced.push(c);
        if is_sentence_punct(c) {
            // Skip any whitespace already present, then ensure exactly one
            // space before an uppercase letter that follows.
            let mut j = i + 1;
            while tchars.get(j) == Some(&' ') {
                j += 1;
            }
            if let Some(&next) = tchars.get(j) {
                if next.is_uppercase() {
                    spaced.push(' ');
                    i = j;
                    continue;
                }
            }
        }
        i += 1;
    }

    let trimmed = spaced.trim();
    let mut result = String::with_capacity(trimmed.len());
    let mut chars = trimmed.chars();
    if let Some(first) = chars.next() {
        result.extend(first.to_uppercase());
        result.push_str(chars.as_str());
    }
    result
}

fn is_sentence_punct(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(text: &str, start: u64, end: u64, conf: f32) -> Word {
        Word::new(text, start, end, conf, None).unwrap()
    }

    fn analyzer(cfg: OrchestratorConfig) -> ConfidenceAnalyzer {
        ConfidenceAnalyzer::new(&cfg)
    }

    #[test]
    fn groups_consecutive_low_confidence_words() {
        let cfg = OrchestratorConfig::default().with_confidence_threshold(0.75);
        let a = analyzer(cfg);
        let transcription = TranscriptionResult::from_words(
            vec![
                w("the", 0, 200, 0.9),
                w("blud", 200, 700, 0.4),
                w("presha", 700, 1300, 0.3),
                w("is", 1300, 1500, 0.95),
            ],
            1500,
            "en",
            "test",
        );
        let segments = a.identify_uncertain_segments(&transcription);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_ms, 200);
        assert_eq!(segments[0].end_ms, 1300);
        assert_eq!(segments[0].original_text(), "blud presha");
    }

    #[test]
    fn discards_segments_shorter_than_minimum() {
        let cfg = OrchestratorConfig::default()
            .with_confidence_threshold(0.75)
            .with_segment_bounds(1_000, 10_000);
        let a = analyzer(cfg);
        let transcription = TranscriptionResult::from_words(
            vec![w("um", 0, 100, 0.3)],
            100,
            "en",
            "test",
        );
        assert!(a.identify_uncertain_segments(&transcription).is_empty());
    }

    #[test]
    fn merges_segments_within_gap_threshold() {
        let mut cfg = OrchestratorConfig::default().with_confidence_threshold(0.75);
        cfg.merge_gap_ms = 1_000;
        cfg.min_segment_ms = 0;
        let a = analyzer(cfg);
        let transcription = TranscriptionResult::from_words(
            vec![
                w("one", 0, 600, 0.3),
                w("two", 600, 1100, 0.9),
                w("three", 1100, 1800, 0.3),
            ],
            1800,
            "en",
            "test",
        );
        let segments = a.identify_uncertain_segments(&transcription);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_ms, 0);
        assert_eq!(segments[0].end_ms, 1800);
    }

    #[test]
    fn splits_segments_longer_than_maximum() {
        let mut cfg = OrchestratorConfig::default().with_confidence_threshold(0.75);
        cfg.min_segment_ms = 0;
        cfg.max_segment_ms = 1_000;
        let a = analyzer(cfg);
        let words: Vec<Word> = (0..10)
            .map(|i| w(&format!("w{i}"), i * 500, (i + 1) * 500, 0.3))
            .collect();
        let duration = words.last().unwrap().end_ms;
        let transcription = TranscriptionResult::from_words(words, duration, "en", "test");
        let segments = a.identify_uncertain_segments(&transcription);
        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.end_ms - segment.start_ms <= 1_000);
        }
    }

    #[test]
    fn statistics_match_known_distribution() {
        let cfg = OrchestratorConfig::default().with_confidence_threshold(0.5);
        let a = analyzer(cfg);
        let transcription = TranscriptionResult::from_words(
            vec![
                w("a", 0, 100, 0.9),
                w("b", 100, 200, 0.4),
                w("c", 200, 300, 0.2),
            ],
            300,
            "en",
            "test",
        );
        let stats = a.statistics(&transcription);
        assert_eq!(stats.total_words, 3);
        assert_eq!(stats.low_confidence_words, 2);
        assert!((stats.low_confidence_percentage - 66.666_664).abs() < 0.01);
        assert_eq!(stats.min_confidence, 0.2);
        assert_eq!(stats.max_confidence, 0.9);
    }

    #[test]
    fn empty_transcript_yields_zeroed_statistics() {
        let cfg = OrchestratorConfig::default();
        let a = analyzer(cfg);
        let transcription = TranscriptionResult::from_words(vec![], 0, "en", "test");
        let stats = a.statistics(&transcription);
        assert_eq!(stats.total_words, 0);
        assert_eq!(stats.average_confidence, 0.0);
    }

    #[test]
    fn clean_text_collapses_whitespace_and_capitalizes() {
        let cleaned = clean_transcription_text("  the  patient  has a  fever .He needs rest");
        assert_eq!(cleaned, "The patient has a fever. He needs rest");
    }

    #[test]
    fn clean_text_leaves_lowercase_after_punctuation_untouched() {
        // Mirrors the original's regex, which only inserts a space when the
        // following letter is already uppercase.
        let cleaned = clean_transcription_text("fever .he needs rest");
        assert_eq!(cleaned, "Fever.he needs rest");
    }
}
