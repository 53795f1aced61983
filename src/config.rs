//! Configuration for the transcription orchestrator.

use serde::{Deserialize, Serialize};

/// Tunables for confidence analysis, segment arbitration and merge behavior.
///
/// Field names mirror the configuration surface named in the design: every
/// value here has a corresponding environment variable of the same name,
/// upper-cased, for use by [`OrchestratorConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    /// Word-level confidence cutoff below which a word is "uncertain".
    pub confidence_threshold: f32,

    /// Discard uncertainty groups shorter than this.
    pub min_segment_ms: u64,

    /// Force-split uncertainty groups longer than this.
    pub max_segment_ms: u64,

    /// Number of context words gathered before/after a segment for the judge.
    pub context_window_words: usize,

    /// Merge adjacent uncertain groups separated by a gap no larger than this.
    pub merge_gap_ms: u64,

    /// Padding applied on each side of a segment before extraction.
    pub segment_padding_ms: u64,

    /// Identifier of the provider used for the full-file primary pass.
    ///
    /// This is a plain configuration key into the provider map, not a guess
    /// at which vendor model string is "right" — see the primary provider
    /// identifier note in DESIGN.md.
    pub primary_provider: String,

    /// Upper bound on segments arbitrated concurrently (spec's reference
    /// design uses 1, i.e. strictly sequential).
    pub max_concurrent_segments: usize,

    /// Deadline applied to every provider/judge call.
    pub call_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            min_segment_ms: 500,
            max_segment_ms: 10_000,
            context_window_words: 50,
            merge_gap_ms: 1_000,
            segment_padding_ms: 100,
            primary_provider: "deepgram".to_string(),
            max_concurrent_segments: 1,
            call_timeout_ms: 30_000,
        }
    }
}

impl OrchestratorConfig {
    /// Set the confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the minimum and maximum segment duration.
    pub fn with_segment_bounds(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_segment_ms = min_ms;
        self.max_segment_ms = max_ms;
        self
    }

    /// Set the primary provider identifier.
    pub fn with_primary_provider(mut self, provider: impl Into<String>) -> Self {
        self.primary_provider = provider.into();
        self
    }

    /// Allow bounded inter-segment parallelism.
    pub fn with_max_concurrent_segments(mut self, n: usize) -> Self {
        self.max_concurrent_segments = n.max(1);
        self
    }

    /// Build a configuration from environment variables, falling back to
    /// [`Default::default`] for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            confidence_threshold: env_f32("CONFIDENCE_THRESHOLD", defaults.confidence_threshold),
            min_segment_ms: env_u64("MIN_SEGMENT_MS", defaults.min_segment_ms),
            max_segment_ms: env_u64("MAX_SEGMENT_MS", defaults.max_segment_ms),
            context_window_words: env_usize(
                "CONTEXT_WINDOW_WORDS",
                defaults.context_window_words,
            ),
            merge_gap_ms: env_u64("MERGE_GAP_MS", defaults.merge_gap_ms),
            segment_padding_ms: env_u64("SEGMENT_PADDING_MS", defaults.segment_padding_ms),
            primary_provider: std::env::var("PRIMARY_PROVIDER")
                .unwrap_or(defaults.primary_provider),
            max_concurrent_segments: env_usize(
                "MAX_CONCURRENT_SEGMENTS",
                defaults.max_concurrent_segments,
            ),
            call_timeout_ms: env_u64("CALL_TIMEOUT_MS", defaults.call_timeout_ms),
        }
    }

    /// The default clinical vocabulary supplied when the caller of
    /// [`crate::Orchestrator::process_audio`] passes no vocabulary boost.
    pub fn default_clinical_vocabulary() -> Vec<String> {
        [
            "hypertension",
            "diabetes",
            "cholesterol",
            "hemoglobin",
            "prescription",
            "medication",
            "diagnosis",
            "symptoms",
            "blood pressure",
            "heart rate",
            "temperature",
            "oxygen",
            "milligrams",
            "milliliters",
            "units",
            "dosage",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.confidence_threshold, 0.75);
        assert_eq!(cfg.min_segment_ms, 500);
        assert_eq!(cfg.max_segment_ms, 10_000);
        assert_eq!(cfg.context_window_words, 50);
        assert_eq!(cfg.merge_gap_ms, 1_000);
        assert_eq!(cfg.segment_padding_ms, 100);
    }

    #[test]
    fn default_vocabulary_has_sixteen_terms() {
        assert_eq!(OrchestratorConfig::default_clinical_vocabulary().len(), 16);
    }

    #[test]
    fn builder_overrides_apply() {
        let cfg = OrchestratorConfig::default()
            .with_confidence_threshold(0.6)
            .with_primary_provider("whisper");
        assert_eq!(cfg.confidence_threshold, 0.6);
        assert_eq!(cfg.primary_provider, "whisper");
    }
}
