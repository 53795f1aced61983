//! Uniform interface over heterogeneous speech-to-text vendors.
//!
//! Every provider exposes whole-file transcription directly and gets
//! segment-level transcription (re-anchored onto the original audio's
//! timeline) "for free" via the [`SttProvider::transcribe_segment`] default
//! method, which extracts the padded clip with
//! [`crate::segment_extractor::extract_segment`] and shifts the returned
//! words forward by the segment's start time.

mod assemblyai;
mod deepgram;
mod whisper;

pub use assemblyai::AssemblyAiProvider;
pub use deepgram::DeepgramProvider;
pub use whisper::WhisperProvider;

use crate::error::Result;
use crate::model::TranscriptionResult;
use crate::segment_extractor::extract_segment;

/// Capability set shared by every vendor adapter.
#[async_trait::async_trait]
pub trait SttProvider: Send + Sync {
    /// Transcribe the whole audio file.
    async fn transcribe(
        &self,
        audio_path: &str,
        language: &str,
        enable_diarization: bool,
        vocabulary_boost: &[String],
    ) -> Result<TranscriptionResult>;

    /// Identifier of this provider, used as the key in candidate maps and
    /// as the `chosen_source` value when selected.
    fn name(&self) -> &'static str;

    /// Transcribe `[start_ms, end_ms]` of `audio_path`, re-anchoring the
    /// returned words onto the original audio's timeline.
    ///
    /// The default implementation extracts a padded clip via the segment
    /// extractor, transcribes it with diarization disabled, and shifts
    /// every word forward by `start_ms`. Vendors whose API can address a
    /// byte/time range natively may override this.
    async fn transcribe_segment(
        &self,
        audio_path: &str,
        start_ms: u64,
        end_ms: u64,
        language: &str,
        padding_ms: u64,
    ) -> Result<TranscriptionResult> {
        let artifact = extract_segment(audio_path, start_ms, end_ms, padding_ms)?;
        let result = self
            .transcribe(artifact.path_str(), language, false, &[])
            .await?;

        let words = result
            .words
            .iter()
            .map(|w| w.shifted_by(start_ms))
            .collect();
        Ok(TranscriptionResult::from_words(
            words,
            result.duration_ms,
            result.language,
            result.model_name,
        ))
    }
}

pub(crate) fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "wav" => "audio/wav",
        Some(ext) if ext == "m4a" => "audio/mp4",
        Some(ext) if ext == "ogg" => "audio/ogg",
        _ => "audio/mp3",
    }
}

/// Convert a monotone log-probability into a rank-comparable confidence in
/// `[0, 1]` via a logistic transform centered near the mid-range. Used by
/// providers (e.g. Whisper) that only expose segment-level log-probability
/// rather than native word confidence.
///
/// `avg_logprob` of `0.0` -> ~0.95, `-0.5` -> ~0.80, `-1.0` -> ~0.60.
pub(crate) fn logprob_to_confidence(avg_logprob: f32) -> f32 {
    let confidence = 1.0 / (1.0 + (-2.0 * (avg_logprob + 0.5)).exp());
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_defaults_to_mp3() {
        assert_eq!(content_type_for("clip.wav"), "audio/wav");
        assert_eq!(content_type_for("clip.m4a"), "audio/mp4");
        assert_eq!(content_type_for("clip.unknown"), "audio/mp3");
    }

    #[test]
    fn logprob_to_confidence_is_monotone_and_bounded() {
        let low = logprob_to_confidence(-1.0);
        let mid = logprob_to_confidence(-0.5);
        let high = logprob_to_confidence(0.0);
        assert!(low < mid);
        assert!(mid < high);
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
        assert!((mid - 0.80).abs() < 0.02);
    }
}
