//! OpenAI Whisper transcription adapter.
//!
//! Whisper exposes no native word-level confidence; this adapter derives it
//! from each segment's `avg_logprob` via [`super::logprob_to_confidence`],
//! following the original `whisper.py` service.

use super::logprob_to_confidence;
use crate::error::{Error, Result};
use crate::model::{TranscriptionResult, Word};
use serde::Deserialize;
use tracing::{instrument, warn};

const API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Default per-word confidence when Whisper returns word timestamps but we
/// have not yet overlaid segment-level `avg_logprob` onto them.
const DEFAULT_WORD_CONFIDENCE: f32 = 0.85;

/// OpenAI Whisper transcription service.
pub struct WhisperProvider {
    api_key: String,
    client: reqwest::Client,
}

impl WhisperProvider {
    /// Create a new adapter with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl super::SttProvider for WhisperProvider {
    fn name(&self) -> &'static str {
        "whisper"
    }

    #[instrument(skip(self, audio_path, vocabulary_boost), fields(provider = "whisper"))]
    async fn transcribe(
        &self,
        audio_path: &str,
        language: &str,
        _enable_diarization: bool,
        vocabulary_boost: &[String],
    ) -> Result<TranscriptionResult> {
        let audio_data = tokio::fs::read(audio_path)
            .await
            .map_err(|e| Error::InvalidAudio(format!("cannot read {audio_path}: {e}")))?;
        let file_name = std::path::Path::new(audio_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("segment.wav")
            .to_string();

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio_data).file_name(file_name),
            )
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("timestamp_granularities[]", "segment");

        if language != "auto" {
            form = form.text("language", language.to_string());
        }
        if !vocabulary_boost.is_empty() {
            form = form.text(
                "prompt",
                format!("Medical terms: {}.", vocabulary_boost.join(", ")),
            );
        }

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                self.name(),
                format!("Whisper returned {status}: {body}"),
            ));
        }

        let payload: WhisperResponse = response.json().await?;
        Ok(parse_response(payload))
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    words: Vec<WhisperWord>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
    start: f64,
    end: f64,
    #[serde(default = "default_logprob")]
    avg_logprob: f32,
}

fn default_logprob() -> f32 {
    -0.5
}

fn parse_response(payload: WhisperResponse) -> TranscriptionResult {
    let mut words: Vec<Word> = Vec::new();

    if !payload.words.is_empty() {
        for w in &payload.words {
            match Word::new(
                w.word.trim().to_string(),
                (w.start * 1000.0) as u64,
                (w.end * 1000.0) as u64,
                DEFAULT_WORD_CONFIDENCE,
                None,
            ) {
                Ok(word) => words.push(word),
                Err(e) => warn!(error = %e, "dropping malformed word from whisper response"),
            }
        }
        // Overlay segment-level avg_logprob confidence onto the words it covers.
        for seg in &payload.segments {
            let seg_start_ms = (seg.start * 1000.0) as u64;
            let seg_end_ms = (seg.end * 1000.0) as u64;
            let confidence = logprob_to_confidence(seg.avg_logprob);
            for word in words.iter_mut() {
                if word.start_ms >= seg_start_ms && word.end_ms <= seg_end_ms {
                    *word = word.with_confidence(confidence);
                }
            }
        }
    } else {
        // No word-level data: synthesize words by splitting each segment's text
        // evenly across its time span, confidence from its avg_logprob.
        for seg in &payload.segments {
            let seg_words: Vec<&str> = seg.text.split_whitespace().collect();
            if seg_words.is_empty() {
                continue;
            }
            let confidence = logprob_to_confidence(seg.avg_logprob);
            let span_ms = ((seg.end - seg.start) * 1000.0).max(0.0);
            let word_duration_ms = span_ms / seg_words.len() as f64;
            let seg_start_ms = seg.start * 1000.0;

            for (i, text) in seg_words.iter().enumerate() {
                let start_ms = (seg_start_ms + i as f64 * word_duration_ms) as u64;
                let end_ms = (seg_start_ms + (i + 1) as f64 * word_duration_ms) as u64;
                match Word::new(text.to_string(), start_ms, end_ms, confidence, None) {
                    Ok(word) => words.push(word),
                    Err(e) => warn!(error = %e, "dropping malformed synthesized word"),
                }
            }
        }
    }

    let duration_ms = words
        .last()
        .map(|w| w.end_ms)
        .or_else(|| payload.duration.map(|d| (d * 1000.0) as u64))
        .unwrap_or(0);

    let mut result = TranscriptionResult::from_words(
        words,
        duration_ms,
        payload.language.unwrap_or_else(|| "en".to_string()),
        "whisper-1",
    );
    // Whisper's own transcript string carries punctuation/casing the word
    // list doesn't reconstruct exactly via naive space-joining.
    let text = payload.text.trim();
    if !text.is_empty() {
        result.full_text = text.to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_words_from_word_level_timestamps() {
        let payload = WhisperResponse {
            text: "hello world".into(),
            language: Some("en".into()),
            duration: Some(1.0),
            words: vec![
                WhisperWord {
                    word: "hello".into(),
                    start: 0.0,
                    end: 0.4,
                },
                WhisperWord {
                    word: "world".into(),
                    start: 0.4,
                    end: 1.0,
                },
            ],
            segments: vec![WhisperSegment {
                text: "hello world".into(),
                start: 0.0,
                end: 1.0,
                avg_logprob: -0.1,
            }],
        };
        let result = parse_response(payload);
        assert_eq!(result.word_count(), 2);
        assert_eq!(result.full_text, "hello world");
        assert!(result.words[0].confidence > 0.8);
    }

    #[test]
    fn falls_back_to_segment_splitting_without_word_timestamps() {
        let payload = WhisperResponse {
            text: "the patient has a fever".into(),
            language: Some("en".into()),
            duration: Some(2.0),
            words: vec![],
            segments: vec![WhisperSegment {
                text: "the patient has a fever".into(),
                start: 0.0,
                end: 2.0,
                avg_logprob: -0.3,
            }],
        };
        let result = parse_response(payload);
        assert_eq!(result.word_count(), 5);
        assert!(result.is_monotonic());
    }
}
