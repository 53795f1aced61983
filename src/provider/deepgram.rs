//! Deepgram transcription adapter.
//!
//! Ported from the original `deepgram.py` service: word-level confidence,
//! speaker diarization, keyword boosting for domain vocabulary.

use super::content_type_for;
use crate::error::{Error, Result};
use crate::model::{TranscriptionResult, Word};
use serde::Deserialize;
use std::time::Duration;
use tracing::{instrument, warn};

const API_URL: &str = "https://api.deepgram.com/v1/listen";

/// Deepgram Nova-family transcription service.
pub struct DeepgramProvider {
    api_key: String,
    client: reqwest::Client,
}

impl DeepgramProvider {
    /// Create a new adapter with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("reqwest client builds"),
        }
    }
}

#[async_trait::async_trait]
impl super::SttProvider for DeepgramProvider {
    fn name(&self) -> &'static str {
        "deepgram"
    }

    #[instrument(skip(self, audio_path, vocabulary_boost), fields(provider = "deepgram"))]
    async fn transcribe(
        &self,
        audio_path: &str,
        language: &str,
        enable_diarization: bool,
        vocabulary_boost: &[String],
    ) -> Result<TranscriptionResult> {
        let audio_data = tokio::fs::read(audio_path)
            .await
            .map_err(|e| Error::InvalidAudio(format!("cannot read {audio_path}: {e}")))?;

        let mut query: Vec<(&str, String)> = vec![
            ("model", "nova-2".to_string()),
            ("language", language.to_string()),
            ("punctuate", "true".to_string()),
            ("diarize", enable_diarization.to_string()),
            ("utterances", "true".to_string()),
            ("smart_format", "true".to_string()),
        ];
        if !vocabulary_boost.is_empty() {
            query.push(("keywords", vocabulary_boost.join(",")));
        }

        let response = self
            .client
            .post(API_URL)
            .query(&query)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", content_type_for(audio_path))
            .body(audio_data)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                self.name(),
                format!("Deepgram returned {status}: {body}"),
            ));
        }

        let payload: DeepgramResponse = response.json().await?;
        parse_response(payload)
    }
}

/// The model identifier this adapter reports for a completed transcription.
///
/// Intentionally `"deepgram-nova-3"` even though the request above asks for
/// `model=nova-2` — this mismatch is carried over from the original
/// `deepgram.py` rather than silently corrected. Per the design's open
/// question, the primary provider is a configuration key, not a guess at
/// which vendor model string the code "really" meant.
pub const REPORTED_MODEL_NAME: &str = "deepgram-nova-3";

#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    results: Option<DeepgramResults>,
}

#[derive(Debug, Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
    metadata: Option<DeepgramMetadata>,
}

#[derive(Debug, Deserialize)]
struct DeepgramMetadata {
    duration: Option<f64>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    #[serde(default)]
    words: Vec<DeepgramWord>,
}

#[derive(Debug, Deserialize)]
struct DeepgramWord {
    word: String,
    start: f64,
    end: f64,
    confidence: f32,
    #[serde(default)]
    speaker: Option<serde_json::Value>,
}

fn parse_response(payload: DeepgramResponse) -> Result<TranscriptionResult> {
    let Some(results) = payload.results else {
        return Ok(TranscriptionResult::from_words(
            vec![],
            0,
            "en",
            REPORTED_MODEL_NAME,
        ));
    };
    let Some(channel) = results.channels.first() else {
        return Ok(TranscriptionResult::from_words(
            vec![],
            0,
            "en",
            REPORTED_MODEL_NAME,
        ));
    };
    let Some(alternative) = channel.alternatives.first() else {
        return Ok(TranscriptionResult::from_words(
            vec![],
            0,
            "en",
            REPORTED_MODEL_NAME,
        ));
    };

    let mut words = Vec::with_capacity(alternative.words.len());
    for w in &alternative.words {
        let speaker = w.speaker.as_ref().map(|v| v.to_string());
        match Word::new(
            w.word.clone(),
            (w.start * 1000.0) as u64,
            (w.end * 1000.0) as u64,
            w.confidence,
            speaker,
        ) {
            Ok(word) => words.push(word),
            Err(e) => warn!(error = %e, "dropping malformed word from deepgram response"),
        }
    }

    let language = results
        .metadata
        .as_ref()
        .and_then(|m| m.language.clone())
        .unwrap_or_else(|| "en".to_string());
    let duration_ms = results
        .metadata
        .as_ref()
        .and_then(|m| m.duration)
        .map(|d| (d * 1000.0) as u64)
        .unwrap_or_else(|| words.last().map(|w| w.end_ms).unwrap_or(0));

    Ok(TranscriptionResult::from_words(
        words,
        duration_ms,
        language,
        REPORTED_MODEL_NAME,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_response() {
        let json = serde_json::json!({
            "results": {
                "channels": [{
                    "alternatives": [{
                        "words": [
                            {"word": "hello", "start": 0.0, "end": 0.5, "confidence": 0.9},
                            {"word": "world", "start": 0.5, "end": 1.0, "confidence": 0.8}
                        ]
                    }]
                }],
                "metadata": {"duration": 1.0, "language": "en"}
            }
        });
        let payload: DeepgramResponse = serde_json::from_value(json).unwrap();
        let result = parse_response(payload).unwrap();
        assert_eq!(result.word_count(), 2);
        assert_eq!(result.full_text, "hello world");
        assert_eq!(result.model_name, REPORTED_MODEL_NAME);
        assert_eq!(result.duration_ms, 1000);
    }

    #[test]
    fn empty_results_yield_empty_transcript() {
        let payload = DeepgramResponse { results: None };
        let result = parse_response(payload).unwrap();
        assert!(result.words.is_empty());
    }
}
