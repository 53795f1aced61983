//! AssemblyAI transcription adapter.
//!
//! The original `assemblyai.py` service uses the vendor's official SDK and a
//! thread pool to poll for completion; no Rust SDK exists for this vendor,
//! so this adapter speaks the same submit/poll/fetch REST flow directly over
//! `reqwest`, matching the other two adapters' shape.

use super::content_type_for;
use crate::error::{Error, Result};
use crate::model::{TranscriptionResult, Word};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const BASE_URL: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_POLLS: u32 = 200;

/// AssemblyAI transcription service.
pub struct AssemblyAiProvider {
    api_key: String,
    client: reqwest::Client,
}

impl AssemblyAiProvider {
    /// Create a new adapter with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client builds"),
        }
    }

    async fn upload(&self, audio_path: &str) -> Result<String> {
        let data = tokio::fs::read(audio_path)
            .await
            .map_err(|e| Error::InvalidAudio(format!("cannot read {audio_path}: {e}")))?;
        let response = self
            .client
            .post(format!("{BASE_URL}/upload"))
            .header("Authorization", &self.api_key)
            .header("Content-Type", content_type_for(audio_path))
            .body(data)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                self.name(),
                format!("upload returned {status}: {body}"),
            ));
        }
        let payload: UploadResponse = response.json().await?;
        Ok(payload.upload_url)
    }

    async fn submit(
        &self,
        audio_url: &str,
        language: &str,
        enable_diarization: bool,
        vocabulary_boost: &[String],
    ) -> Result<String> {
        let request = SubmitRequest {
            audio_url: audio_url.to_string(),
            language_code: if language == "auto" {
                None
            } else {
                Some(language.to_string())
            },
            language_detection: language == "auto",
            speaker_labels: enable_diarization,
            word_boost: vocabulary_boost.to_vec(),
            punctuate: true,
            format_text: true,
        };
        let response = self
            .client
            .post(format!("{BASE_URL}/transcript"))
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(
                self.name(),
                format!("submit returned {status}: {body}"),
            ));
        }
        let payload: SubmitResponse = response.json().await?;
        Ok(payload.id)
    }

    #[instrument(skip(self), fields(provider = "assemblyai"))]
    async fn poll_until_complete(&self, transcript_id: &str) -> Result<PollResponse> {
        for attempt in 0..MAX_POLLS {
            let response = self
                .client
                .get(format!("{BASE_URL}/transcript/{transcript_id}"))
                .header("Authorization", &self.api_key)
                .send()
                .await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::provider(
                    self.name(),
                    format!("poll returned {status}: {body}"),
                ));
            }
            let payload: PollResponse = response.json().await?;
            debug!(attempt, status = %payload.status, "polled assemblyai transcript");
            match payload.status.as_str() {
                "completed" => return Ok(payload),
                "error" => {
                    return Err(Error::provider(
                        self.name(),
                        payload
                            .error
                            .unwrap_or_else(|| "transcription failed".to_string()),
                    ))
                }
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
        Err(Error::provider(
            self.name(),
            format!("timed out after {MAX_POLLS} polls waiting for transcript"),
        ))
    }
}

#[async_trait::async_trait]
impl super::SttProvider for AssemblyAiProvider {
    fn name(&self) -> &'static str {
        "assemblyai"
    }

    async fn transcribe(
        &self,
        audio_path: &str,
        language: &str,
        enable_diarization: bool,
        vocabulary_boost: &[String],
    ) -> Result<TranscriptionResult> {
        let audio_url = self.upload(audio_path).await?;
        let transcript_id = self
            .submit(&audio_url, language, enable_diarization, vocabulary_boost)
            .await?;
        let payload = self.poll_until_complete(&transcript_id).await?;
        parse_response(payload)
    }
}

#[derive(Debug, Serialize)]
struct SubmitRequest {
    audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<String>,
    language_detection: bool,
    speaker_labels: bool,
    word_boost: Vec<String>,
    punctuate: bool,
    format_text: bool,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    audio_duration: Option<f64>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    words: Vec<AaiWord>,
}

#[derive(Debug, Deserialize)]
struct AaiWord {
    text: String,
    start: u64,
    end: u64,
    confidence: f32,
    #[serde(default)]
    speaker: Option<String>,
}

fn parse_response(payload: PollResponse) -> Result<TranscriptionResult> {
    let mut words = Vec::with_capacity(payload.words.len());
    for w in &payload.words {
        match Word::new(
            w.text.clone(),
            w.start,
            w.end,
            w.confidence,
            w.speaker.clone(),
        ) {
            Ok(word) => words.push(word),
            Err(e) => warn!(error = %e, "dropping malformed word from assemblyai response"),
        }
    }

    let duration_ms = payload
        .audio_duration
        .map(|d| (d * 1000.0) as u64)
        .unwrap_or_else(|| words.last().map(|w| w.end_ms).unwrap_or(0));
    let language = payload.language_code.unwrap_or_else(|| "en".to_string());

    let mut result = TranscriptionResult::from_words(words, duration_ms, language, "assemblyai");
    if let Some(text) = payload.text.filter(|t| !t.trim().is_empty()) {
        result.full_text = text;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completed_transcript() {
        let payload = PollResponse {
            status: "completed".into(),
            error: None,
            text: Some("hello world".into()),
            audio_duration: Some(1.0),
            language_code: Some("en".into()),
            words: vec![
                AaiWord {
                    text: "hello".into(),
                    start: 0,
                    end: 400,
                    confidence: 0.95,
                    speaker: Some("A".into()),
                },
                AaiWord {
                    text: "world".into(),
                    start: 400,
                    end: 1000,
                    confidence: 0.9,
                    speaker: Some("A".into()),
                },
            ],
        };
        let result = parse_response(payload).unwrap();
        assert_eq!(result.word_count(), 2);
        assert_eq!(result.full_text, "hello world");
        assert_eq!(result.duration_ms, 1000);
    }

    #[test]
    fn empty_words_produce_empty_transcript() {
        let payload = PollResponse {
            status: "completed".into(),
            error: None,
            text: None,
            audio_duration: None,
            language_code: None,
            words: vec![],
        };
        let result = parse_response(payload).unwrap();
        assert!(result.words.is_empty());
        assert_eq!(result.language, "en");
    }
}
