//! Top-level pipeline: primary pass, confidence analysis, per-segment
//! multi-provider arbitration, and monotonic merge. Ported from
//! `orchestrator.py::TranscriptionOrchestrator`.

use crate::analyzer::ConfidenceAnalyzer;
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::judge::Judge;
use crate::model::{
    CandidateTranscription, OrchestratorDecision, TranscriptionResult, UncertainSegment, Word,
};
use crate::provider::SttProvider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

/// Drives the full transcription pipeline for one audio file.
pub struct Orchestrator {
    providers: HashMap<String, Arc<dyn SttProvider>>,
    judge: Arc<dyn Judge>,
    analyzer: ConfidenceAnalyzer,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Build an orchestrator. `providers` must be keyed by provider name
    /// (`"deepgram"`, `"assemblyai"`, `"whisper"`), and
    /// `config.primary_provider` must name one of them.
    pub fn new(
        providers: HashMap<String, Arc<dyn SttProvider>>,
        judge: Arc<dyn Judge>,
        config: OrchestratorConfig,
    ) -> Self {
        let analyzer = ConfidenceAnalyzer::new(&config);
        Self {
            providers,
            judge,
            analyzer,
            config,
        }
    }

    /// Run the full pipeline: primary transcription, confidence analysis,
    /// per-segment arbitration, and merge.
    ///
    /// `medical_vocabulary` defaults to
    /// [`OrchestratorConfig::default_clinical_vocabulary`] when `None`.
    #[instrument(skip(self, medical_vocabulary), fields(audio_path))]
    pub async fn process_audio(
        &self,
        audio_path: &str,
        medical_vocabulary: Option<Vec<String>>,
    ) -> Result<(TranscriptionResult, Vec<OrchestratorDecision>)> {
        let vocabulary =
            medical_vocabulary.unwrap_or_else(OrchestratorConfig::default_clinical_vocabulary);

        let primary_provider = self.primary_provider()?;

        info!("running primary transcription pass");
        let primary_result = primary_provider
            .transcribe(audio_path, "en", true, &vocabulary)
            .await
            .map_err(|e| Error::PrimaryTranscriptionFailed(e.to_string()))?;

        info!("analyzing confidence");
        let uncertain_segments = self.analyzer.identify_uncertain_segments(&primary_result);
        info!(count = uncertain_segments.len(), "found uncertain segments");

        if uncertain_segments.is_empty() {
            return Ok((primary_result, vec![]));
        }

        info!("arbitrating uncertain segments");
        let decisions = self
            .process_uncertain_segments(audio_path, uncertain_segments)
            .await?;

        info!("merging decisions into final transcript");
        let merged = merge_decisions(&primary_result, &decisions)?;

        Ok((merged, decisions))
    }

    fn primary_provider(&self) -> Result<&Arc<dyn SttProvider>> {
        self.providers
            .get(&self.config.primary_provider)
            .ok_or_else(|| {
                Error::config(format!(
                    "primary_provider {:?} is not registered",
                    self.config.primary_provider
                ))
            })
    }

    async fn process_uncertain_segments(
        &self,
        audio_path: &str,
        segments: Vec<UncertainSegment>,
    ) -> Result<Vec<OrchestratorDecision>> {
        let concurrency = self.config.max_concurrent_segments.max(1);
        let mut decisions = Vec::with_capacity(segments.len());
        let mut in_flight: JoinSet<Result<OrchestratorDecision>> = JoinSet::new();
        let mut queue = segments.into_iter();

        for segment in queue.by_ref().take(concurrency) {
            self.spawn_segment(&mut in_flight, audio_path, segment);
        }

        while let Some(joined) = in_flight.join_next().await {
            let decision = joined.map_err(|e| Error::Judge(format!("segment task panicked: {e}")))??;
            decisions.push(decision);

            if let Some(next_segment) = queue.next() {
                self.spawn_segment(&mut in_flight, audio_path, next_segment);
            }
        }

        decisions.sort_by_key(|d| d.segment.start_ms);
        Ok(decisions)
    }

    fn spawn_segment(
        &self,
        in_flight: &mut JoinSet<Result<OrchestratorDecision>>,
        audio_path: &str,
        segment: UncertainSegment,
    ) {
        let providers = self.providers.clone();
        let judge = Arc::clone(&self.judge);
        let audio_path = audio_path.to_string();
        let padding_ms = self.config.segment_padding_ms;
        let timeout = Duration::from_millis(self.config.call_timeout_ms);

        in_flight.spawn(async move {
            info!(
                start_ms = segment.start_ms,
                end_ms = segment.end_ms,
                "processing uncertain segment"
            );
            let candidates =
                fetch_all_candidates(&providers, &audio_path, &segment, padding_ms, timeout).await;
            let decision = judge.evaluate(&segment, &candidates).await;
            info!(chosen_source = %decision.chosen_source, "segment decision reached");
            Ok(decision)
        });
    }
}

/// Transcribe `segment` with every registered provider concurrently.
/// A provider that errors or exceeds `timeout` is simply absent from the
/// returned map, matching `orchestrator.py::_get_all_transcriptions`'s
/// per-task `try`/`except`.
async fn fetch_all_candidates(
    providers: &HashMap<String, Arc<dyn SttProvider>>,
    audio_path: &str,
    segment: &UncertainSegment,
    padding_ms: u64,
    timeout: Duration,
) -> HashMap<String, CandidateTranscription> {
    let mut tasks: JoinSet<(String, Option<TranscriptionResult>)> = JoinSet::new();

    for (name, provider) in providers {
        let name = name.clone();
        let provider = Arc::clone(provider);
        let audio_path = audio_path.to_string();
        let start_ms = segment.start_ms;
        let end_ms = segment.end_ms;

        tasks.spawn(async move {
            let call = provider.transcribe_segment(&audio_path, start_ms, end_ms, "en", padding_ms);
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(result)) => (name, Some(result)),
                Ok(Err(e)) => {
                    warn!(provider = %name, error = %e, "segment transcription failed");
                    (name, None)
                }
                Err(_) => {
                    warn!(provider = %name, "segment transcription timed out");
                    (name, None)
                }
            }
        });
    }

    let mut candidates = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "provider task panicked");
                continue;
            }
        };
        if let Some(result) = result {
            candidates.insert(
                name.clone(),
                CandidateTranscription {
                    source_name: name,
                    text: result.full_text,
                    confidence: result.overall_confidence,
                    words: result.words,
                },
            );
        }
    }

    candidates
}

/// Replace every word inside a decision's span with that decision's chosen
/// text, leaving everything else untouched. Ported from
/// `orchestrator.py::_merge_decisions`.
fn merge_decisions(
    primary: &TranscriptionResult,
    decisions: &[OrchestratorDecision],
) -> Result<TranscriptionResult> {
    if decisions.is_empty() {
        return Ok(primary.clone());
    }

    let mut merged_words: Vec<Word> = Vec::with_capacity(primary.words.len());
    let mut decision_idx = 0;
    let mut i = 0;

    while i < primary.words.len() {
        let word = &primary.words[i];

        if decision_idx < decisions.len() {
            let decision = &decisions[decision_idx];
            let segment = &decision.segment;

            if word.start_ms >= segment.start_ms && word.end_ms <= segment.end_ms {
                if segment.start_ms < primary.words.first().map(|w| w.start_ms).unwrap_or(0)
                    || segment.end_ms > primary.words.last().map(|w| w.end_ms).unwrap_or(0)
                {
                    return Err(Error::merge_inconsistency(
                        "decision segment falls outside primary transcript range",
                    ));
                }

                let replacement = resolve_replacement_words(decision);
                merged_words.extend(replacement);

                while i < primary.words.len() && primary.words[i].end_ms <= segment.end_ms {
                    i += 1;
                }
                decision_idx += 1;
                continue;
            }
        }

        merged_words.push(word.clone());
        i += 1;
    }

    let full_text = merged_words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let overall_confidence = if merged_words.is_empty() {
        primary.overall_confidence
    } else {
        merged_words.iter().map(|w| w.confidence).sum::<f32>() / merged_words.len() as f32
    };

    Ok(TranscriptionResult {
        full_text,
        words: merged_words,
        overall_confidence,
        duration_ms: primary.duration_ms,
        language: primary.language.clone(),
        model_name: "orchestrated".to_string(),
        raw_response: None,
    })
}

fn resolve_replacement_words(decision: &OrchestratorDecision) -> Vec<Word> {
    if decision.was_synthesized() {
        return words_from_text(
            &decision.final_text,
            decision.segment.start_ms,
            decision.segment.end_ms,
            decision.confidence_boost,
        );
    }

    if let Some(candidate) = decision.candidates.get(&decision.chosen_source) {
        return candidate
            .words
            .iter()
            .map(|w| w.with_confidence(decision.confidence_boost))
            .collect();
    }

    decision
        .segment
        .original_words
        .iter()
        .map(|w| w.with_confidence(decision.confidence_boost))
        .collect()
}

/// Split `text` into evenly time-distributed words across `[start_ms,
/// end_ms]`. Ported from `orchestrator.py::_create_words_from_text`.
fn words_from_text(text: &str, start_ms: u64, end_ms: u64, confidence: f32) -> Vec<Word> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let span_ms = (end_ms - start_ms) as f64;
    let word_duration_ms = span_ms / tokens.len() as f64;

    tokens
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let word_start = start_ms + (i as f64 * word_duration_ms) as u64;
            let word_end = word_start + word_duration_ms as u64;
            Word::new(*text, word_start, word_end, confidence, None).ok()
        })
        .collect()
}
