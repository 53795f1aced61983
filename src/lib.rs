//! # Transcript Orchestrator
//!
//! A multi-model transcription orchestrator for recorded medical
//! conversations: a primary speech-to-text pass, confidence-gated
//! re-transcription of uncertain stretches across multiple vendors, and an
//! LLM-arbitrated merge back into one monotonic transcript.
//!
//! ## Pipeline
//!
//! 1. [`provider::SttProvider::transcribe`] — whole-file primary pass.
//! 2. [`analyzer::ConfidenceAnalyzer::identify_uncertain_segments`] — group
//!    low-confidence stretches into [`model::UncertainSegment`]s.
//! 3. Each segment is re-transcribed concurrently by every registered
//!    provider via [`provider::SttProvider::transcribe_segment`].
//! 4. [`judge::Judge::evaluate`] arbitrates between the candidates.
//! 5. The winning text for every segment is merged back into the primary
//!    transcript, preserving word order and timeline coverage.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      Orchestrator::process_audio                  │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  primary pass ──▶ confidence analysis ──▶ per-segment fan-out      │
//! │  (SttProvider)    (ConfidenceAnalyzer)     (SttProvider × 3, Judge)│
//! │                                                 │                  │
//! │                                                 ▼                  │
//! │                                          monotonic merge           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use transcript_orchestrator::{
//!     config::OrchestratorConfig,
//!     judge::OpenAiJudge,
//!     orchestrator::Orchestrator,
//!     provider::{DeepgramProvider, SttProvider},
//! };
//!
//! # async fn run() -> transcript_orchestrator::error::Result<()> {
//! let mut providers: HashMap<String, Arc<dyn SttProvider>> = HashMap::new();
//! providers.insert(
//!     "deepgram".to_string(),
//!     Arc::new(DeepgramProvider::new("api-key")),
//! );
//!
//! let judge = Arc::new(OpenAiJudge::new("api-key", "gpt-4o"));
//! let orchestrator = Orchestrator::new(providers, judge, OrchestratorConfig::default());
//! let (transcript, decisions) = orchestrator.process_audio("call.wav", None).await?;
//! println!("{}", transcript.full_text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod judge;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod segment_extractor;

pub use crate::analyzer::{ConfidenceAnalyzer, ConfidenceStatistics};
pub use crate::config::OrchestratorConfig;
pub use crate::error::{Error, Result};
pub use crate::judge::Judge;
pub use crate::model::{
    CandidateTranscription, OrchestratorDecision, TranscriptionResult, UncertainSegment, Word,
};
pub use crate::orchestrator::Orchestrator;
pub use crate::provider::SttProvider;
