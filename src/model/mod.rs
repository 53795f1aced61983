//! Shared data model: words, transcripts, uncertain segments and decisions.

mod decision;
mod segment;
mod transcription;
mod word;

pub use decision::{CandidateTranscription, OrchestratorDecision, SYNTHESIZED_SOURCE};
pub use segment::UncertainSegment;
pub use transcription::TranscriptionResult;
pub use word::Word;
