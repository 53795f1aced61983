//! The judge's ruling for one uncertain segment.

use super::{UncertainSegment, Word};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel `chosen_source` value meaning the judge synthesized new text
/// rather than selecting a candidate.
pub const SYNTHESIZED_SOURCE: &str = "synthesized";

/// One provider's proposal for an uncertain segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTranscription {
    /// Name of the provider that produced this candidate.
    pub source_name: String,

    /// Transcribed text for the segment.
    pub text: String,

    /// The provider's overall confidence for the segment.
    pub confidence: f32,

    /// Word-level data, re-anchored onto the original audio timeline.
    pub words: Vec<Word>,
}

/// The judge's ruling over one segment's candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorDecision {
    /// The segment this decision resolves.
    pub segment: UncertainSegment,

    /// Candidates keyed by provider name. A provider that failed for this
    /// segment is simply absent from the map.
    pub candidates: HashMap<String, CandidateTranscription>,

    /// The winning provider name, or [`SYNTHESIZED_SOURCE`].
    pub chosen_source: String,

    /// The text the judge endorses for this segment.
    pub final_text: String,

    /// The judge's free-form explanation.
    pub reasoning: String,

    /// Confidence to assign to every word of the accepted region.
    pub confidence_boost: f32,

    /// Present iff `chosen_source == SYNTHESIZED_SOURCE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_justification: Option<String>,
}

impl OrchestratorDecision {
    /// Whether the judge synthesized new text rather than selecting a candidate.
    pub fn was_synthesized(&self) -> bool {
        self.chosen_source == SYNTHESIZED_SOURCE
    }

    /// Just the text of each candidate, keyed by provider name.
    pub fn candidate_texts(&self) -> HashMap<String, String> {
        self.candidates
            .iter()
            .map(|(name, candidate)| (name.clone(), candidate.text.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> UncertainSegment {
        UncertainSegment {
            start_ms: 0,
            end_ms: 100,
            original_words: vec![],
            average_confidence: 0.4,
            context_before: String::new(),
            context_after: String::new(),
        }
    }

    #[test]
    fn was_synthesized_matches_sentinel() {
        let mut decision = OrchestratorDecision {
            segment: segment(),
            candidates: HashMap::new(),
            chosen_source: SYNTHESIZED_SOURCE.to_string(),
            final_text: "blood pressure one forty".into(),
            reasoning: "all candidates nonsensical".into(),
            confidence_boost: 0.7,
            synthesis_justification: Some("rejected all three".into()),
        };
        assert!(decision.was_synthesized());

        decision.chosen_source = "deepgram".into();
        decision.synthesis_justification = None;
        assert!(!decision.was_synthesized());
    }
}
