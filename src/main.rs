//! Transcript Orchestrator CLI
//!
//! Runs one audio file through the full orchestration pipeline and prints
//! the resulting transcript and per-segment decision log. A local
//! stand-in for the HTTP job surface that sits out of scope for this crate.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcript_orchestrator::config::OrchestratorConfig;
use transcript_orchestrator::judge::OpenAiJudge;
use transcript_orchestrator::orchestrator::Orchestrator;
use transcript_orchestrator::provider::{AssemblyAiProvider, DeepgramProvider, SttProvider, WhisperProvider};

/// Transcript Orchestrator - multi-model medical transcription pipeline
#[derive(Parser)]
#[command(name = "transcript-orchestrator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file end-to-end
    Transcribe {
        /// Path to the audio file
        audio_path: String,

        /// Comma-separated vocabulary boost terms; defaults to the built-in
        /// clinical vocabulary if omitted
        #[arg(long)]
        vocabulary: Option<String>,

        /// Confidence threshold below which words are flagged uncertain
        #[arg(long)]
        confidence_threshold: Option<f32>,

        /// OpenAI chat model used by the judge
        #[arg(long, default_value = "gpt-4o")]
        judge_model: String,

        /// Print the per-segment decision log in addition to the transcript
        #[arg(long)]
        show_decisions: bool,
    },

    /// Print confidence statistics for a primary transcription pass
    Analyze {
        /// Path to the audio file
        audio_path: String,

        /// Confidence threshold below which words are flagged uncertain
        #[arg(long)]
        confidence_threshold: Option<f32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Transcribe {
            audio_path,
            vocabulary,
            confidence_threshold,
            judge_model,
            show_decisions,
        } => {
            let mut config = OrchestratorConfig::from_env();
            if let Some(threshold) = confidence_threshold {
                config = config.with_confidence_threshold(threshold);
            }

            let providers = build_providers()?;
            let openai_key = require_env("OPENAI_API_KEY")?;
            let judge = Arc::new(OpenAiJudge::new(openai_key, judge_model));
            let orchestrator = Orchestrator::new(providers, judge, config);

            let vocabulary = vocabulary.map(|v| {
                v.split(',')
                    .map(|term| term.trim().to_string())
                    .filter(|term| !term.is_empty())
                    .collect::<Vec<_>>()
            });

            let (transcript, decisions) =
                orchestrator.process_audio(&audio_path, vocabulary).await?;

            println!("{}", transcript.full_text);
            println!(
                "\n({} words, overall confidence {:.2}, {} segment(s) arbitrated)",
                transcript.word_count(),
                transcript.overall_confidence,
                decisions.len()
            );

            if show_decisions {
                println!("\nDecision log:");
                for decision in &decisions {
                    println!(
                        "  [{}ms-{}ms] chosen={} boost={:.2}: {}",
                        decision.segment.start_ms,
                        decision.segment.end_ms,
                        decision.chosen_source,
                        decision.confidence_boost,
                        decision.final_text
                    );
                    if let Some(justification) = &decision.synthesis_justification {
                        println!("    synthesis justification: {justification}");
                    }
                }
            }
        }

        Commands::Analyze {
            audio_path,
            confidence_threshold,
        } => {
            let mut config = OrchestratorConfig::from_env();
            if let Some(threshold) = confidence_threshold {
                config = config.with_confidence_threshold(threshold);
            }

            let deepgram_key = require_env("DEEPGRAM_API_KEY")?;
            let provider = DeepgramProvider::new(deepgram_key);
            let primary = provider
                .transcribe(
                    &audio_path,
                    "en",
                    true,
                    &OrchestratorConfig::default_clinical_vocabulary(),
                )
                .await?;

            let analyzer = transcript_orchestrator::ConfidenceAnalyzer::new(&config);
            let stats = analyzer.statistics(&primary);
            let uncertain = analyzer.identify_uncertain_segments(&primary);

            println!("Total words: {}", stats.total_words);
            println!(
                "Low-confidence words: {} ({:.1}%)",
                stats.low_confidence_words, stats.low_confidence_percentage
            );
            println!("Average confidence: {:.3}", stats.average_confidence);
            println!(
                "Min/max confidence: {:.3} / {:.3}",
                stats.min_confidence, stats.max_confidence
            );
            println!("Uncertain segments: {}", uncertain.len());
            for segment in &uncertain {
                println!(
                    "  [{}ms-{}ms] avg_conf={:.2}: {:?}",
                    segment.start_ms,
                    segment.end_ms,
                    segment.average_confidence,
                    segment.original_text()
                );
            }
        }
    }

    Ok(())
}

fn build_providers() -> anyhow::Result<HashMap<String, Arc<dyn SttProvider>>> {
    let mut providers: HashMap<String, Arc<dyn SttProvider>> = HashMap::new();
    providers.insert(
        "deepgram".to_string(),
        Arc::new(DeepgramProvider::new(require_env("DEEPGRAM_API_KEY")?)),
    );
    providers.insert(
        "assemblyai".to_string(),
        Arc::new(AssemblyAiProvider::new(require_env("ASSEMBLYAI_API_KEY")?)),
    );
    providers.insert(
        "whisper".to_string(),
        Arc::new(WhisperProvider::new(require_env("OPENAI_API_KEY")?)),
    );
    Ok(providers)
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}
