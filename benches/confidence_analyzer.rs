//! Benchmarks for confidence analysis over synthetic transcripts.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use transcript_orchestrator::{ConfidenceAnalyzer, OrchestratorConfig, TranscriptionResult, Word};

fn synthetic_transcript(word_count: usize, low_confidence_ratio: f32) -> TranscriptionResult {
    let words: Vec<Word> = (0..word_count)
        .map(|i| {
            let confidence = if (i as f32 / word_count as f32) % 1.0 < low_confidence_ratio {
                0.4
            } else {
                0.95
            };
            Word::new(
                format!("word{i}"),
                i as u64 * 200,
                (i as u64 + 1) * 200,
                confidence,
                None,
            )
            .unwrap()
        })
        .collect();
    let duration = words.last().map(|w| w.end_ms).unwrap_or(0);
    TranscriptionResult::from_words(words, duration, "en", "bench")
}

fn identify_uncertain_segments_benchmark(c: &mut Criterion) {
    let analyzer = ConfidenceAnalyzer::new(&OrchestratorConfig::default());
    let mut group = c.benchmark_group("identify_uncertain_segments");

    for word_count in [100usize, 1_000, 10_000] {
        let transcript = synthetic_transcript(word_count, 0.3);
        group.bench_with_input(
            BenchmarkId::new("words", word_count),
            &transcript,
            |b, transcript| b.iter(|| analyzer.identify_uncertain_segments(transcript)),
        );
    }

    group.finish();
}

fn statistics_benchmark(c: &mut Criterion) {
    let analyzer = ConfidenceAnalyzer::new(&OrchestratorConfig::default());
    let transcript = synthetic_transcript(10_000, 0.3);

    c.bench_function("statistics", |b| b.iter(|| analyzer.statistics(&transcript)));
}

criterion_group!(
    benches,
    identify_uncertain_segments_benchmark,
    statistics_benchmark
);
criterion_main!(benches);
