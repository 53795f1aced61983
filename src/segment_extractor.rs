//! Extracts a padded `[start, end]` slice of an audio file to a short-lived
//! artifact for segment-level transcription.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument};

/// A temporary audio artifact owned by the caller. The underlying file is
/// deleted when this value is dropped, on every exit path — success,
/// failure, or cancellation — so segment extraction never leaks temp files
/// in a long-running service.
pub struct SegmentArtifact {
    file: tempfile::TempPath,
}

impl SegmentArtifact {
    /// Filesystem path to the extracted clip, as a `&str`.
    pub fn path_str(&self) -> &str {
        self.file.to_str().expect("temp path is valid UTF-8")
    }

    /// Filesystem path to the extracted clip.
    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// Decode `audio_path`, slice out `[max(0, start_ms - padding_ms),
/// min(duration, end_ms + padding_ms)]`, and write it to a new temporary
/// WAV file. Padding never shifts the timestamps that providers later
/// report back — re-anchoring happens in [`crate::provider::SttProvider`].
///
/// Spec's reference wire format is MPEG-1 Layer III; no MP3 encoder crate
/// is available in this build's dependency stack, so the artifact is
/// written as WAV instead (see DESIGN.md). Every adapter's HTTP layer
/// accepts `audio/wav` equally well.
#[instrument(skip(audio_path), fields(start_ms, end_ms))]
pub fn extract_segment(
    audio_path: &str,
    start_ms: u64,
    end_ms: u64,
    padding_ms: u64,
) -> Result<SegmentArtifact> {
    let (samples, channels, sample_rate) = decode_pcm(audio_path)?;
    let total_ms = (samples.len() as u64 * 1000) / (channels as u64 * sample_rate as u64).max(1);

    let padded_start_ms = start_ms.saturating_sub(padding_ms);
    let padded_end_ms = (end_ms + padding_ms).min(total_ms);

    let frame_to_sample = |ms: u64| -> usize {
        ((ms as u128 * sample_rate as u128 * channels as u128) / 1000) as usize
    };
    let start_idx = frame_to_sample(padded_start_ms).min(samples.len());
    let end_idx = frame_to_sample(padded_end_ms).min(samples.len()).max(start_idx);

    debug!(
        start_idx,
        end_idx,
        total_samples = samples.len(),
        "extracting padded segment"
    );

    let clip = &samples[start_idx..end_idx];
    write_wav(clip, channels, sample_rate)
}

/// Decode the whole file's samples to interleaved `i16` PCM, along with
/// channel count and sample rate. Used both by segment extraction and by
/// [`audio_duration_ms`].
fn decode_pcm(audio_path: &str) -> Result<(Vec<i16>, u16, u32)> {
    let file = std::fs::File::open(audio_path)
        .map_err(|e| Error::InvalidAudio(format!("cannot open {audio_path}: {e}")))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = Path::new(audio_path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::audio(format!("unrecognized audio format: {e}")))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| Error::audio("no decodable audio track"))?;
    let track_id = track.id;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(1);
    let sample_rate = track.codec_params.sample_rate.unwrap_or(16_000);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::audio(format!("no decoder for track: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(e) => return Err(Error::audio(format!("demux error: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(Error::audio(format!("decode error: {e}"))),
        }
    }

    Ok((samples, channels, sample_rate))
}

/// Total duration of an audio file in milliseconds.
pub fn audio_duration_ms(audio_path: &str) -> Result<u64> {
    let (samples, channels, sample_rate) = decode_pcm(audio_path)?;
    Ok((samples.len() as u64 * 1000) / (channels as u64 * sample_rate as u64).max(1))
}

fn write_wav(samples: &[i16], channels: u16, sample_rate: u32) -> Result<SegmentArtifact> {
    let named = tempfile::Builder::new()
        .suffix(".wav")
        .tempfile()
        .map_err(Error::Io)?;
    let path: PathBuf = named.path().to_path_buf();

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    {
        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| Error::audio(format!("failed to open wav writer: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::audio(format!("failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::audio(format!("failed to finalize wav: {e}")))?;
    }

    Ok(SegmentArtifact {
        file: named.into_temp_path(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, samples: &[i16], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn extracts_padded_slice_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.wav");
        let sample_rate = 16_000u32;
        let samples: Vec<i16> = (0..sample_rate * 2).map(|i| (i % 100) as i16).collect();
        write_test_wav(&src, &samples, sample_rate);

        let artifact =
            extract_segment(src.to_str().unwrap(), 500, 1500, 100).expect("extraction succeeds");
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        drop(artifact);
        assert!(!path.exists(), "temp artifact must be deleted on drop");
    }

    #[test]
    fn duration_matches_known_length() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.wav");
        let sample_rate = 16_000u32;
        let samples: Vec<i16> = vec![0; (sample_rate * 3) as usize];
        write_test_wav(&src, &samples, sample_rate);

        let duration = audio_duration_ms(src.to_str().unwrap()).unwrap();
        assert!((duration as i64 - 3000).abs() <= 5);
    }
}
