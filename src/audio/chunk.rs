//! Splitting canonical audio into bounded-duration windows.
//!
//! Synchronous cloud recognition has a hard per-request duration limit;
//! [`chunk_wav`] cuts a canonical WAV into consecutive, non-overlapping
//! windows no longer than the limit.  Chunk files are temporary: the
//! returned [`ChunkSet`] deletes them on drop, so they are cleaned up on
//! every exit path including a recognizer failure mid-set.
//!
//! Backends without a duration limit (the offline engine) never come here.

use std::path::{Path, PathBuf};

use crate::audio::normalize::ConversionError;
use crate::audio::probe::{probe, CANONICAL_BITS_PER_SAMPLE, CANONICAL_SAMPLE_RATE};

// ---------------------------------------------------------------------------
// ChunkSet
// ---------------------------------------------------------------------------

/// Owner of the temporary chunk files produced by [`chunk_wav`].
///
/// Dropping the set removes every chunk file from disk.
#[derive(Debug)]
pub struct ChunkSet {
    paths: Vec<PathBuf>,
}

impl ChunkSet {
    /// Chunk file paths in playback order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for ChunkSet {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("chunk: failed to remove {}: {e}", path.display());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// chunk_wav
// ---------------------------------------------------------------------------

/// Split the canonical WAV at `canonical` into windows of at most
/// `max_secs` seconds.
///
/// For total length `L` and window `D` the set contains `ceil(L/D)` chunks;
/// every chunk except possibly the last is exactly `D` long, and the chunks
/// concatenated in order reconstruct the original sample sequence exactly.
///
/// Chunk files are written next to the source as `<stem>.chunk000.wav`,
/// `<stem>.chunk001.wav`, ….
pub fn chunk_wav(canonical: &Path, max_secs: f64) -> Result<ChunkSet, ConversionError> {
    if !(max_secs > 0.0) {
        return Err(ConversionError::BadChunkWindow(max_secs));
    }

    let info = probe(canonical).map_err(|source| ConversionError::BadWav {
        path: canonical.display().to_string(),
        source,
    })?;
    if !info.is_canonical() {
        return Err(ConversionError::NotCanonical {
            path: canonical.display().to_string(),
            detail: "chunker requires mono 16 kHz 16-bit input".into(),
        });
    }

    let mut reader = hound::WavReader::open(canonical).map_err(|source| {
        ConversionError::BadWav {
            path: canonical.display().to_string(),
            source,
        }
    })?;
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .map_err(|source| ConversionError::BadWav {
            path: canonical.display().to_string(),
            source,
        })?;

    let frames_per_chunk =
        ((max_secs * f64::from(CANONICAL_SAMPLE_RATE)).round() as usize).max(1);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: CANONICAL_SAMPLE_RATE,
        bits_per_sample: CANONICAL_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut set = ChunkSet { paths: Vec::new() };
    for (i, window) in samples.chunks(frames_per_chunk).enumerate() {
        let path = chunk_sibling(canonical, i);
        let mut writer =
            hound::WavWriter::create(&path, spec).map_err(|source| bad_wav(canonical, source))?;
        // Register before writing so a failed write is still cleaned up
        // by the set's Drop.
        set.paths.push(path);
        for &s in window {
            writer
                .write_sample(s)
                .map_err(|source| bad_wav(canonical, source))?;
        }
        writer.finalize().map_err(|source| bad_wav(canonical, source))?;
    }

    log::debug!(
        "chunk: {} -> {} window(s) of <= {max_secs} s",
        canonical.display(),
        set.len()
    );
    Ok(set)
}

fn chunk_sibling(canonical: &Path, index: usize) -> PathBuf {
    canonical.with_extension(format!("chunk{index:03}.wav"))
}

fn bad_wav(path: &Path, source: hound::Error) -> ConversionError {
    ConversionError::BadWav {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
