//! Audio normalization to the canonical recognizer format.
//!
//! [`normalize`] inspects the input and returns it unchanged when it is
//! already mono 16 kHz 16-bit PCM WAV.  Anything else is converted with an
//! external `ffmpeg` process into a deterministic sibling file
//! (`<stem>.norm.wav`).  The output header is verified before the path is
//! returned — recognizers reject non-conforming input at a much
//! harder-to-diagnose stage, so a bad transcode must fail here.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::audio::probe::{probe, CANONICAL_SAMPLE_RATE};

// ---------------------------------------------------------------------------
// ConversionError
// ---------------------------------------------------------------------------

/// Errors from audio conversion and chunking.  Fatal for the item being
/// processed, never for the whole run.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("ffmpeg not found in PATH — required to convert audio to 16 kHz mono WAV")]
    TranscoderMissing,

    #[error("ffmpeg exited with status {status}: {stderr}")]
    TranscoderFailed { status: i32, stderr: String },

    /// The transcoder ran but its output does not match the canonical format.
    #[error("transcoder produced a non-canonical file {path}: {detail}")]
    NotCanonical { path: String, detail: String },

    #[error("unreadable WAV {path}: {source}")]
    BadWav {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("invalid chunk window: {0} s")]
    BadChunkWindow(f64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Deterministic output path for a converted file: `<stem>.norm.wav` next to
/// the input.
pub fn normalized_sibling(input: &Path) -> PathBuf {
    input.with_extension("norm.wav")
}

/// Convert `input` to canonical audio, returning the canonical path.
///
/// If `input` is already a canonical WAV it is returned unchanged — no copy
/// is made, which also makes the operation idempotent:
/// `normalize(normalize(x))` returns the same path as `normalize(x)`.
///
/// # Errors
///
/// - [`ConversionError::TranscoderMissing`] — ffmpeg is not on `PATH`.
/// - [`ConversionError::TranscoderFailed`] — ffmpeg exited non-zero.
/// - [`ConversionError::NotCanonical`] — ffmpeg succeeded but the output
///   header does not conform (the offending file is removed).
pub fn normalize(input: &Path) -> Result<PathBuf, ConversionError> {
    let is_wav = input
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    if is_wav {
        // A broken header just means we convert; only conformance is a
        // fast path.
        if let Ok(info) = probe(input) {
            if info.is_canonical() {
                log::debug!("normalize: {} already canonical", input.display());
                return Ok(input.to_path_buf());
            }
        }
    }

    let output = normalized_sibling(input);
    run_transcoder(input, &output)?;
    verify_canonical(&output)?;
    log::debug!(
        "normalize: {} -> {}",
        input.display(),
        output.display()
    );
    Ok(output)
}

fn run_transcoder(input: &Path, output: &Path) -> Result<(), ConversionError> {
    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ac", "1"])
        .args(["-ar", &CANONICAL_SAMPLE_RATE.to_string()])
        .args(["-sample_fmt", "s16"])
        .arg(output)
        .output();

    let out = match result {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConversionError::TranscoderMissing);
        }
        Err(e) => return Err(e.into()),
    };

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        // Keep only the tail — ffmpeg banners are long, the error is last.
        let tail: String = stderr
            .chars()
            .rev()
            .take(400)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return Err(ConversionError::TranscoderFailed {
            status: out.status.code().unwrap_or(-1),
            stderr: tail.trim().to_string(),
        });
    }

    Ok(())
}

/// Check that `path` conforms to the canonical format, removing it when it
/// does not so a bad artifact never leaks to a recognizer.
fn verify_canonical(path: &Path) -> Result<(), ConversionError> {
    let info = probe(path).map_err(|source| ConversionError::BadWav {
        path: path.display().to_string(),
        source,
    })?;

    if !info.is_canonical() {
        let detail = format!(
            "{} ch, {} Hz, {} bit",
            info.channels, info.sample_rate, info.bits_per_sample
        );
        let _ = std::fs::remove_file(path);
        return Err(ConversionError::NotCanonical {
            path: path.display().to_string(),
            detail,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
