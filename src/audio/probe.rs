//! WAV header inspection.
//!
//! Recognizers only accept canonical audio — mono, 16 kHz, 16-bit integer
//! PCM.  [`probe`] reads just the header so the normalizer and the engines
//! can check conformance cheaply before committing to a full decode.

use std::path::Path;

use hound::SampleFormat;

/// Sample rate every recognizer backend expects, in Hz.
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;
/// Bit depth every recognizer backend expects.
pub const CANONICAL_BITS_PER_SAMPLE: u16 = 16;

// ---------------------------------------------------------------------------
// WavInfo
// ---------------------------------------------------------------------------

/// Header-level facts about a WAV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Whether samples are integer PCM (as opposed to float).
    pub int_pcm: bool,
    /// Number of frames (samples per channel).
    pub num_frames: u32,
}

impl WavInfo {
    /// Whether this file is already in the canonical recognizer format.
    pub fn is_canonical(&self) -> bool {
        self.channels == 1
            && self.sample_rate == CANONICAL_SAMPLE_RATE
            && self.bits_per_sample == CANONICAL_BITS_PER_SAMPLE
            && self.int_pcm
    }

    /// Audio duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        f64::from(self.num_frames) / f64::from(self.sample_rate)
    }
}

/// Read the header of the WAV file at `path`.
pub fn probe(path: &Path) -> Result<WavInfo, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        int_pcm: spec.sample_format == SampleFormat::Int,
        num_frames: reader.duration(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
