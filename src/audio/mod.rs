//! Audio acquisition and conditioning.
//!
//! # Pipeline
//!
//! ```text
//! arbitrary media ──▶ normalize (ffmpeg) ──▶ canonical WAV ──▶ recognizer
//! live device ──▶ capture (cpal) ─ downmix/resample ─▶ canonical WAV ─┘
//!                                         canonical WAV ──▶ chunk ──▶ cloud
//! ```
//!
//! Canonical audio is mono, 16 kHz, 16-bit integer PCM — the only format the
//! recognizer backends accept.

pub mod capture;
pub mod chunk;
pub mod normalize;
pub mod probe;
pub mod resample;

pub use capture::{capture_to_wav, write_canonical_wav, CaptureError, CaptureInfo};
pub use chunk::{chunk_wav, ChunkSet};
pub use normalize::{normalize, normalized_sibling, ConversionError};
pub use probe::{probe, WavInfo, CANONICAL_BITS_PER_SAMPLE, CANONICAL_SAMPLE_RATE};
pub use resample::{downmix_to_mono, resample_to_canonical};
