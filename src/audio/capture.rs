//! Live system-audio capture via `cpal`.
//!
//! [`capture_to_wav`] records from the default (or a named) input device for
//! a fixed number of seconds, downmixes and resamples the stream to the
//! canonical format, and writes it as a 16-bit WAV.  The result is directly
//! consumable by any recognizer backend — no normalization step needed.
//!
//! Capturing *system* output (not the microphone) relies on the platform
//! exposing a loopback input device ("Stereo Mix", a virtual cable, a
//! monitor source); the device is selected by name through configuration.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use thiserror::Error;

use crate::audio::probe::{CANONICAL_BITS_PER_SAMPLE, CANONICAL_SAMPLE_RATE};
use crate::audio::resample::{downmix_to_mono, resample_to_canonical};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported input sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to write capture WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// CaptureInfo
// ---------------------------------------------------------------------------

/// Facts about a completed capture, used for record provenance.
#[derive(Debug, Clone)]
pub struct CaptureInfo {
    /// Resolved input device name.
    pub device: String,
    /// Requested capture length in seconds.
    pub seconds: f64,
    /// Path of the canonical WAV that was written.
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// capture_to_wav
// ---------------------------------------------------------------------------

/// Record `seconds` of audio from `device_name` (or the default input) and
/// write it to `out_path` as canonical mono 16 kHz 16-bit WAV.
///
/// Blocks the calling thread for the duration of the capture; run it via
/// `spawn_blocking` from async code.
pub fn capture_to_wav(
    device_name: Option<&str>,
    seconds: f64,
    out_path: &Path,
) -> Result<CaptureInfo, CaptureError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
        None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
    };
    let resolved_name = device.name().unwrap_or_else(|_| "unknown input".into());

    let supported = device.default_input_config()?;
    if supported.sample_format() != SampleFormat::F32 {
        return Err(CaptureError::UnsupportedFormat(supported.sample_format()));
    }
    let channels = supported.channels();
    let source_rate = supported.sample_rate().0;
    let config: cpal::StreamConfig = supported.into();

    log::info!(
        "capture: {resolved_name} ({source_rate} Hz, {channels} ch) for {seconds} s"
    );

    let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Ok(mut buf) = sink.lock() {
                buf.extend_from_slice(data);
            }
        },
        |err: cpal::StreamError| {
            log::error!("capture: stream error: {err}");
        },
        None,
    )?;

    stream.play()?;

    // The callback runs on cpal's audio thread; we just wait out the clock.
    let deadline = Instant::now() + Duration::from_secs_f64(seconds);
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    drop(stream);

    let interleaved = buffer
        .lock()
        .map(|b| b.clone())
        .unwrap_or_default();
    let mono = downmix_to_mono(&interleaved, channels);
    let canonical = resample_to_canonical(&mono, source_rate);

    write_canonical_wav(out_path, &canonical)?;
    log::info!(
        "capture: wrote {} ({} samples)",
        out_path.display(),
        canonical.len()
    );

    Ok(CaptureInfo {
        device: resolved_name,
        seconds,
        path: out_path.to_path_buf(),
    })
}

/// Write mono f32 samples in `[-1, 1]` as a canonical 16-bit WAV.
pub fn write_canonical_wav(path: &Path, samples: &[f32]) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: CANONICAL_SAMPLE_RATE,
        bits_per_sample: CANONICAL_BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        let clamped = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(clamped)?;
    }
    writer.finalize()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
