//! Channel downmix and sample-rate conversion for captured audio.
//!
//! Input devices deliver whatever rate and channel count the hardware
//! prefers; the recognizers need canonical mono 16 kHz.  Conversion is a
//! linear-interpolation resampler — adequate for speech, no extra
//! dependencies.

use crate::audio::probe::CANONICAL_SAMPLE_RATE;

/// Mix interleaved multi-channel audio down to mono by averaging channels.
///
/// Output length is `samples.len() / channels`.  Already-mono input is
/// returned as an owned copy; zero channels yields an empty vector.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Resample mono `samples` from `source_rate` Hz to the canonical 16 kHz.
///
/// A source already at the canonical rate is copied through untouched.
pub fn resample_to_canonical(samples: &[f32], source_rate: u32) -> Vec<f32> {
    if source_rate == CANONICAL_SAMPLE_RATE || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(CANONICAL_SAMPLE_RATE) / f64::from(source_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = match samples.get(idx) {
            Some(&a) => match samples.get(idx + 1) {
                Some(&b) => a * (1.0 - frac) + b * frac,
                None => a,
            },
            None => 0.0,
        };
        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
