//! Offline recognizer backed by a local GGML Whisper model.
//!
//! The model is loaded once when the engine is constructed and shared,
//! read-only, across every `recognize` call; a fresh `WhisperState` is
//! created per call so no locking is needed.  Inference is pushed onto the
//! blocking thread pool so the async pipeline never stalls on it.
//!
//! Engine timestamps arrive per completed utterance; [`fold_segments`] turns
//! them into the ordered, non-overlapping [`Segment`]s the record model
//! requires.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::probe::probe;
use crate::record::{join_segment_texts, Fidelity, Recognition, Segment};
use crate::stt::engine::{SttEngine, SttError};

// ---------------------------------------------------------------------------
// Audio loading
// ---------------------------------------------------------------------------

/// Read a canonical WAV into mono f32 samples, returning `(samples, duration)`.
///
/// Non-canonical headers are rejected here with [`SttError::BadAudio`] —
/// the engine must never feed the model audio at the wrong rate.
pub(crate) fn read_canonical_samples(wav: &Path) -> Result<(Vec<f32>, f64), SttError> {
    let info = probe(wav).map_err(|e| SttError::BadAudio(format!("{}: {e}", wav.display())))?;
    if !info.is_canonical() {
        return Err(SttError::BadAudio(format!(
            "{}: {} ch, {} Hz, {} bit",
            wav.display(),
            info.channels,
            info.sample_rate,
            info.bits_per_sample
        )));
    }

    let mut reader =
        hound::WavReader::open(wav).map_err(|e| SttError::Io(format!("{}: {e}", wav.display())))?;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| f32::from(v) / 32_768.0))
        .collect::<Result<_, _>>()
        .map_err(|e| SttError::Io(format!("{}: {e}", wav.display())))?;

    Ok((samples, info.duration_secs()))
}

// ---------------------------------------------------------------------------
// Segment folding
// ---------------------------------------------------------------------------

/// One utterance as emitted by the engine, timestamps in seconds.
#[derive(Debug, Clone)]
pub(crate) struct RawUtterance {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Fold engine utterances into record segments.
///
/// Enforces the segment invariants: empty texts are dropped, timestamps are
/// clamped to `total_secs` (when known), and each segment starts no earlier
/// than the previous one ended.  The engine pads short audio to its 30 s
/// window and can hallucinate utterances past the real end of the file;
/// anything starting at or beyond `total_secs` is discarded outright.
pub(crate) fn fold_segments(utterances: Vec<RawUtterance>, total_secs: f64) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::with_capacity(utterances.len());
    let mut prev_end = 0.0_f64;

    for utt in utterances {
        let text = utt.text.trim();
        if text.is_empty() {
            continue;
        }

        let start = utt.start.max(prev_end);
        if total_secs > 0.0 && start >= total_secs {
            continue;
        }
        let mut end = utt.end;
        if total_secs > 0.0 {
            end = end.min(total_secs);
        }
        let duration = (end - start).max(0.0);

        prev_end = start + duration;
        segments.push(Segment {
            start,
            duration,
            text: text.to_string(),
        });
    }

    segments
}

// ---------------------------------------------------------------------------
// WhisperSttEngine
// ---------------------------------------------------------------------------

struct WhisperInner {
    ctx: WhisperContext,
    language: String,
}

// `WhisperContext` holds a raw pointer internally but whisper-rs declares it
// Send+Sync — the model weights are read-only after loading.  `language` is
// an owned String.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperInner {}
unsafe impl Sync for WhisperInner {}

/// Offline STT engine wrapping a `whisper_rs::WhisperContext`.
pub struct WhisperSttEngine {
    inner: Arc<WhisperInner>,
}

impl std::fmt::Debug for WhisperSttEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperSttEngine")
            .field("language", &self.inner.language)
            .finish_non_exhaustive()
    }
}

impl WhisperSttEngine {
    /// Load a GGML model from `model_path` for transcription in `language`
    /// (ISO-639-1 code, or `"auto"` for engine-side detection).
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_path` does not exist.
    /// - [`SttError::EngineInit`] — whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, language: &str) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::EngineInit(e.to_string()))?;

        log::info!("whisper: model loaded from {}", path.display());
        Ok(Self {
            inner: Arc::new(WhisperInner {
                ctx,
                language: language.to_string(),
            }),
        })
    }
}

impl WhisperInner {
    /// Run one full inference pass.  Blocking; called from `spawn_blocking`.
    fn run(&self, samples: &[f32]) -> Result<Vec<RawUtterance>, SttError> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        let lang: Option<&str> = if self.language == "auto" {
            None
        } else {
            Some(self.language.as_str())
        };
        params.set_language(lang);
        params.set_n_threads(optimal_threads());
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::EngineInit(e.to_string()))?;

        state
            .full(params, samples)
            .map_err(|e| SttError::Inference(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Inference(e.to_string()))?;

        let mut utterances = Vec::with_capacity(n_segments as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Inference(format!("segment {i}: {e}")))?;
            // Engine timestamps are centiseconds.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as f64 * 0.01;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as f64 * 0.01;
            utterances.push(RawUtterance {
                start: t0,
                end: t1,
                text,
            });
        }

        Ok(utterances)
    }
}

/// Threads handed to the engine, capped at 8 — more shows no gain.
fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

#[async_trait]
impl SttEngine for WhisperSttEngine {
    async fn recognize(&self, wav: &Path) -> Result<Recognition, SttError> {
        let (samples, total_secs) = read_canonical_samples(wav)?;

        let inner = Arc::clone(&self.inner);
        let utterances = tokio::task::spawn_blocking(move || inner.run(&samples))
            .await
            .map_err(|e| SttError::Inference(format!("inference task failed: {e}")))??;

        let segments = fold_segments(utterances, total_secs);
        let text = join_segment_texts(&segments);

        Ok(Recognition {
            text,
            segments,
            fidelity: Fidelity::WordLevel,
            engine: self.name(),
        })
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
