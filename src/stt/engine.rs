//! Recognizer backend interface.
//!
//! [`SttEngine`] is the seam between the orchestrator and the concrete
//! recognizers.  It is object-safe and `Send + Sync` so an engine can be
//! selected once from configuration and held behind `Arc<dyn SttEngine>`.
//!
//! [`MockSttEngine`] (`#[cfg(test)]`) is a canned-response double used to
//! test the pipeline without a model file or network.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::Recognition;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors the recognition subsystem can surface.
///
/// Variants carry strings rather than source errors so the type stays
/// `Clone` — the pipeline test doubles replay configured responses.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The acoustic model file/directory was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The backend failed to initialise (bad model file, unreadable
    /// credentials, client construction failure).
    #[error("recognizer initialisation failed: {0}")]
    EngineInit(String),

    /// The supplied audio is not canonical mono 16 kHz 16-bit WAV.
    #[error("malformed audio — expected mono 16 kHz 16-bit WAV: {0}")]
    BadAudio(String),

    /// The inference pass itself failed.
    #[error("recognition failed: {0}")]
    Inference(String),

    /// Chunked cloud recognition got nothing back for any chunk.  Partial
    /// chunk failures degrade instead of raising this.
    #[error("all {chunks} audio chunk(s) failed cloud recognition")]
    AllChunksFailed { chunks: usize },

    /// Chunking the audio for a duration-limited backend failed.
    #[error("audio chunking failed: {0}")]
    Chunking(String),

    #[error("audio I/O failed: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface over recognizer backends.
///
/// # Contract
///
/// - `wav` must point at canonical audio (mono, 16 kHz, 16-bit PCM WAV);
///   implementations reject anything else with [`SttError::BadAudio`].
/// - A successful pass returns segments ordered by non-decreasing start
///   and non-overlapping, with `text` equal to the ordered join of segment
///   texts (or `None` alongside empty segments for a silent input).
/// - Implementations clean up any temporary artifacts they create (chunk
///   files) on every exit path.
#[async_trait]
pub trait SttEngine: Send + Sync {
    /// Recognize the canonical audio file at `wav`.
    async fn recognize(&self, wav: &Path) -> Result<Recognition, SttError>;

    /// Stable backend identifier for logs and record provenance.
    fn name(&self) -> &'static str;
}

// Compile-time assertion: the trait must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// Test double replaying a configured response and counting invocations.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<Recognition, SttError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    /// Mock that recognizes `text` as a single segment spanning `duration`.
    pub fn ok(text: &str, duration: f64) -> Self {
        use crate::record::{Fidelity, Segment};
        Self::with_response(Ok(Recognition {
            text: Some(text.to_string()),
            segments: vec![Segment {
                start: 0.0,
                duration,
                text: text.to_string(),
            }],
            fidelity: Fidelity::WordLevel,
            engine: "mock",
        }))
    }

    /// Mock that recognizes silence: `text = None`, no segments.
    pub fn silent() -> Self {
        use crate::record::Fidelity;
        Self::with_response(Ok(Recognition {
            text: None,
            segments: vec![],
            fidelity: Fidelity::WordLevel,
            engine: "mock",
        }))
    }

    /// Mock that always fails with `error`.
    pub fn err(error: SttError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<Recognition, SttError>) -> Self {
        Self {
            response,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// How many times `recognize` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SttEngine for MockSttEngine {
    async fn recognize(&self, _wav: &Path) -> Result<Recognition, SttError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
