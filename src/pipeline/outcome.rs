//! Stage outcomes and the per-item error type.
//!
//! The fallback chain is driven by explicit outcome values, not by catching
//! and re-matching errors at the top: each stage reports either a usable
//! result or a typed reason to move on.

use thiserror::Error;

use crate::audio::{CaptureError, ConversionError};
use crate::fetch::{CaptionLine, DownloadError};
use crate::store::StoreError;
use crate::stt::SttError;

// ---------------------------------------------------------------------------
// CaptionOutcome
// ---------------------------------------------------------------------------

/// Result of the caption stage.
///
/// Caption unavailability — disabled, missing, or a flaky caption service —
/// never fails the item; it routes it to the audio path.  That is why this
/// is an outcome and not an error.
#[derive(Debug)]
pub enum CaptionOutcome {
    /// Usable caption lines, in timeline order.
    Lines(Vec<CaptionLine>),
    /// Captions cannot be used for this item; fall back to audio.
    Unavailable { reason: String },
}

// ---------------------------------------------------------------------------
// ItemError
// ---------------------------------------------------------------------------

/// A failure that sinks one item.
///
/// In batch mode these are counted and logged; they never abort the run.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The input string is neither a recognizable video reference nor a URL.
    #[error("not a usable video URL or id: {0}")]
    BadInput(String),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Recognition(#[from] SttError),

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("scanning folder failed: {0}")]
    Scan(std::io::Error),

    /// A blocking worker task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_error_preserves_stage_messages() {
        let err: ItemError = SttError::Inference("decode failed".into()).into();
        assert!(err.to_string().contains("decode failed"));

        let err: ItemError = StoreError::Corrupt {
            line: 3,
            message: "bad json".into(),
        }
        .into();
        assert!(err.to_string().contains("line 3"));
    }
}
