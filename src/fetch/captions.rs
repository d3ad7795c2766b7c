//! Caption fetching — the cheapest acquisition source.
//!
//! [`CaptionSource`] is the collaborator contract: given a canonical video
//! id and an ordered language preference list, return time-aligned caption
//! lines or say why they are unavailable.  "Disabled" and "not found" are
//! expected outcomes that send the orchestrator down the audio path — they
//! are not failures.
//!
//! [`video_id`] extracts the 11-character id from the forms users actually
//! paste: raw ids, watch URLs, `youtu.be` short links, embed and shorts
//! URLs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CaptionConfig;
use crate::record::Segment;

// ---------------------------------------------------------------------------
// CaptionLine
// ---------------------------------------------------------------------------

/// One caption line as returned by the caption API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionLine {
    pub text: String,
    /// Offset from the start of the video, seconds.
    pub start: f64,
    /// Display duration, seconds.
    pub duration: f64,
}

impl CaptionLine {
    /// Convert into the record-model segment shape.
    pub fn into_segment(self) -> Segment {
        Segment {
            start: self.start,
            duration: self.duration,
            text: self.text,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptionError
// ---------------------------------------------------------------------------

/// Outcomes of a caption fetch that did not produce lines.
///
/// `Disabled` and `NotFound` are the designed degrade path; `Http`/`Parse`
/// are real faults, but the orchestrator still falls back on them — a flaky
/// caption service must not block audio acquisition.
#[derive(Debug, Clone, Error)]
pub enum CaptionError {
    /// The uploader disabled captions for this video.
    #[error("captions are disabled for this video")]
    Disabled,

    /// No caption track exists for any of the preferred languages.
    #[error("no caption track found for the preferred languages")]
    NotFound,

    #[error("caption request failed: {0}")]
    Http(String),

    #[error("caption response was malformed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CaptionError {
    fn from(e: reqwest::Error) -> Self {
        CaptionError::Http(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// CaptionSource trait
// ---------------------------------------------------------------------------

/// Collaborator contract for caption acquisition.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch caption lines for `video_id`, trying `languages` in preference
    /// order.
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<Vec<CaptionLine>, CaptionError>;
}

// ---------------------------------------------------------------------------
// CaptionApiClient
// ---------------------------------------------------------------------------

/// HTTP client for the caption-fetch service.
///
/// Wire contract: `GET {base}/v1/transcripts/{id}?languages=vi,en` returns a
/// JSON array of `{text, start, duration}`; 403 means captions disabled,
/// 404 means no track for the requested languages.
pub struct CaptionApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl CaptionApiClient {
    /// Build a client from configuration.
    pub fn from_config(config: &CaptionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CaptionSource for CaptionApiClient {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<Vec<CaptionLine>, CaptionError> {
        let url = format!("{}/v1/transcripts/{video_id}", self.base_url);
        let languages = languages.join(",");

        let response = self
            .client
            .get(&url)
            .query(&[("languages", languages.as_str())])
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::FORBIDDEN => return Err(CaptionError::Disabled),
            reqwest::StatusCode::NOT_FOUND => return Err(CaptionError::NotFound),
            status if !status.is_success() => {
                return Err(CaptionError::Http(format!("HTTP {status}")));
            }
            _ => {}
        }

        let lines: Vec<CaptionLine> = response
            .json()
            .await
            .map_err(|e| CaptionError::Parse(e.to_string()))?;

        Ok(lines)
    }
}

// ---------------------------------------------------------------------------
// video_id
// ---------------------------------------------------------------------------

const ID_LEN: usize = 11;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Extract the canonical 11-character video id from `input`.
///
/// Accepts a bare id, `watch?v=`, `vi=`, `youtu.be/`, `/embed/` and
/// `/shorts/` forms.  Returns `None` when no id can be found.
pub fn video_id(input: &str) -> Option<String> {
    let s = input.trim();

    if s.len() == ID_LEN && s.chars().all(is_id_char) {
        return Some(s.to_string());
    }

    for marker in ["v=", "vi=", "youtu.be/", "/embed/", "/shorts/"] {
        if let Some(pos) = s.find(marker) {
            let tail = &s[pos + marker.len()..];
            let candidate: String = tail
                .chars()
                .take_while(|&c| is_id_char(c))
                .take(ID_LEN)
                .collect();
            if candidate.len() == ID_LEN {
                return Some(candidate);
            }
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
