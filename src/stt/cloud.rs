//! Cloud recognizer — synchronous HTTP recognition, one call per chunk.
//!
//! The provider cannot stream arbitrarily long audio synchronously, so the
//! engine cuts the canonical file into bounded windows (see
//! [`crate::audio::chunk`]) and issues one request per window.  In this mode
//! the provider returns no sub-chunk word timestamps, so the result carries
//! chunk-level fidelity: text only, no segments.  The orchestrator records
//! that trade-off in the persisted meta.
//!
//! A failed chunk is logged and contributes empty text — one bad window must
//! not discard an otherwise-good transcription.  Only a pass where *no*
//! chunk succeeds is an error.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::chunk::chunk_wav;
use crate::config::CloudConfig;
use crate::record::{Fidelity, Recognition};
use crate::stt::engine::{SttEngine, SttError};

// ---------------------------------------------------------------------------
// CloudSttEngine
// ---------------------------------------------------------------------------

/// Chunked HTTP recognizer client.
///
/// Credentials are read once at construction from the configured credentials
/// file and sent as a bearer token; the storage bucket identifier rides
/// along as a query parameter for providers that stage long audio through
/// object storage.
pub struct CloudSttEngine {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: String,
    chunk_secs: f64,
}

impl std::fmt::Debug for CloudSttEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudSttEngine")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("chunk_secs", &self.chunk_secs)
            .finish_non_exhaustive()
    }
}

impl CloudSttEngine {
    /// Build the engine from configuration.
    ///
    /// `chunk_secs` is the provider's synchronous duration limit.  Reads the
    /// credentials file eagerly so a missing/empty token fails at startup,
    /// not on the first item.
    pub fn from_config(cloud: &CloudConfig, chunk_secs: f64) -> Result<Self, SttError> {
        let token = std::fs::read_to_string(&cloud.credentials_path)
            .map_err(|e| {
                SttError::EngineInit(format!(
                    "cannot read credentials {}: {e}",
                    cloud.credentials_path.display()
                ))
            })?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(SttError::EngineInit(format!(
                "credentials file {} is empty",
                cloud.credentials_path.display()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cloud.timeout_secs))
            .build()
            .map_err(|e| SttError::EngineInit(e.to_string()))?;

        Ok(Self {
            client,
            base_url: cloud.base_url.trim_end_matches('/').to_string(),
            bucket: cloud.bucket.clone(),
            token,
            chunk_secs,
        })
    }

    /// Recognize one chunk file, returning its transcript text.
    async fn recognize_chunk(&self, path: &Path) -> Result<String, SttError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SttError::Io(format!("{}: {e}", path.display())))?;

        let url = format!("{}/v1/speech:recognize", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("bucket", self.bucket.as_str())])
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(bytes)
            .send()
            .await
            .map_err(|e| SttError::Inference(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SttError::Inference(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SttError::Inference(format!("unparseable response: {e}")))?;

        json["text"]
            .as_str()
            .map(|t| t.to_string())
            .ok_or_else(|| SttError::Inference("response missing \"text\" field".into()))
    }
}

/// Merge per-chunk outcomes into the pass-level transcript.
///
/// Failed chunks contribute empty text (degraded result); a pass where every
/// chunk failed is [`SttError::AllChunksFailed`].  Successful transcripts
/// are joined with a single space in chunk order.
fn merge_chunk_results(results: Vec<Result<String, SttError>>) -> Result<Option<String>, SttError> {
    let total = results.len();
    let mut ok = 0usize;
    let mut parts: Vec<String> = Vec::new();

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(text) => {
                ok += 1;
                let text = text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
            Err(e) => {
                log::warn!("cloud: chunk {}/{total} failed ({e}) — contributing empty text", i + 1);
            }
        }
    }

    if ok == 0 && total > 0 {
        return Err(SttError::AllChunksFailed { chunks: total });
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join(" ")))
    }
}

#[async_trait]
impl SttEngine for CloudSttEngine {
    async fn recognize(&self, wav: &Path) -> Result<Recognition, SttError> {
        // ChunkSet removes the chunk files when it goes out of scope, on
        // every exit path below.
        let chunks = chunk_wav(wav, self.chunk_secs).map_err(|e| SttError::Chunking(e.to_string()))?;
        log::debug!(
            "cloud: {} -> {} chunk(s) of <= {} s",
            wav.display(),
            chunks.len(),
            self.chunk_secs
        );

        let mut results = Vec::with_capacity(chunks.len());
        for path in chunks.paths() {
            results.push(self.recognize_chunk(path).await);
        }

        let text = merge_chunk_results(results)?;

        Ok(Recognition {
            text,
            // No sub-chunk timestamps in synchronous mode.
            segments: Vec::new(),
            fidelity: Fidelity::ChunkLevel,
            engine: self.name(),
        })
    }

    fn name(&self) -> &'static str {
        "cloud"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
