//! Run configuration, defaults, TOML persistence and the fatal start-of-run
//! validation.
//!
//! Everything the components need — model path, credentials, bucket, store
//! path, working directory, language preferences, chunk limit — is collected
//! here once and threaded in explicitly.  Leaf functions never read the
//! process environment.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// EngineKind
// ---------------------------------------------------------------------------

/// Which recognizer backend the run uses.
///
/// An explicit configuration value, passed into the orchestrator — backend
/// selection never depends on ambient environment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Local GGML model via whisper-rs.  No duration limit, word-level
    /// timing.
    Offline,
    /// Chunked synchronous HTTP recognition.  Needs credentials and a
    /// storage bucket; chunk-level timing only.
    Cloud,
}

impl Default for EngineKind {
    fn default() -> Self {
        Self::Offline
    }
}

// ---------------------------------------------------------------------------
// CloudConfig
// ---------------------------------------------------------------------------

/// Settings for the cloud recognizer backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL of the recognition endpoint.
    pub base_url: String,
    /// File containing the bearer token, read once at startup.
    pub credentials_path: PathBuf,
    /// Object-storage bucket identifier used by the provider for staging
    /// long audio.
    pub bucket: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            credentials_path: PathBuf::from("credentials.json"),
            bucket: String::new(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptionConfig
// ---------------------------------------------------------------------------

/// Settings for the caption-fetch API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// Base URL of the caption-fetch service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            // Self-hosted caption proxy by default.
            base_url: "http://localhost:8600".into(),
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for live system-audio capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Input device name — `None` means the system default.  For system
    /// output this is typically a loopback/virtual-cable device.
    pub device: Option<String>,
    /// Capture length in seconds.
    pub seconds: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            seconds: 8.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A fatal configuration problem.  Aborts the run before any item is
/// processed — distinct from per-item failures, which never do.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("recognizer model not found: {0}")]
    ModelMissing(String),

    #[error("cloud credentials file not found: {0}")]
    CredentialsMissing(String),

    #[error("cloud storage bucket is not configured")]
    BucketMissing,

    #[error("cloud base_url is not configured")]
    CloudUrlMissing,

    #[error("caption API base_url is not configured")]
    CaptionUrlMissing,

    #[error("chunk_secs must be positive, got {0}")]
    BadChunkSecs(f64),

    #[error("capture.seconds must be positive, got {0}")]
    BadCaptureSecs(f64),

    #[error("language preference list is empty")]
    NoLanguages,
}

// ---------------------------------------------------------------------------
// IngestConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level run configuration, serialised as `settings.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Recognizer backend for this run.
    pub engine: EngineKind,
    /// GGML model file for the offline backend.
    pub model_path: PathBuf,
    /// JSONL store the run appends records to.
    pub store_path: PathBuf,
    /// Working directory for downloaded and captured audio.
    pub audio_dir: PathBuf,
    /// Caption language preference, most-preferred first.
    pub languages: Vec<String>,
    /// Synchronous recognition duration limit in seconds (cloud backend).
    pub chunk_secs: f64,
    /// Caption-fetch API settings.
    pub captions: CaptionConfig,
    /// Cloud recognizer settings.
    pub cloud: CloudConfig,
    /// Live capture settings.
    pub capture: CaptureConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            model_path: PathBuf::from("models/ggml-base.bin"),
            store_path: PathBuf::from("out/records.jsonl"),
            audio_dir: PathBuf::from("out/audio"),
            languages: vec!["vi".into(), "en".into()],
            chunk_secs: 55.0,
            captions: CaptionConfig::default(),
            cloud: CloudConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(IngestConfig::default())` when the file does not exist
    /// yet so callers never special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests and `--config`).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The fatal start-of-run check: verify everything the selected backend
    /// needs before the first item is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::NoLanguages);
        }
        if !(self.chunk_secs > 0.0) {
            return Err(ConfigError::BadChunkSecs(self.chunk_secs));
        }
        if !(self.capture.seconds > 0.0) {
            return Err(ConfigError::BadCaptureSecs(self.capture.seconds));
        }
        if self.captions.base_url.trim().is_empty() {
            return Err(ConfigError::CaptionUrlMissing);
        }

        match self.engine {
            EngineKind::Offline => {
                if !self.model_path.exists() {
                    return Err(ConfigError::ModelMissing(
                        self.model_path.display().to_string(),
                    ));
                }
            }
            EngineKind::Cloud => {
                if self.cloud.base_url.trim().is_empty() {
                    return Err(ConfigError::CloudUrlMissing);
                }
                if self.cloud.bucket.trim().is_empty() {
                    return Err(ConfigError::BucketMissing);
                }
                if !self.cloud.credentials_path.exists() {
                    return Err(ConfigError::CredentialsMissing(
                        self.cloud.credentials_path.display().to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = IngestConfig::default();
        original.save_to(&path).expect("save");
        let loaded = IngestConfig::load_from(&path).expect("load");

        assert_eq!(original.engine, loaded.engine);
        assert_eq!(original.model_path, loaded.model_path);
        assert_eq!(original.store_path, loaded.store_path);
        assert_eq!(original.audio_dir, loaded.audio_dir);
        assert_eq!(original.languages, loaded.languages);
        assert_eq!(original.chunk_secs, loaded.chunk_secs);
        assert_eq!(original.captions.base_url, loaded.captions.base_url);
        assert_eq!(original.cloud.timeout_secs, loaded.cloud.timeout_secs);
        assert_eq!(original.capture.seconds, loaded.capture.seconds);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let config = IngestConfig::load_from(&dir.path().join("nope.toml")).unwrap();

        assert_eq!(config.engine, EngineKind::Offline);
        assert_eq!(config.languages, vec!["vi".to_string(), "en".to_string()]);
        assert_eq!(config.chunk_secs, 55.0);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = IngestConfig::default();
        cfg.engine = EngineKind::Cloud;
        cfg.cloud.base_url = "https://speech.example.com".into();
        cfg.cloud.bucket = "ingest-staging".into();
        cfg.languages = vec!["en".into()];
        cfg.chunk_secs = 30.0;
        cfg.capture.device = Some("CABLE Output (VB-Audio Virtual Cable)".into());

        cfg.save_to(&path).expect("save");
        let loaded = IngestConfig::load_from(&path).expect("load");

        assert_eq!(loaded.engine, EngineKind::Cloud);
        assert_eq!(loaded.cloud.base_url, "https://speech.example.com");
        assert_eq!(loaded.cloud.bucket, "ingest-staging");
        assert_eq!(loaded.languages, vec!["en".to_string()]);
        assert_eq!(loaded.chunk_secs, 30.0);
        assert_eq!(
            loaded.capture.device.as_deref(),
            Some("CABLE Output (VB-Audio Virtual Cable)")
        );
    }

    // ---- validate ----------------------------------------------------------

    #[test]
    fn offline_requires_existing_model() {
        let dir = tempdir().expect("temp dir");

        let mut cfg = IngestConfig::default();
        cfg.model_path = dir.path().join("missing-model.bin");
        assert!(matches!(cfg.validate(), Err(ConfigError::ModelMissing(_))));

        std::fs::write(&cfg.model_path, b"ggml").unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn cloud_requires_url_bucket_and_credentials() {
        let dir = tempdir().expect("temp dir");

        let mut cfg = IngestConfig::default();
        cfg.engine = EngineKind::Cloud;
        assert!(matches!(cfg.validate(), Err(ConfigError::CloudUrlMissing)));

        cfg.cloud.base_url = "https://speech.example.com".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::BucketMissing)));

        cfg.cloud.bucket = "bucket".into();
        cfg.cloud.credentials_path = dir.path().join("creds.json");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::CredentialsMissing(_))
        ));

        std::fs::write(&cfg.cloud.credentials_path, b"token").unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_scalar_values_are_rejected() {
        let mut cfg = IngestConfig::default();
        cfg.chunk_secs = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::BadChunkSecs(_))));

        let mut cfg = IngestConfig::default();
        cfg.languages = vec![];
        assert!(matches!(cfg.validate(), Err(ConfigError::NoLanguages)));

        let mut cfg = IngestConfig::default();
        cfg.capture.seconds = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::BadCaptureSecs(_))));

        let mut cfg = IngestConfig::default();
        cfg.captions.base_url = " ".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::CaptionUrlMissing)));
    }
}
