//! Ingestion orchestrator — drives the caption-first fallback chain and
//! appends one record per successful item to the JSONL store.
//!
//! # Chain
//!
//! ```text
//! ingest_url(input)
//!   ├─▶ captions available ──────────────────▶ transcript record
//!   └─▶ captions unavailable
//!         └─▶ download audio (yt-dlp)
//!               └─▶ normalize (mono 16 kHz WAV)
//!                     └─▶ recognize (offline or cloud engine)
//!                           └─▶ remote_audio_stt record
//! ```
//!
//! `ingest_folder` and `capture_and_ingest` enter the same chain at the
//! normalize stage with local files or a fresh capture.
//!
//! Blocking work (the ffmpeg transcode, the live capture) is pushed onto
//! `tokio::task::spawn_blocking` so the async runtime never stalls.  Batch
//! runs isolate failures: one bad item is logged and counted, never fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{normalize, probe};
use crate::config::IngestConfig;
use crate::fetch::{video_id, AudioDownloader, CaptionSource};
use crate::record::{
    capture_record, recognition_record, transcript_record, Record, SourceType,
};
use crate::store::JsonlStore;
use crate::stt::SttEngine;

use super::outcome::{CaptionOutcome, ItemError};

// ---------------------------------------------------------------------------
// BatchSummary
// ---------------------------------------------------------------------------

/// Counters for a batch run, printed at the end no matter what failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items that produced a stored record.
    pub ok: usize,
    /// Items that sank with a per-item error.
    pub failed: usize,
    /// Where the records went.
    pub store_path: PathBuf,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.ok + self.failed
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ok, {} failed → {}",
            self.ok,
            self.failed,
            self.store_path.display()
        )
    }
}

// ---------------------------------------------------------------------------
// IngestPipeline
// ---------------------------------------------------------------------------

/// Drives the full acquisition chain for URLs, folders, and live capture.
///
/// Collaborators are injected as trait objects so tests can run the chain
/// with canned caption/download/recognizer doubles.
pub struct IngestPipeline {
    captions: Arc<dyn CaptionSource>,
    downloader: Arc<dyn AudioDownloader>,
    stt: Arc<dyn SttEngine>,
    store: JsonlStore,
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(
        captions: Arc<dyn CaptionSource>,
        downloader: Arc<dyn AudioDownloader>,
        stt: Arc<dyn SttEngine>,
        config: IngestConfig,
    ) -> Self {
        let store = JsonlStore::new(config.store_path.clone());
        Self {
            captions,
            downloader,
            stt,
            store,
            config,
        }
    }

    /// The store this pipeline appends to.
    pub fn store(&self) -> &JsonlStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // URL ingestion
    // -----------------------------------------------------------------------

    /// Ingest a batch of URLs in submission order.
    ///
    /// Every item runs the full chain; failures are logged and counted, and
    /// the remaining items still run.
    pub async fn ingest_urls(&self, inputs: &[String]) -> BatchSummary {
        let mut ok = 0;
        let mut failed = 0;

        for input in inputs {
            match self.ingest_url(input).await {
                Ok(record) => {
                    log::info!("stored {} ({})", record.id, input);
                    ok += 1;
                }
                Err(e) => {
                    log::error!("item failed ({input}): {e}");
                    failed += 1;
                }
            }
        }

        BatchSummary {
            ok,
            failed,
            store_path: self.store.path().to_path_buf(),
        }
    }

    /// Ingest one URL or bare video id: captions first, audio recognition
    /// as the fallback.  Returns the record that was appended.
    pub async fn ingest_url(&self, input: &str) -> Result<Record, ItemError> {
        let (caption_outcome, download_target) = match video_id(input) {
            Some(id) => {
                let outcome = self.try_captions(&id).await;
                if let CaptionOutcome::Lines(lines) = outcome {
                    let segments = lines.into_iter().map(|l| l.into_segment()).collect();
                    let record = transcript_record(&id, &self.config.languages, segments);
                    self.store.append(&record)?;
                    return Ok(record);
                }
                // The downloader needs a real URL; a bare id is rebuilt into
                // the canonical watch form.
                let target = if looks_like_url(input) {
                    input.to_string()
                } else {
                    watch_url(&id)
                };
                (outcome, target)
            }
            None if looks_like_url(input) => (
                CaptionOutcome::Unavailable {
                    reason: "no video id in input".into(),
                },
                input.to_string(),
            ),
            None => return Err(ItemError::BadInput(input.to_string())),
        };

        if let CaptionOutcome::Unavailable { reason } = &caption_outcome {
            log::info!("captions unavailable ({reason}); falling back to audio for {input}");
        }

        let downloaded = self
            .downloader
            .download(&download_target, &self.config.audio_dir)
            .await?;
        log::debug!("downloaded {}", downloaded.display());

        let (wav, duration) = self.normalized(&downloaded).await?;
        // Delete the derived temp WAV after recognition; the downloaded
        // media itself is retained in the working directory.
        let _scratch = ScratchFile::when_distinct(&wav, &downloaded);

        let recognition = self.stt.recognize(&wav).await?;
        let record =
            recognition_record(SourceType::RemoteAudioStt, &downloaded, &recognition, duration);
        self.store.append(&record)?;
        Ok(record)
    }

    /// Fetch captions for `id`, degrading every fetch error to
    /// [`CaptionOutcome::Unavailable`].
    async fn try_captions(&self, id: &str) -> CaptionOutcome {
        match self.captions.fetch(id, &self.config.languages).await {
            Ok(lines) if !lines.is_empty() => CaptionOutcome::Lines(lines),
            Ok(_) => CaptionOutcome::Unavailable {
                reason: "caption track was empty".into(),
            },
            Err(e) => CaptionOutcome::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Folder ingestion
    // -----------------------------------------------------------------------

    /// Ingest every audio file under `dir`, recursively, in sorted order.
    pub async fn ingest_folder(&self, dir: &Path) -> Result<BatchSummary, ItemError> {
        let files = crate::fetch::scan_audio_files(dir).map_err(ItemError::Scan)?;
        log::info!("found {} audio file(s) under {}", files.len(), dir.display());

        let mut ok = 0;
        let mut failed = 0;

        for file in &files {
            match self.ingest_file(file).await {
                Ok(record) => {
                    log::info!("stored {} ({})", record.id, file.display());
                    ok += 1;
                }
                Err(e) => {
                    log::error!("item failed ({}): {e}", file.display());
                    failed += 1;
                }
            }
        }

        Ok(BatchSummary {
            ok,
            failed,
            store_path: self.store.path().to_path_buf(),
        })
    }

    /// Ingest one local audio file: normalize → recognize → store.
    pub async fn ingest_file(&self, file: &Path) -> Result<Record, ItemError> {
        let (wav, duration) = self.normalized(file).await?;
        let _scratch = ScratchFile::when_distinct(&wav, file);

        let recognition = self.stt.recognize(&wav).await?;
        let record = recognition_record(SourceType::LocalAudioStt, file, &recognition, duration);
        self.store.append(&record)?;
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Live capture
    // -----------------------------------------------------------------------

    /// Capture `seconds` of system audio (or the configured default length)
    /// and ingest it.  The capture WAV is retained and referenced from the
    /// record, so a silent capture still persists with `text = null`.
    pub async fn capture_and_ingest(&self, seconds: Option<f64>) -> Result<Record, ItemError> {
        let seconds = seconds.unwrap_or(self.config.capture.seconds);
        let device = self.config.capture.device.clone();
        let out_path = self
            .config
            .audio_dir
            .join(format!("{}.wav", crate::record::gen_id("aud")));

        let path = out_path.clone();
        let info = tokio::task::spawn_blocking(move || {
            crate::audio::capture_to_wav(device.as_deref(), seconds, &path)
        })
        .await
        .map_err(|e| ItemError::Task(e.to_string()))??;

        let recognition = self.stt.recognize(&info.path).await?;
        let record = capture_record(&info.path, &info.device, info.seconds, &recognition);
        self.store.append(&record)?;
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Normalize stage
    // -----------------------------------------------------------------------

    /// Run the blocking transcode off the async runtime and probe the result
    /// for its duration.
    async fn normalized(&self, input: &Path) -> Result<(PathBuf, Option<f64>), ItemError> {
        let input = input.to_path_buf();
        let wav = tokio::task::spawn_blocking(move || normalize(&input))
            .await
            .map_err(|e| ItemError::Task(e.to_string()))??;

        let duration = match probe(&wav) {
            Ok(info) => Some(info.duration_secs()),
            Err(e) => {
                log::warn!("could not probe {} for duration: {e}", wav.display());
                None
            }
        };
        Ok((wav, duration))
    }
}

// ---------------------------------------------------------------------------
// ScratchFile
// ---------------------------------------------------------------------------

/// Removes a derived temp file on drop, covering early returns from the
/// recognize and store stages.
struct ScratchFile(Option<PathBuf>);

impl ScratchFile {
    /// Guard `derived` only when it is a separate file from `source`; the
    /// normalize fast path returns the input unchanged, and inputs are never
    /// deleted.
    fn when_distinct(derived: &Path, source: &Path) -> Self {
        if derived == source {
            Self(None)
        } else {
            Self(Some(derived.to_path_buf()))
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("could not remove temp file {}: {e}", path.display());
                }
            }
        }
    }
}

fn looks_like_url(input: &str) -> bool {
    let s = input.trim();
    s.starts_with("http://") || s.starts_with("https://")
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::audio::{CANONICAL_BITS_PER_SAMPLE, CANONICAL_SAMPLE_RATE};
    use crate::fetch::{CaptionError, CaptionLine, DownloadError};
    use crate::stt::MockSttEngine;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Canned caption source.
    struct MockCaptions {
        response: Result<Vec<CaptionLine>, CaptionError>,
    }

    impl MockCaptions {
        fn lines(lines: Vec<CaptionLine>) -> Self {
            Self {
                response: Ok(lines),
            }
        }

        fn err(error: CaptionError) -> Self {
            Self {
                response: Err(error),
            }
        }
    }

    #[async_trait]
    impl CaptionSource for MockCaptions {
        async fn fetch(
            &self,
            _video_id: &str,
            _languages: &[String],
        ) -> Result<Vec<CaptionLine>, CaptionError> {
            self.response.clone()
        }
    }

    /// Downloader double that writes a small canonical WAV (so the normalize
    /// fast path applies and no transcoder is needed) and counts calls.
    /// Inputs containing "bad" fail.
    struct MockDownloader {
        calls: AtomicUsize,
        urls: std::sync::Mutex<Vec<String>>,
    }

    impl MockDownloader {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                urls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AudioDownloader for MockDownloader {
        async fn download(&self, url: &str, out_dir: &Path) -> Result<PathBuf, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            if url.contains("bad") {
                return Err(DownloadError::ToolFailed {
                    status: "exit status: 1".into(),
                    stderr: "unavailable".into(),
                });
            }
            std::fs::create_dir_all(out_dir)?;
            let n = self.calls.load(Ordering::SeqCst);
            let path = out_dir.join(format!("clip{n}.wav"));
            write_canonical_wav(&path, 1600);
            Ok(path)
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn write_canonical_wav(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: CANONICAL_SAMPLE_RATE,
            bits_per_sample: CANONICAL_BITS_PER_SAMPLE,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn line(text: &str, start: f64, duration: f64) -> CaptionLine {
        CaptionLine {
            text: text.into(),
            start,
            duration,
        }
    }

    struct Fixture {
        pipeline: IngestPipeline,
        downloader: Arc<MockDownloader>,
        _dir: tempfile::TempDir,
    }

    fn fixture(captions: MockCaptions, stt: MockSttEngine) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = IngestConfig::default();
        config.store_path = dir.path().join("records.jsonl");
        config.audio_dir = dir.path().join("audio");

        let downloader = Arc::new(MockDownloader::new());
        let pipeline = IngestPipeline::new(
            Arc::new(captions),
            Arc::clone(&downloader) as Arc<dyn AudioDownloader>,
            Arc::new(stt),
            config,
        );
        Fixture {
            pipeline,
            downloader,
            _dir: dir,
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// A caption hit is terminal: no download, no recognition.
    #[tokio::test]
    async fn caption_hit_skips_download_entirely() {
        let f = fixture(
            MockCaptions::lines(vec![line("Xin chào", 0.0, 1.2)]),
            MockSttEngine::silent(),
        );

        let record = f.pipeline.ingest_url("abc12345678").await.unwrap();

        assert_eq!(record.source_type, SourceType::Transcript);
        assert_eq!(record.text.as_deref(), Some("Xin chào"));
        assert_eq!(f.downloader.calls(), 0);

        let stored = f.pipeline.store().read_records().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
    }

    /// A caption miss falls through to exactly one download + recognition.
    #[tokio::test]
    async fn caption_miss_falls_back_to_audio() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::ok("hello from audio", 2.0),
        );

        let record = f
            .pipeline
            .ingest_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(record.source_type, SourceType::RemoteAudioStt);
        assert_eq!(record.text.as_deref(), Some("hello from audio"));
        assert_eq!(f.downloader.calls(), 1);
        // Duration probed from the 1600-frame canonical WAV.
        assert_eq!(record.meta["duration"], 0.1);
    }

    /// Caption service faults degrade exactly like a caption miss.
    #[tokio::test]
    async fn caption_http_fault_still_falls_back() {
        let f = fixture(
            MockCaptions::err(CaptionError::Http("connection refused".into())),
            MockSttEngine::ok("recovered", 1.0),
        );

        let record = f
            .pipeline
            .ingest_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(record.source_type, SourceType::RemoteAudioStt);
    }

    /// One bad item in a batch is counted, and the rest still land in the
    /// store in submission order.
    #[tokio::test]
    async fn batch_isolates_failures_and_preserves_order() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::ok("spoken", 1.0),
        );

        let inputs = vec![
            "https://youtu.be/aaaaaaaaaaa".to_string(),
            "https://youtu.be/bad0bad0bad".to_string(),
            "https://youtu.be/ccccccccccc".to_string(),
        ];
        let summary = f.pipeline.ingest_urls(&inputs).await;

        assert_eq!(summary.ok, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);

        let stored = f.pipeline.store().read_records().unwrap();
        assert_eq!(stored.len(), 2);
        // First and third item, in submission order.
        assert_eq!(
            stored[0].meta["file_name"].as_str().unwrap(),
            "clip1.wav"
        );
        assert_eq!(
            stored[1].meta["file_name"].as_str().unwrap(),
            "clip3.wav"
        );
    }

    /// A bare video id that misses captions must reach the downloader as a
    /// real watch URL — yt-dlp rejects a non-URL argument.
    #[tokio::test]
    async fn bare_id_fallback_downloads_via_watch_url() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::ok("spoken", 1.0),
        );

        let record = f.pipeline.ingest_url("abc12345678").await.unwrap();
        assert_eq!(record.source_type, SourceType::RemoteAudioStt);
        assert_eq!(
            f.downloader.urls(),
            vec!["https://www.youtube.com/watch?v=abc12345678".to_string()]
        );
    }

    /// A full URL is handed to the downloader untouched.
    #[tokio::test]
    async fn url_fallback_downloads_the_original_url() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::ok("spoken", 1.0),
        );

        let url = "https://youtu.be/dQw4w9WgXcQ";
        f.pipeline.ingest_url(url).await.unwrap();
        assert_eq!(f.downloader.urls(), vec![url.to_string()]);
    }

    #[test]
    fn batch_summary_displays_counts_and_store_path() {
        let summary = BatchSummary {
            ok: 2,
            failed: 1,
            store_path: PathBuf::from("out/records.jsonl"),
        };
        assert_eq!(summary.to_string(), "2 ok, 1 failed → out/records.jsonl");
    }

    /// Garbage input that is neither an id nor a URL fails fast.
    #[tokio::test]
    async fn garbage_input_is_bad_input() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::silent(),
        );

        let err = f.pipeline.ingest_url("not a url at all").await.unwrap_err();
        assert!(matches!(err, ItemError::BadInput(_)));
        assert_eq!(f.downloader.calls(), 0);
    }

    /// Recognizing silence still persists a record with `text = null`.
    #[tokio::test]
    async fn silent_audio_persists_record_with_null_text() {
        let f = fixture(MockCaptions::err(CaptionError::NotFound), MockSttEngine::silent());

        let record = f
            .pipeline
            .ingest_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert!(record.text.is_none());

        let stored = f.pipeline.store().read_records().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].text.is_none());
    }

    /// A recognizer failure sinks the item but leaves the store untouched.
    #[tokio::test]
    async fn recognizer_failure_stores_nothing() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::err(crate::stt::SttError::Inference("boom".into())),
        );

        let err = f
            .pipeline
            .ingest_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(err, ItemError::Recognition(_)));
        assert!(f.pipeline.store().read_records().unwrap().is_empty());
    }

    /// Folder ingestion walks the tree in sorted order and tags records as
    /// local audio.
    #[tokio::test]
    async fn folder_ingestion_stores_local_audio_records() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::ok("from disk", 1.0),
        );

        let audio_dir = tempfile::tempdir().unwrap();
        write_canonical_wav(&audio_dir.path().join("a.wav"), 160);
        write_canonical_wav(&audio_dir.path().join("b.wav"), 160);

        let summary = f.pipeline.ingest_folder(audio_dir.path()).await.unwrap();
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.failed, 0);

        let stored = f.pipeline.store().read_records().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored
            .iter()
            .all(|r| r.source_type == SourceType::LocalAudioStt));
        assert_eq!(stored[0].meta["file_name"].as_str().unwrap(), "a.wav");
        assert_eq!(stored[1].meta["file_name"].as_str().unwrap(), "b.wav");
    }

    /// Canonical local input is not deleted by the scratch-file guard.
    #[tokio::test]
    async fn canonical_input_file_is_retained() {
        let f = fixture(
            MockCaptions::err(CaptionError::NotFound),
            MockSttEngine::ok("kept", 1.0),
        );

        let audio_dir = tempfile::tempdir().unwrap();
        let wav = audio_dir.path().join("keep.wav");
        write_canonical_wav(&wav, 160);

        f.pipeline.ingest_file(&wav).await.unwrap();
        assert!(wav.exists());
    }
}
