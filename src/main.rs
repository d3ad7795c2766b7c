//! Command-line entry point — speech-ingest.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse arguments (URLs, `--folder`, `--capture`, `--export`,
//!    `--config`).
//! 3. Load [`IngestConfig`] from disk (returns default on first run) and run
//!    the fatal validation — a bad configuration aborts before any item.
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the recognizer selected in the configuration.
//! 6. Run the requested ingestion and print the summary — always, even when
//!    every item failed.

use std::path::PathBuf;
use std::sync::Arc;

use speech_ingest::{
    config::{EngineKind, IngestConfig},
    fetch::{CaptionApiClient, YtDlpDownloader},
    pipeline::{BatchSummary, IngestPipeline},
    stt::{CloudSttEngine, SttEngine, WhisperSttEngine},
};

const USAGE: &str = "\
usage: speech-ingest [options] [url-or-id ...]

options:
  --folder <dir>     ingest every audio file under <dir> recursively
  --capture [secs]   capture system audio (default length from config)
  --export <path>    write a sentence-level labeling stub from the store
  --config <path>    load settings from <path> instead of the platform default
";

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Parsed command line.  `capture: Some(None)` means `--capture` without an
/// explicit length.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    folder: Option<PathBuf>,
    capture: Option<Option<f64>>,
    export: Option<PathBuf>,
    inputs: Vec<String>,
}

impl CliArgs {
    fn has_ingest_work(&self) -> bool {
        self.folder.is_some() || self.capture.is_some() || !self.inputs.is_empty()
    }

    fn has_work(&self) -> bool {
        self.has_ingest_work() || self.export.is_some()
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut iter = args.into_iter().peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or("--config requires a path")?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--folder" => {
                let value = iter.next().ok_or("--folder requires a directory")?;
                parsed.folder = Some(PathBuf::from(value));
            }
            "--export" => {
                let value = iter.next().ok_or("--export requires a path")?;
                parsed.export = Some(PathBuf::from(value));
            }
            "--capture" => {
                // Optional length: consume the next token only if it parses
                // as a number.
                let secs = iter.peek().and_then(|next| next.parse::<f64>().ok());
                if secs.is_some() {
                    iter.next();
                }
                parsed.capture = Some(secs);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {other}"));
            }
            _ => parsed.inputs.push(arg),
        }
    }

    Ok(parsed)
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Arguments
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            std::process::exit(2);
        }
    };
    if !args.has_work() {
        eprint!("{USAGE}");
        std::process::exit(2);
    }

    // 3. Configuration + fatal validation
    let config = match &args.config_path {
        Some(path) => IngestConfig::load_from(path),
        None => IngestConfig::load(),
    }
    .unwrap_or_else(|e| {
        log::warn!("failed to load config ({e}); using defaults");
        IngestConfig::default()
    });

    // The validation covers what the selected recognizer backend needs;
    // an export-only run touches neither backend.
    if args.has_ingest_work() {
        if let Err(e) = config.validate() {
            log::error!("configuration invalid: {e}");
            std::process::exit(1);
        }
    }

    // 4. Tokio runtime (2 workers — recognition and downloads overlap)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            log::error!("failed to create tokio runtime: {e}");
            std::process::exit(1);
        });

    let code = rt.block_on(run(args, config));
    std::process::exit(code);
}

async fn run(args: CliArgs, config: IngestConfig) -> i32 {
    let mut code = 0;

    if args.has_ingest_work() {
        code = ingest(&args, &config).await;
    }

    // Export runs after ingestion so a combined invocation exports the
    // records it just stored.
    if let Some(out) = &args.export {
        if let Err(e) = speech_ingest::store::export_label_stub(&config.store_path, out) {
            log::error!("labeling export failed: {e}");
            code = 1;
        }
    }

    code
}

async fn ingest(args: &CliArgs, config: &IngestConfig) -> i32 {
    // 5. Recognizer selection — explicit, from configuration.
    let stt: Arc<dyn SttEngine> = match config.engine {
        EngineKind::Offline => {
            let language = config.languages.first().map(String::as_str).unwrap_or("auto");
            match WhisperSttEngine::load(&config.model_path, language) {
                Ok(engine) => {
                    log::info!("whisper model loaded: {}", config.model_path.display());
                    Arc::new(engine)
                }
                Err(e) => {
                    log::error!("recognizer unavailable: {e}");
                    return 1;
                }
            }
        }
        EngineKind::Cloud => match CloudSttEngine::from_config(&config.cloud, config.chunk_secs) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                log::error!("recognizer unavailable: {e}");
                return 1;
            }
        },
    };
    log::info!("using {} recognizer", stt.name());

    let pipeline = IngestPipeline::new(
        Arc::new(CaptionApiClient::from_config(&config.captions)),
        Arc::new(YtDlpDownloader::new()),
        stt,
        config.clone(),
    );

    // 6. Run the requested work.  Per-item failures are already counted;
    //    the summary is printed no matter what.
    let mut ok = 0;
    let mut failed = 0;

    if !args.inputs.is_empty() {
        let summary = pipeline.ingest_urls(&args.inputs).await;
        ok += summary.ok;
        failed += summary.failed;
    }

    if let Some(folder) = &args.folder {
        match pipeline.ingest_folder(folder).await {
            Ok(summary) => {
                ok += summary.ok;
                failed += summary.failed;
            }
            Err(e) => {
                log::error!("folder ingestion failed: {e}");
                failed += 1;
            }
        }
    }

    if let Some(secs) = args.capture {
        match pipeline.capture_and_ingest(secs).await {
            Ok(record) => {
                log::info!("stored capture {}", record.id);
                ok += 1;
            }
            Err(e) => {
                log::error!("capture failed: {e}");
                failed += 1;
            }
        }
    }

    let summary = BatchSummary {
        ok,
        failed,
        store_path: config.store_path.clone(),
    };
    println!("done: {summary}");

    if summary.ok == 0 && summary.failed > 0 {
        1
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn urls_are_positional() {
        let parsed = args(&["https://youtu.be/dQw4w9WgXcQ", "abc12345678"]).unwrap();
        assert_eq!(parsed.inputs.len(), 2);
        assert!(parsed.folder.is_none());
        assert!(parsed.capture.is_none());
    }

    #[test]
    fn folder_and_config_take_values() {
        let parsed = args(&["--folder", "media", "--config", "alt.toml"]).unwrap();
        assert_eq!(parsed.folder, Some(PathBuf::from("media")));
        assert_eq!(parsed.config_path, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn capture_length_is_optional() {
        let parsed = args(&["--capture"]).unwrap();
        assert_eq!(parsed.capture, Some(None));

        let parsed = args(&["--capture", "12.5"]).unwrap();
        assert_eq!(parsed.capture, Some(Some(12.5)));

        // A following URL must not be eaten as the capture length.
        let parsed = args(&["--capture", "https://youtu.be/dQw4w9WgXcQ"]).unwrap();
        assert_eq!(parsed.capture, Some(None));
        assert_eq!(parsed.inputs.len(), 1);
    }

    #[test]
    fn missing_values_and_unknown_options_error() {
        assert!(args(&["--folder"]).is_err());
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn empty_args_have_no_work() {
        let parsed = args(&[]).unwrap();
        assert!(!parsed.has_work());
    }

    /// `--export` alone is valid work, but not ingest work — it must not
    /// trigger recognizer validation or construction.
    #[test]
    fn export_only_is_work_but_not_ingest_work() {
        let parsed = args(&["--export", "labels.json"]).unwrap();
        assert_eq!(parsed.export, Some(PathBuf::from("labels.json")));
        assert!(parsed.has_work());
        assert!(!parsed.has_ingest_work());
    }
}
