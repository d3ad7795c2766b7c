//! Audio download via an external downloader tool.
//!
//! [`AudioDownloader`] is the collaborator contract: download the best audio
//! track for a URL into a directory and return the path of the file that was
//! produced.  Callers never guess at output names — resolving what the tool
//! actually wrote is the adapter's job.
//!
//! [`YtDlpDownloader`] shells out to `yt-dlp`.  The tool derives the output
//! file name from video metadata, so the adapter snapshots the directory
//! before the run and diffs it afterwards; if the diff is empty (the file
//! already existed from an earlier run) it falls back to the most recently
//! modified file in the directory.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

// ---------------------------------------------------------------------------
// DownloadError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DownloadError {
    /// `yt-dlp` is not installed or not on PATH.
    #[error("downloader tool not found (is yt-dlp installed and on PATH?)")]
    ToolMissing,

    #[error("downloader exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },

    /// The tool reported success but no output file could be resolved.
    #[error("downloader produced no output file in {dir}")]
    NoOutput { dir: PathBuf },

    #[error("download I/O error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// AudioDownloader trait
// ---------------------------------------------------------------------------

/// Collaborator contract for audio acquisition from a remote URL.
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    /// Download the audio track of `url` into `out_dir` and return the path
    /// of the downloaded file.
    async fn download(&self, url: &str, out_dir: &Path) -> Result<PathBuf, DownloadError>;
}

// ---------------------------------------------------------------------------
// YtDlpDownloader
// ---------------------------------------------------------------------------

/// Downloads best-quality audio with `yt-dlp`, extracting to mp3.
#[derive(Debug, Default)]
pub struct YtDlpDownloader;

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioDownloader for YtDlpDownloader {
    async fn download(&self, url: &str, out_dir: &Path) -> Result<PathBuf, DownloadError> {
        std::fs::create_dir_all(out_dir)?;
        let before = list_files(out_dir)?;

        let template = out_dir.join("%(title).200B-%(id)s.%(ext)s");
        let output = Command::new("yt-dlp")
            .arg("--no-playlist")
            .arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--audio-quality")
            .arg("192K")
            .arg("-o")
            .arg(&template)
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    DownloadError::ToolMissing
                } else {
                    DownloadError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.chars().rev().take(400).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(DownloadError::ToolFailed {
                status: output.status.to_string(),
                stderr: tail.trim().to_string(),
            });
        }

        resolve_output(out_dir, &before)
    }
}

// ---------------------------------------------------------------------------
// Output resolution
// ---------------------------------------------------------------------------

/// Pick the file the downloader wrote: prefer a file that did not exist
/// before the run, falling back to the newest file in the directory when the
/// download was a re-run over an existing file.
fn resolve_output(dir: &Path, before: &HashSet<PathBuf>) -> Result<PathBuf, DownloadError> {
    let after = list_files(dir)?;
    let mut fresh: Vec<&PathBuf> = after.difference(before).collect();

    if fresh.len() == 1 {
        return Ok(fresh.remove(0).clone());
    }
    if fresh.len() > 1 {
        // Multiple new files (e.g. leftover fragments); take the newest.
        if let Some(path) = newest_file_of(fresh.iter().map(|p| p.as_path()))? {
            return Ok(path);
        }
    }

    newest_file_of(after.iter().map(|p| p.as_path()))?
        .ok_or_else(|| DownloadError::NoOutput { dir: dir.to_path_buf() })
}

fn list_files(dir: &Path) -> io::Result<HashSet<PathBuf>> {
    let mut files = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.insert(entry.path());
        }
    }
    Ok(files)
}

fn newest_file_of<'a, I>(paths: I) -> io::Result<Option<PathBuf>>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for path in paths {
        let modified = std::fs::metadata(path)?.modified()?;
        match &newest {
            Some((t, _)) if *t >= modified => {}
            _ => newest = Some((modified, path.to_path_buf())),
        }
    }
    Ok(newest.map(|(_, p)| p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
