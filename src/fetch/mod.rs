//! Content acquisition: caption API, audio download, folder scanning.

pub mod captions;
pub mod download;
pub mod scan;

pub use captions::{video_id, CaptionApiClient, CaptionError, CaptionLine, CaptionSource};
pub use download::{AudioDownloader, DownloadError, YtDlpDownloader};
pub use scan::scan_audio_files;
