//! Speech-content ingestion with graceful degradation.
//!
//! Turns video URLs, local audio folders, and live system audio into an
//! append-only JSONL store of text records.  Acquisition is caption-first:
//! the official caption track is fetched when one exists, and only
//! otherwise does the pipeline download audio, normalize it to mono 16 kHz
//! WAV, and run a speech recognizer (local whisper model or a chunked cloud
//! endpoint).
//!
//! Module map:
//!
//! - [`fetch`]    — caption API client, yt-dlp downloader, folder scanner
//! - [`audio`]    — normalization, probing, chunking, live capture
//! - [`stt`]      — recognizer backends behind [`stt::SttEngine`]
//! - [`record`]   — record/segment model and constructors
//! - [`store`]    — append-only JSONL persistence
//! - [`pipeline`] — the fallback-chain orchestrator
//! - [`config`]   — run configuration and validation

pub mod audio;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod stt;
