//! Record construction — fresh ids, provenance metadata, no I/O.
//!
//! Each constructor assembles a [`Record`] from a source fetcher's output
//! plus (where applicable) recognizer output.  Construction is pure: inputs
//! are never mutated, and a new unique id is generated per call.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::record::schema::{join_segment_texts, Record, Recognition, Segment, SourceType};

// ---------------------------------------------------------------------------
// Ids and timestamps
// ---------------------------------------------------------------------------

/// Generate a record id of the form `<prefix>_<12 hex chars>`.
///
/// The hex tail comes from a v4 UUID, so ids are unique within a store for
/// any realistic record count.
pub fn gen_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..12])
}

/// Current UTC time as an RFC-3339 string with second precision
/// (e.g. `2026-08-30T12:34:56Z`), used for the `created_at` meta field.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// Build a `source_type = transcript` record from fetched caption segments.
///
/// `text` is derived by joining the segment texts in order, so the two
/// fields can never disagree.
pub fn transcript_record(video_id: &str, languages: &[String], segments: Vec<Segment>) -> Record {
    let mut meta = Map::new();
    meta.insert("video_id".into(), json!(video_id));
    meta.insert("languages".into(), json!(languages));
    meta.insert("created_at".into(), json!(now_iso()));

    Record {
        id: gen_id("yt"),
        source_type: SourceType::Transcript,
        text: join_segment_texts(&segments),
        segments: Some(segments),
        binary_path: None,
        meta,
    }
}

/// Build a record from a recognizer pass over an audio file.
///
/// `source_type` distinguishes local-scan input from downloaded remote audio;
/// `duration_secs` is the source file's duration when known.  The audio file
/// itself is referenced in `meta.file_path` but not claimed as a retained
/// binary — callers that keep the artifact set `binary_path` via
/// [`capture_record`] or by hand.
pub fn recognition_record(
    source_type: SourceType,
    source_path: &Path,
    recognition: &Recognition,
    duration_secs: Option<f64>,
) -> Record {
    let mut meta = Map::new();
    meta.insert(
        "file_name".into(),
        json!(source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()),
    );
    meta.insert("file_path".into(), json!(source_path.display().to_string()));
    meta.insert("duration".into(), duration_opt(duration_secs));
    meta.insert("engine".into(), json!(recognition.engine));
    meta.insert("fidelity".into(), json!(recognition.fidelity.as_str()));
    meta.insert("created_at".into(), json!(now_iso()));

    Record {
        id: gen_id("stt"),
        source_type,
        text: recognition.text.clone(),
        segments: if recognition.segments.is_empty() {
            None
        } else {
            Some(recognition.segments.clone())
        },
        binary_path: None,
        meta,
    }
}

/// Build a `source_type = system_audio` record from a live capture.
///
/// The capture WAV is the only copy of the audio, so it is retained and
/// referenced via `binary_path`.
pub fn capture_record(
    wav_path: &Path,
    device: &str,
    seconds: f64,
    recognition: &Recognition,
) -> Record {
    let mut meta = Map::new();
    meta.insert("device".into(), json!(device));
    meta.insert("sec".into(), json!(seconds));
    meta.insert("sr".into(), json!(16_000));
    meta.insert("channels".into(), json!(1));
    meta.insert("engine".into(), json!(recognition.engine));
    meta.insert("fidelity".into(), json!(recognition.fidelity.as_str()));
    meta.insert("created_at".into(), json!(now_iso()));

    Record {
        id: gen_id("aud"),
        source_type: SourceType::SystemAudio,
        text: recognition.text.clone(),
        segments: if recognition.segments.is_empty() {
            None
        } else {
            Some(recognition.segments.clone())
        },
        binary_path: Some(wav_path.display().to_string()),
        meta,
    }
}

fn duration_opt(duration_secs: Option<f64>) -> Value {
    match duration_secs {
        Some(d) => json!(d),
        None => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
