//! The unified record schema shared by every source adapter.
//!
//! Every acquisition path — caption fetch, local-file STT, live system audio,
//! downloaded remote audio — ends in one [`Record`] appended to the JSONL
//! store.  The shapes here are the wire format; changing a field name changes
//! the on-disk schema.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One contiguous span of recognized or captioned speech.
///
/// # Invariants
///
/// Within a single recognition pass, segments are ordered by non-decreasing
/// `start` and do not overlap (`start_i + duration_i <= start_{i+1}`).
/// `start + duration` never exceeds the source audio's total duration when
/// that duration is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Offset from the start of the source audio, in seconds.
    pub start: f64,
    /// Span length in seconds.
    pub duration: f64,
    /// Recognized or captioned text for this span.
    pub text: String,
}

impl Segment {
    /// End offset of this segment (`start + duration`) in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Join segment texts in order into the record-level transcript.
///
/// Empty segment texts are skipped so the result never contains doubled
/// separators.  Returns `None` when nothing remains — a recognized-but-silent
/// result is persisted with `text = null`.
pub fn join_segment_texts(segments: &[Segment]) -> Option<String> {
    let joined = segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

// ---------------------------------------------------------------------------
// SourceType
// ---------------------------------------------------------------------------

/// Which acquisition path produced a [`Record`].
///
/// Serialized snake_case so store lines read `"source_type":"transcript"`,
/// `"local_audio_stt"`, `"system_audio"` or `"remote_audio_stt"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Captions fetched from the caption API — no audio touched.
    Transcript,
    /// A local audio file pushed through the recognizer.
    LocalAudioStt,
    /// Live system-audio capture pushed through the recognizer.
    SystemAudio,
    /// Audio downloaded from a remote URL, then recognized.
    RemoteAudioStt,
}

// ---------------------------------------------------------------------------
// Fidelity
// ---------------------------------------------------------------------------

/// Granularity of the time alignment a recognizer backend can deliver.
///
/// The offline engine emits utterance-level timestamps ([`Fidelity::WordLevel`]);
/// the chunked cloud mode only knows which chunk the text came from
/// ([`Fidelity::ChunkLevel`]).  The orchestrator records this trade-off in
/// `Record::meta` so downstream consumers know what the timestamps mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Fine-grained timestamps derived from word/utterance boundaries.
    WordLevel,
    /// Coarse text only — no sub-chunk timing available.
    ChunkLevel,
}

impl Fidelity {
    /// Stable string form used in `Record::meta`.
    pub fn as_str(self) -> &'static str {
        match self {
            Fidelity::WordLevel => "word_level",
            Fidelity::ChunkLevel => "chunk_level",
        }
    }
}

// ---------------------------------------------------------------------------
// Recognition
// ---------------------------------------------------------------------------

/// Normalized output of one recognizer pass over one audio file.
///
/// `text` is `None` for a recognized-but-silent input.  When both `text` and
/// `segments` are populated, `text` equals [`join_segment_texts`] over
/// `segments` — the two are produced together and never drift apart.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Full transcript, or `None` when nothing was recognized.
    pub text: Option<String>,
    /// Time-aligned segments, ordered and non-overlapping.  Empty for
    /// backends that cannot produce sub-chunk alignment.
    pub segments: Vec<Segment>,
    /// Timing granularity of `segments`.
    pub fidelity: Fidelity,
    /// Recognizer backend identifier (e.g. `"whisper"`), for provenance.
    pub engine: &'static str,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// The unified, persisted result of processing one input item.
///
/// A record is constructed exactly once per successfully processed item
/// (see [`crate::record::builder`]), appended to the store immediately, and
/// never mutated afterwards.
///
/// # Invariants
///
/// - `id` is unique within a store and generated at creation time.
/// - On successful acquisition at least one of `text` / `segments` is
///   populated; a silent result is still persisted, with `text = null`.
/// - When both `text` and `segments` are present, `text` is the ordered
///   join of the segment texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Opaque unique identifier, `<prefix>_<12 hex chars>`.
    pub id: String,
    /// Acquisition path that produced this record.
    pub source_type: SourceType,
    /// Full transcript (`null` for a silent result).
    pub text: Option<String>,
    /// Time-aligned segments, when the source provides them.
    pub segments: Option<Vec<Segment>>,
    /// Path to retained audio, when the audio artifact is kept.
    pub binary_path: Option<String>,
    /// Free-form provenance: creation timestamp, engine, language,
    /// device, duration, source identifiers.
    pub meta: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, duration: f64, text: &str) -> Segment {
        Segment {
            start,
            duration,
            text: text.into(),
        }
    }

    // ---- Segment -----------------------------------------------------------

    #[test]
    fn segment_end_is_start_plus_duration() {
        let s = seg(1.5, 2.25, "a");
        assert!((s.end() - 3.75).abs() < 1e-9);
    }

    #[test]
    fn join_segment_texts_in_order() {
        let segs = vec![seg(0.0, 1.0, "xin"), seg(1.0, 1.0, "chào"), seg(2.0, 1.0, "bạn")];
        assert_eq!(join_segment_texts(&segs).as_deref(), Some("xin chào bạn"));
    }

    #[test]
    fn join_segment_texts_skips_empty() {
        let segs = vec![seg(0.0, 1.0, "a"), seg(1.0, 1.0, "  "), seg(2.0, 1.0, "b")];
        assert_eq!(join_segment_texts(&segs).as_deref(), Some("a b"));
    }

    #[test]
    fn join_segment_texts_all_empty_is_none() {
        let segs = vec![seg(0.0, 1.0, ""), seg(1.0, 1.0, " ")];
        assert!(join_segment_texts(&segs).is_none());
        assert!(join_segment_texts(&[]).is_none());
    }

    // ---- SourceType wire names --------------------------------------------

    #[test]
    fn source_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SourceType::Transcript).unwrap(),
            r#""transcript""#
        );
        assert_eq!(
            serde_json::to_string(&SourceType::LocalAudioStt).unwrap(),
            r#""local_audio_stt""#
        );
        assert_eq!(
            serde_json::to_string(&SourceType::SystemAudio).unwrap(),
            r#""system_audio""#
        );
        assert_eq!(
            serde_json::to_string(&SourceType::RemoteAudioStt).unwrap(),
            r#""remote_audio_stt""#
        );
    }

    // ---- Record round trip -------------------------------------------------

    #[test]
    fn record_round_trips_through_json() {
        let mut meta = serde_json::Map::new();
        meta.insert("video_id".into(), "abc12345678".into());

        let rec = Record {
            id: "yt_0123456789ab".into(),
            source_type: SourceType::Transcript,
            text: Some("Xin chào".into()),
            segments: Some(vec![seg(0.0, 1.2, "Xin chào")]),
            binary_path: None,
            meta,
        };

        let line = serde_json::to_string(&rec).unwrap();
        let back: Record = serde_json::from_str(&line).unwrap();

        assert_eq!(back.id, rec.id);
        assert_eq!(back.source_type, SourceType::Transcript);
        assert_eq!(back.text.as_deref(), Some("Xin chào"));
        assert_eq!(back.segments.unwrap(), rec.segments.unwrap());
        assert_eq!(back.meta["video_id"], "abc12345678");
    }

    #[test]
    fn silent_record_serializes_null_text() {
        let rec = Record {
            id: "aud_0123456789ab".into(),
            source_type: SourceType::SystemAudio,
            text: None,
            segments: None,
            binary_path: Some("out/audio/aud_0123456789ab.wav".into()),
            meta: serde_json::Map::new(),
        };

        let line = serde_json::to_string(&rec).unwrap();
        // Silent results keep an explicit null so consumers can tell
        // "no speech" from a malformed line.
        assert!(line.contains(r#""text":null"#));
        assert!(line.contains(r#""segments":null"#));
    }

    #[test]
    fn fidelity_meta_strings() {
        assert_eq!(Fidelity::WordLevel.as_str(), "word_level");
        assert_eq!(Fidelity::ChunkLevel.as_str(), "chunk_level");
    }
}
