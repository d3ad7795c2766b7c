//! Labeling-stub export — sentence-level rows for manual annotation.
//!
//! Downstream annotation happens per sentence, not per record, so
//! [`export_label_stub`] reads the store, splits every record's text into
//! sentences, and writes one pretty-printed JSON array of
//! `{record_id, sentence, toxic: false}` rows.  The `toxic` flag is a stub
//! for the annotator to flip by hand.

use std::fs;
use std::path::Path;

use serde_json::json;

use super::jsonl::{read_records, StoreError};

/// Split `text` into sentences: a break after `.`, `!` or `?` followed by
/// whitespace.  Trailing text without a terminator is its own sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| n.is_whitespace()) {
            let s = current.trim();
            if !s.is_empty() {
                sentences.push(s.to_string());
            }
            current.clear();
        }
    }

    let s = current.trim();
    if !s.is_empty() {
        sentences.push(s.to_string());
    }
    sentences
}

/// Read the store at `store_path` and write the sentence rows to
/// `out_path`, returning how many sentences were written.
///
/// Records without text (silent recognitions) are skipped.
pub fn export_label_stub(store_path: &Path, out_path: &Path) -> Result<usize, StoreError> {
    let records = read_records(store_path)?;

    let mut rows = Vec::new();
    for record in &records {
        let Some(text) = &record.text else { continue };
        for sentence in split_sentences(text) {
            rows.push(json!({
                "record_id": record.id,
                "sentence": sentence,
                "toxic": false,
            }));
        }
    }

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(out_path, serde_json::to_string_pretty(&rows)?)?;

    log::info!(
        "export: {} sentence(s) from {} record(s) -> {}",
        rows.len(),
        records.len(),
        out_path.display()
    );
    Ok(rows.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{transcript_record, Segment};
    use crate::store::JsonlStore;
    use tempfile::tempdir;

    // ---- split_sentences ---------------------------------------------------

    #[test]
    fn splits_on_terminators_followed_by_whitespace() {
        let sentences = split_sentences("Xin chào. Bạn khỏe không? Tốt lắm!");
        assert_eq!(sentences, vec!["Xin chào.", "Bạn khỏe không?", "Tốt lắm!"]);
    }

    #[test]
    fn interior_dots_do_not_split() {
        let sentences = split_sentences("version 1.5 shipped. done");
        assert_eq!(sentences, vec!["version 1.5 shipped.", "done"]);
    }

    #[test]
    fn text_without_terminator_is_one_sentence() {
        assert_eq!(split_sentences("no punctuation here"), vec!["no punctuation here"]);
        assert!(split_sentences("   ").is_empty());
    }

    // ---- export_label_stub -------------------------------------------------

    #[test]
    fn export_writes_one_row_per_sentence_with_stub_flag() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("records.jsonl");
        let out_path = dir.path().join("labels.json");

        let store = JsonlStore::new(&store_path);
        let langs = vec!["vi".to_string()];
        let record = transcript_record(
            "abc12345678",
            &langs,
            vec![Segment {
                start: 0.0,
                duration: 2.0,
                text: "Câu một. Câu hai.".into(),
            }],
        );
        store.append(&record).unwrap();

        let written = export_label_stub(&store_path, &out_path).unwrap();
        assert_eq!(written, 2);

        let rows: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["sentence"], "Câu một.");
        assert_eq!(rows[1]["sentence"], "Câu hai.");
        assert_eq!(rows[0]["toxic"], false);
        assert_eq!(rows[0]["record_id"], serde_json::json!(record.id));
    }

    #[test]
    fn export_of_missing_store_yields_empty_array() {
        let dir = tempdir().unwrap();
        let out_path = dir.path().join("labels.json");

        let written = export_label_stub(&dir.path().join("nope.jsonl"), &out_path).unwrap();
        assert_eq!(written, 0);
        assert_eq!(fs::read_to_string(&out_path).unwrap().trim(), "[]");
    }
}
