//! Durable, append-only persistence for ingest records, plus the
//! sentence-level labeling export read off the store.

pub mod export;
pub mod jsonl;

pub use export::{export_label_stub, split_sentences};
pub use jsonl::{read_records, JsonlStore, StoreError};
