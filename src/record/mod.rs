//! Segment/record model and record construction.
//!
//! The shapes in [`schema`] are shared by every source adapter; [`builder`]
//! stamps ids and provenance onto them.  Nothing in this module performs I/O.

pub mod builder;
pub mod schema;

pub use builder::{capture_record, gen_id, now_iso, recognition_record, transcript_record};
pub use schema::{join_segment_texts, Fidelity, Recognition, Record, Segment, SourceType};
