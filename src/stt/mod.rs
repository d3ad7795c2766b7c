//! Speech-to-text backends behind one capability interface.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 SttEngine (trait)                     │
//! │                                                       │
//! │  ┌────────────────────┐      ┌──────────────────────┐ │
//! │  │  WhisperSttEngine  │      │   CloudSttEngine     │ │
//! │  │  local GGML model  │      │   chunk → HTTP call  │ │
//! │  │  word-level timing │      │   chunk-level text   │ │
//! │  └────────────────────┘      └──────────────────────┘ │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! The orchestrator selects one backend from configuration and holds it as
//! `Arc<dyn SttEngine>`; the difference in timing fidelity is surfaced in
//! [`crate::record::Fidelity`], not hidden.

pub mod cloud;
pub mod engine;
pub mod whisper;

pub use cloud::CloudSttEngine;
pub use engine::{SttEngine, SttError};
pub use whisper::WhisperSttEngine;

// test-only re-export so pipeline tests can use the canned engine without
// reaching into the engine module.
#[cfg(test)]
pub use engine::MockSttEngine;
