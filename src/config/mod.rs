//! Run configuration and platform paths.
//!
//! One [`IngestConfig`] is constructed at the start of a run, validated, and
//! threaded into every component that needs it — components never read
//! ambient environment state.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    CaptionConfig, CaptureConfig, CloudConfig, ConfigError, EngineKind, IngestConfig,
};
