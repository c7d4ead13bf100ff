//! assetsync core library.
//!
//! Reconciles local build artifacts with the assets of a GitHub release:
//! trigger gating, file pattern expansion, content-type inference, the
//! release API client, and the delete-then-upload synchronizer.

pub mod config;
pub mod content_type;
pub mod errors;
pub mod github;
pub mod glob;
pub mod models;
pub mod sync_engine;
pub mod trigger;

// Re-exports for convenience.
pub use config::{ActionConfig, RunContext};
pub use github::{GitHubClient, ReleaseApi};
pub use glob::GlobResolver;
pub use sync_engine::{AssetSynchronizer, RunOutcome};
pub use trigger::{Trigger, TriggerValidator};
