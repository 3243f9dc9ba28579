//! Threadcast - rotating thread publisher
//!
//! This library picks one content bundle per rotation period from a
//! directory of numbered text and media files, publishes it as a reply
//! chain, and keeps a CSV log of everything published with its engagement
//! counters.

pub mod commit;
pub mod config;
pub mod content;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod platforms;
pub mod rotation;
pub mod stats;
pub mod thread;
pub mod types;

// Re-export commonly used types
pub use commit::{CommitSink, GitCommitSink, NoopCommitSink};
pub use config::Config;
pub use content::{Catalog, ContentBundle, ContentRepository};
pub use credentials::Credentials;
pub use error::{Result, ThreadcastError};
pub use orchestrator::{PublishOrchestrator, RunFailure, RunOptions, RunReport, RunStage};
pub use platforms::PlatformClient;
pub use stats::{RefreshReport, StatisticsLog, StatisticsStore};
pub use thread::PublishPlan;
pub use types::{PostId, PublishedItem};
