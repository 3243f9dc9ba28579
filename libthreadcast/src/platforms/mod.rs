//! Platform client abstraction
//!
//! The engine never talks to a social platform directly. It consumes a
//! [`PlatformClient`] that can upload media, publish a post (optionally as a
//! reply) and look up engagement counters. Authentication, rate limiting and
//! retries belong to the implementation.
//!
//! # Examples
//!
//! ```no_run
//! use libthreadcast::platforms::{mastodon::MastodonClient, PlatformClient};
//! use libthreadcast::types::PublishRequest;
//!
//! # async fn example() -> libthreadcast::Result<()> {
//! let mut client = MastodonClient::new(
//!     "https://mastodon.social".to_string(),
//!     "access-token".to_string(),
//! )?;
//! client.authenticate().await?;
//!
//! let post = client
//!     .publish(&PublishRequest {
//!         text: "Hello from threadcast".to_string(),
//!         media_ids: vec![],
//!         reply_to: None,
//!     })
//!     .await?;
//! println!("Published {} at {}", post.id, post.permalink);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EngagementCounters, MediaFile, MediaId, PostId, PublishRequest, PublishedPost};

pub mod mastodon;

// Public so integration tests in other crates can drive the orchestrator with it
pub mod mock;

/// Capability the engine needs from a social platform
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Lowercase platform identifier used in logs
    fn name(&self) -> &str;

    /// Verify credentials before the first network call that changes state
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if the platform rejects the credentials.
    async fn authenticate(&mut self) -> Result<()>;

    /// Upload one media file and return the platform's media id.
    ///
    /// The file's [`MediaKind`](crate::types::MediaKind) is the upload
    /// category hint (animated vs static).
    async fn upload_media(&self, media: &MediaFile) -> Result<MediaId>;

    /// Publish text with already-uploaded media, optionally as a reply
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Posting`, `Validation`, `RateLimit` or
    /// `Network` depending on how the platform failed.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost>;

    /// Fetch current engagement counters for a published item
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::NotFound` when the item no longer exists upstream.
    async fn fetch_counters(&self, id: PostId) -> Result<EngagementCounters>;
}
