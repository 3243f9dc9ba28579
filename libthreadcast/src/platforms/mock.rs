//! Mock platform implementation for testing
//!
//! `MockPlatform` records every call with its arguments, hands out
//! sequential ids and can be told to fail at a given publish call or to
//! report items as deleted upstream. Clones share state, so a test can keep
//! one handle while the orchestrator owns another.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::PlatformClient;
use crate::types::{
    EngagementCounters, MediaFile, MediaId, MediaKind, PostId, PublishRequest, PublishedPost,
};

/// A recorded call against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Authenticate,
    Upload { file_name: String, kind: MediaKind },
    Publish(PublishRequest),
    FetchCounters(PostId),
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    pub auth_succeeds: bool,

    pub auth_error: Option<String>,

    /// Zero-based publish call that fails; earlier calls succeed
    pub fail_publish_at: Option<usize>,

    pub post_error: Option<String>,

    /// Whether media uploads should fail
    pub fail_uploads: bool,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Id handed to the first successful publish
    pub first_id: PostId,

    /// Counters returned for items without an explicit entry
    pub default_counters: EngagementCounters,

    pub calls: Arc<Mutex<Vec<MockCall>>>,

    pub counters: Arc<Mutex<HashMap<PostId, EngagementCounters>>>,

    /// Ids reported as deleted upstream
    pub missing: Arc<Mutex<HashSet<PostId>>>,

    pub published: Arc<Mutex<Vec<PublishedPost>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            auth_error: None,
            fail_publish_at: None,
            post_error: None,
            fail_uploads: false,
            delay: Duration::from_millis(0),
            first_id: 1000,
            default_counters: EngagementCounters::default(),
            calls: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(Mutex::new(HashMap::new())),
            missing: Arc::new(Mutex::new(HashSet::new())),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
#[derive(Debug, Clone)]
pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_succeeds: false,
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform whose `call`-th publish (zero-based) fails
    pub fn publish_failure_at(name: &str, call: usize, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            fail_publish_at: Some(call),
            post_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform whose media uploads fail
    pub fn upload_failure(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            fail_uploads: true,
            ..Default::default()
        })
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    /// Counters to report for `id`
    pub fn set_counters(&self, id: PostId, counters: EngagementCounters) {
        self.config.counters.lock().unwrap().insert(id, counters);
    }

    /// Report `id` as deleted upstream
    pub fn set_missing(&self, id: PostId) {
        self.config.missing.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.config.calls.lock().unwrap().clone()
    }

    /// Publish requests in call order, including failed ones
    pub fn publish_requests(&self) -> Vec<PublishRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Publish(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn published(&self) -> Vec<PublishedPost> {
        self.config.published.lock().unwrap().clone()
    }

    pub fn fetched_ids(&self) -> Vec<PostId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::FetchCounters(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Upload { .. }))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.config.calls.lock().unwrap().push(call);
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn authenticate(&mut self) -> Result<()> {
        self.record(MockCall::Authenticate);
        self.simulate_latency().await;

        if self.config.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .auth_error
                .clone()
                .unwrap_or_else(|| "Mock authentication failed".to_string());
            Err(PlatformError::Authentication(error_msg).into())
        }
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<MediaId> {
        self.record(MockCall::Upload {
            file_name: media.file_name(),
            kind: media.kind,
        });

        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }
        self.simulate_latency().await;

        if self.config.fail_uploads {
            return Err(PlatformError::Posting(format!(
                "Mock upload of {} failed",
                media.file_name()
            ))
            .into());
        }

        Ok(format!("media-{}", media.file_name()))
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost> {
        let call_index = self.publish_requests().len();
        self.record(MockCall::Publish(request.clone()));

        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }
        self.simulate_latency().await;

        if self.config.fail_publish_at == Some(call_index) {
            let error_msg = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            return Err(PlatformError::Posting(error_msg).into());
        }

        let mut published = self.config.published.lock().unwrap();
        let id = self.config.first_id + published.len() as PostId;
        let post = PublishedPost {
            id,
            permalink: format!("https://{}.example/status/{}", self.config.name, id),
        };
        published.push(post.clone());
        Ok(post)
    }

    async fn fetch_counters(&self, id: PostId) -> Result<EngagementCounters> {
        self.record(MockCall::FetchCounters(id));
        self.simulate_latency().await;

        if self.config.missing.lock().unwrap().contains(&id) {
            return Err(PlatformError::NotFound(format!("status {}", id)).into());
        }

        Ok(self
            .config
            .counters
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(self.config.default_counters))
    }
}
