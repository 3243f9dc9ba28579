//! One publishing run from statistics load to commit
//!
//! Stages run strictly in order:
//!
//! ```text
//! Idle -> StatsLoaded -> StatsRefreshed -> Selected -> Threaded
//!      -> Publishing(0..n) -> Appended -> Persisted -> Committed
//! ```
//!
//! Any stage may end the run in `Failed`. When a part fails to publish, the
//! parts before it are still appended, saved and committed before the
//! failure is returned, because they exist on the platform.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::commit::CommitSink;
use crate::config::{Config, SelectionStrategy, ThreadMode};
use crate::content::{ContentBundle, ContentRepository};
use crate::error::{ContentError, PlatformError, Result, ThreadcastError};
use crate::platforms::PlatformClient;
use crate::rotation;
use crate::stats::{RefreshReport, StatisticsLog, StatisticsStore};
use crate::thread::{self, PublishPlan};
use crate::types::{PostId, PublishRequest, PublishedItem, PublishedPost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    StatsLoaded,
    StatsRefreshed,
    Selected,
    Threaded,
    Publishing(usize),
    Appended,
    Persisted,
    Committed,
    Failed,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStage::Idle => write!(f, "idle"),
            RunStage::StatsLoaded => write!(f, "loading statistics"),
            RunStage::StatsRefreshed => write!(f, "refreshing statistics"),
            RunStage::Selected => write!(f, "selecting content"),
            RunStage::Threaded => write!(f, "building thread"),
            RunStage::Publishing(i) => write!(f, "publishing part {}", i + 1),
            RunStage::Appended => write!(f, "recording published items"),
            RunStage::Persisted => write!(f, "saving statistics"),
            RunStage::Committed => write!(f, "committing statistics"),
            RunStage::Failed => write!(f, "failed"),
        }
    }
}

/// A fatal error together with the stage it happened in
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct RunFailure {
    pub stage: RunStage,
    #[source]
    pub error: ThreadcastError,
}

impl RunFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Explicit bundle name; bypasses the selection strategy
    pub bundle: Option<String>,
    pub strategy: SelectionStrategy,
    pub period: Duration,
    pub thread_mode: ThreadMode,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            bundle: None,
            strategy: config.rotation.strategy,
            period: config.rotation.period_duration()?,
            thread_mode: config.thread.mode,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub plan: PublishPlan,
    /// Items published by this run, in publish order
    pub published: Vec<PublishedItem>,
    pub refresh: RefreshReport,
}

pub struct PublishOrchestrator {
    repository: ContentRepository,
    store: StatisticsStore,
    client: Box<dyn PlatformClient>,
    sink: Box<dyn CommitSink>,
    options: RunOptions,
    stage: RunStage,
}

impl PublishOrchestrator {
    pub fn new(
        repository: ContentRepository,
        store: StatisticsStore,
        client: Box<dyn PlatformClient>,
        sink: Box<dyn CommitSink>,
        options: RunOptions,
    ) -> Self {
        Self {
            repository,
            store,
            client,
            sink,
            options,
            stage: RunStage::Idle,
        }
    }

    /// Last stage reached; `Failed` after an unrecoverable error
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn advance(&mut self, stage: RunStage) {
        self.stage = stage;
        info!(stage = %stage, "stage reached");
    }

    fn fail(&mut self, stage: RunStage, error: ThreadcastError) -> RunFailure {
        self.stage = RunStage::Failed;
        RunFailure { stage, error }
    }

    /// Execute one run at instant `now`
    pub async fn run(&mut self, now: DateTime<Utc>) -> std::result::Result<RunReport, RunFailure> {
        let mut log = match self.store.load() {
            Ok(log) => log,
            Err(e) => return Err(self.fail(RunStage::StatsLoaded, e)),
        };
        self.advance(RunStage::StatsLoaded);

        let refresh = match self.authenticate_and_refresh(&mut log).await {
            Ok(report) => report,
            Err(e) => return Err(self.fail(RunStage::StatsRefreshed, e)),
        };
        self.advance(RunStage::StatsRefreshed);

        let bundle = match select_bundle(&self.repository, &self.options, &log, now) {
            Ok(bundle) => bundle,
            Err(e) => return Err(self.fail(RunStage::Selected, e)),
        };
        self.advance(RunStage::Selected);

        let plan = match build_plan(&bundle, &self.options, &log) {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(RunStage::Threaded, e)),
        };
        self.advance(RunStage::Threaded);

        let (published, publish_error) = self.publish_plan(&plan, now).await;
        let recorded = self.record(&mut log, &published).await;

        // A failed part outranks a failure to record the parts before it
        if let Some((index, source)) = publish_error {
            if let Err(failure) = &recorded {
                warn!(
                    stage = %failure.stage,
                    error = %failure.error,
                    published = published.len(),
                    "could not record partially published thread"
                );
            }
            let error = ThreadcastError::Publish {
                published: published.len(),
                total: plan.len(),
                source,
            };
            return Err(self.fail(RunStage::Publishing(index), error));
        }
        recorded?;

        Ok(RunReport {
            plan,
            published,
            refresh,
        })
    }

    /// Append, save and commit whatever was published
    async fn record(
        &mut self,
        log: &mut StatisticsLog,
        published: &[PublishedItem],
    ) -> std::result::Result<(), RunFailure> {
        if let Err(e) = log.append(published.to_vec()) {
            return Err(self.fail(RunStage::Appended, e));
        }
        self.advance(RunStage::Appended);

        if let Err(e) = self.store.save(log) {
            return Err(self.fail(RunStage::Persisted, e));
        }
        self.advance(RunStage::Persisted);

        if let Err(e) = self.sink.persist_snapshot(self.store.path()).await {
            return Err(self.fail(RunStage::Committed, e));
        }
        self.advance(RunStage::Committed);
        Ok(())
    }

    async fn authenticate_and_refresh(&mut self, log: &mut StatisticsLog) -> Result<RefreshReport> {
        self.client.authenticate().await?;

        let report = log.refresh(self.client.as_ref()).await;
        if !report.is_complete() {
            let ids: Vec<PostId> = report.failures.iter().map(|f| f.id).collect();
            warn!(
                failed = report.failures.len(),
                refreshed = report.refreshed,
                ids = ?ids,
                "some engagement counters could not be refreshed"
            );
        } else {
            info!(refreshed = report.refreshed, skipped = report.skipped, "statistics refreshed");
        }
        Ok(report)
    }

    /// Publish every step in order, stopping at the first failure
    async fn publish_plan(
        &mut self,
        plan: &PublishPlan,
        now: DateTime<Utc>,
    ) -> (Vec<PublishedItem>, Option<(usize, PlatformError)>) {
        let mut published: Vec<PublishedItem> = Vec::with_capacity(plan.len());

        for (index, step) in plan.steps.iter().enumerate() {
            self.advance(RunStage::Publishing(index));
            let ids: Vec<PostId> = published.iter().map(|item| item.id).collect();

            match self.publish_step(plan, index, &ids).await {
                Ok(post) => {
                    info!(name = %step.name, id = post.id, url = %post.permalink, "published");
                    published.push(PublishedItem::new(post.id, step.name.clone(), now, post.permalink));
                }
                Err(e) => {
                    warn!(name = %step.name, error = %e, "publish failed, stopping thread");
                    return (published, Some((index, into_platform_error(e))));
                }
            }
        }

        (published, None)
    }

    async fn publish_step(
        &self,
        plan: &PublishPlan,
        index: usize,
        published_ids: &[PostId],
    ) -> Result<PublishedPost> {
        let step = &plan.steps[index];

        let uploads = step.media.iter().map(|media| self.client.upload_media(media));
        let media_ids = try_join_all(uploads).await?;

        let request = PublishRequest {
            text: step.text.clone(),
            media_ids,
            reply_to: plan.resolve_reply(index, published_ids),
        };
        self.client.publish(&request).await
    }
}

fn select_bundle(
    repository: &ContentRepository,
    options: &RunOptions,
    log: &StatisticsLog,
    now: DateTime<Utc>,
) -> Result<ContentBundle> {
    let catalog = repository.scan()?;
    let index = rotation::choose(
        &catalog,
        options.bundle.as_deref(),
        options.strategy,
        now,
        options.period,
        log,
    )?;

    let bundle = catalog
        .get(index)
        .cloned()
        .ok_or(ContentError::NoContentAvailable)?;
    info!(bundle = %bundle.name, index, catalog = catalog.len(), "bundle selected");
    Ok(bundle)
}

fn build_plan(bundle: &ContentBundle, options: &RunOptions, log: &StatisticsLog) -> Result<PublishPlan> {
    let continue_from = match options.thread_mode {
        ThreadMode::Continue => log.latest_open().map(|item| item.id),
        ThreadMode::Fresh => None,
    };

    let plan = thread::build(bundle, continue_from)?;
    info!(
        bundle = %plan.bundle,
        parts = plan.len(),
        reply_to = ?continue_from,
        "thread planned"
    );
    Ok(plan)
}

/// Load, select and plan without contacting the platform or writing anything.
///
/// Counters are not refreshed, so in continue mode the reply target is the
/// latest open item as stored on disk.
pub fn preview(
    repository: &ContentRepository,
    store: &StatisticsStore,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> std::result::Result<PublishPlan, RunFailure> {
    let log = store.load().map_err(|error| RunFailure {
        stage: RunStage::StatsLoaded,
        error,
    })?;
    let bundle = select_bundle(repository, options, &log, now).map_err(|error| RunFailure {
        stage: RunStage::Selected,
        error,
    })?;
    build_plan(&bundle, options, &log).map_err(|error| RunFailure {
        stage: RunStage::Threaded,
        error,
    })
}

fn into_platform_error(error: ThreadcastError) -> PlatformError {
    match error {
        ThreadcastError::Platform(e) => e,
        other => PlatformError::Posting(other.to_string()),
    }
}

/// Refresh counters without publishing, then save and commit
pub async fn refresh_statistics(
    store: &StatisticsStore,
    client: &mut dyn PlatformClient,
    sink: &dyn CommitSink,
) -> Result<(StatisticsLog, RefreshReport)> {
    let mut log = store.load()?;
    client.authenticate().await?;

    let report = log.refresh(&*client).await;
    if !report.is_complete() {
        warn!(failed = report.failures.len(), "some engagement counters could not be refreshed");
    }

    store.save(&log)?;
    sink.persist_snapshot(store.path()).await?;
    Ok((log, report))
}
