//! Hand-off of the persisted statistics file
//!
//! After a run saves the log, a [`CommitSink`] makes the new file durable
//! elsewhere. The engine only promises that the file at the given path is
//! complete when the sink is called.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::CommitConfig;
use crate::error::{Result, ThreadcastError};

#[async_trait]
pub trait CommitSink: Send + Sync {
    /// Make the file at `path` the new durable state
    async fn persist_snapshot(&self, path: &Path) -> Result<()>;
}

/// Sink that does nothing; used when committing is disabled
#[derive(Debug, Clone, Default)]
pub struct NoopCommitSink;

#[async_trait]
impl CommitSink for NoopCommitSink {
    async fn persist_snapshot(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "commit disabled, leaving file uncommitted");
        Ok(())
    }
}

/// Sink that remembers every path it was handed
#[derive(Debug, Clone, Default)]
pub struct RecordingCommitSink {
    snapshots: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingCommitSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<PathBuf> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommitSink for RecordingCommitSink {
    async fn persist_snapshot(&self, path: &Path) -> Result<()> {
        self.snapshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Commits the file with git and optionally pushes it
#[derive(Debug, Clone)]
pub struct GitCommitSink {
    config: CommitConfig,
    workdir: Option<PathBuf>,
}

impl GitCommitSink {
    pub fn new(config: CommitConfig) -> Self {
        Self {
            config,
            workdir: None,
        }
    }

    /// Run git inside `dir` instead of the current directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        debug!(args = ?args, "running git");
        command
            .output()
            .await
            .map_err(|e| ThreadcastError::Commit(format!("failed to run git: {}", e)))
    }

    async fn git_checked(&self, args: &[&str]) -> Result<()> {
        let output = self.git(args).await?;
        if output.status.success() {
            return Ok(());
        }

        Err(ThreadcastError::Commit(format!(
            "git {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    fn push_refspec(&self) -> String {
        match &self.config.branch {
            Some(branch) => format!("HEAD:{}", branch),
            None => "HEAD".to_string(),
        }
    }
}

#[async_trait]
impl CommitSink for GitCommitSink {
    async fn persist_snapshot(&self, path: &Path) -> Result<()> {
        let file = path.to_string_lossy().into_owned();
        self.git_checked(&["add", "--", &file]).await?;

        // `git diff --cached --quiet` exits 0 when nothing is staged
        let staged = self.git(&["diff", "--cached", "--quiet", "--", &file]).await?;
        if staged.status.success() {
            info!(path = %path.display(), "statistics unchanged, nothing to commit");
            return Ok(());
        }

        let name = format!("user.name={}", self.config.author_name);
        let email = format!("user.email={}", self.config.author_email);
        self.git_checked(&[
            "-c",
            &name,
            "-c",
            &email,
            "commit",
            "-m",
            &self.config.message,
            "--",
            &file,
        ])
        .await?;
        info!(path = %path.display(), "committed statistics");

        if self.config.push {
            let refspec = self.push_refspec();
            self.git_checked(&["push", "origin", &refspec]).await?;
            info!(refspec = %refspec, "pushed statistics");
        }

        Ok(())
    }
}
