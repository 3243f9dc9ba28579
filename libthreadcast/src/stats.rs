//! Statistics log of published items
//!
//! The log is a CSV file with one row per published item, most recent first.
//! Rows are keyed by platform id. Saves go through a temporary file that is
//! renamed over the target, so an interrupted run leaves either the previous
//! file or the complete new one.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, StatsError};
use crate::platforms::PlatformClient;
use crate::types::{PostId, PublishedItem};

/// Column order of the statistics file
pub const COLUMNS: [&str; 7] = [
    "name",
    "timestamp",
    "permalink",
    "id",
    "favorite_count",
    "retweet_count",
    "reply_count",
];

/// In-memory statistics log; ids are unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsLog {
    items: Vec<PublishedItem>,
}

/// A counter lookup that failed during refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub id: PostId,
    pub name: String,
    pub message: String,
}

/// Outcome of a refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub skipped: usize,
    pub failures: Vec<RefreshFailure>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl StatisticsLog {
    /// Build a log from rows, rejecting duplicate ids
    pub fn new(items: Vec<PublishedItem>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id) {
                return Err(StatsError::DuplicateId(item.id).into());
            }
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[PublishedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: PostId) -> Option<&PublishedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: PostId) -> bool {
        self.get(id).is_some()
    }

    /// Most recent item whose favorite count is still unknown
    pub fn latest_open(&self) -> Option<&PublishedItem> {
        self.items.iter().find(|item| item.is_open())
    }

    /// Insert newly published items at the head.
    ///
    /// `items` are given in publish order; the last one published ends up
    /// first. Nothing is inserted if any id collides.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::DuplicateId` if an id already exists in the log
    /// or appears twice in `items`.
    pub fn append(&mut self, items: Vec<PublishedItem>) -> Result<()> {
        let mut incoming = HashSet::with_capacity(items.len());
        for item in &items {
            if self.contains(item.id) || !incoming.insert(item.id) {
                return Err(StatsError::DuplicateId(item.id).into());
            }
        }

        let count = items.len();
        for item in items {
            self.items.insert(0, item);
        }
        debug!(count, total = self.items.len(), "appended published items");
        Ok(())
    }

    /// Fill in counters for every item that is missing any of them.
    ///
    /// A failed lookup is recorded in the report and the pass continues with
    /// the next item. Known counters are only ever replaced by fetched values.
    pub async fn refresh(&mut self, client: &dyn PlatformClient) -> RefreshReport {
        let mut report = RefreshReport::default();

        for item in self.items.iter_mut() {
            if item.has_all_counters() {
                report.skipped += 1;
                continue;
            }

            match client.fetch_counters(item.id).await {
                Ok(counters) => {
                    item.apply_counters(counters);
                    report.refreshed += 1;
                    debug!(
                        id = item.id,
                        name = %item.name,
                        favorites = counters.favorite,
                        shares = counters.share,
                        replies = counters.reply,
                        "refreshed counters"
                    );
                }
                Err(e) => {
                    warn!(id = item.id, name = %item.name, error = %e, "counter refresh failed");
                    report.failures.push(RefreshFailure {
                        id: item.id,
                        name: item.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Parse CSV rows with a header line
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let items = csv_reader
            .deserialize::<PublishedItem>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StatsError::Csv)?;

        Self::new(items)
    }

    /// Write the header line followed by every row
    pub fn to_writer<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(COLUMNS).map_err(StatsError::Csv)?;
        for item in &self.items {
            csv_writer.serialize(item).map_err(StatsError::Csv)?;
        }
        csv_writer.flush().map_err(StatsError::Io)?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        Ok(buffer)
    }
}

/// Durable home of the statistics log
#[derive(Debug, Clone)]
pub struct StatisticsStore {
    path: PathBuf,
}

impl StatisticsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log; a missing file is an empty log (first run)
    pub fn load(&self) -> Result<StatisticsLog> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no statistics file yet, starting empty");
                return Ok(StatisticsLog::default());
            }
            Err(e) => return Err(StatsError::Io(e).into()),
        };

        let log = StatisticsLog::from_reader(std::io::BufReader::new(file))?;
        debug!(path = %self.path.display(), items = log.len(), "loaded statistics");
        Ok(log)
    }

    /// Replace the file with the full log via write-to-temp-then-rename
    pub fn save(&self, log: &StatisticsLog) -> Result<()> {
        let bytes = log.to_csv_bytes()?;
        let tmp_path = self.temp_path();

        if let Err(e) = write_synced(&tmp_path, &bytes) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StatsError::Persistence(format!(
                "failed to write {}: {}",
                tmp_path.display(),
                e
            ))
            .into());
        }

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            StatsError::Persistence(format!(
                "failed to rename {} to {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        info!(path = %self.path.display(), items = log.len(), "saved statistics");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "statistics".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
