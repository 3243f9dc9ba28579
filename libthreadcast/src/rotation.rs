//! Deterministic selection of the bundle that is due
//!
//! Selection never reads or writes hidden state: given the same catalog and
//! an instant inside the same rotation period, the same bundle comes back.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::SelectionStrategy;
use crate::content::Catalog;
use crate::error::{ConfigError, ContentError, Result};
use crate::stats::StatisticsLog;

/// Number of whole periods elapsed since the Unix epoch.
///
/// Instants before the epoch floor towards negative infinity.
pub fn period_index(now: DateTime<Utc>, period: Duration) -> Result<i64> {
    let period_ms = i64::try_from(period.as_millis())
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "rotation.period".to_string(),
            reason: format!("{:?} is not a usable period", period),
        })?;

    Ok(now.timestamp_millis().div_euclid(period_ms))
}

/// Pick the catalog index due at `now`: `period_index mod catalog.len()`.
///
/// # Errors
///
/// Returns `ContentError::NoContentAvailable` for an empty catalog.
pub fn select(catalog: &Catalog, now: DateTime<Utc>, period: Duration) -> Result<usize> {
    if catalog.is_empty() {
        return Err(ContentError::NoContentAvailable.into());
    }

    let index = period_index(now, period)?;
    let len = catalog.len() as i64;
    Ok(index.rem_euclid(len) as usize)
}

/// Pick a bundle by exact name, bypassing the rotation
pub fn select_by_name(catalog: &Catalog, name: &str) -> Result<usize> {
    if catalog.is_empty() {
        return Err(ContentError::NoContentAvailable.into());
    }

    catalog
        .find(name)
        .map(|(index, _)| index)
        .ok_or_else(|| ContentError::ContentNotFound(name.to_string()).into())
}

/// Pick the bundle that has gone longest without being published.
///
/// Bundles with no published part come first, in catalog order; otherwise
/// the bundle whose latest published part is oldest wins.
pub fn select_least_recent(catalog: &Catalog, log: &StatisticsLog) -> Result<usize> {
    if catalog.is_empty() {
        return Err(ContentError::NoContentAvailable.into());
    }

    let last_published = |index: usize| {
        catalog.get(index).and_then(|bundle| {
            log.items()
                .iter()
                .filter(|item| bundle.contains_part(&item.name))
                .map(|item| item.timestamp)
                .max()
        })
    };

    // None sorts before Some, so never-published bundles win; ties keep catalog order
    let index = (0..catalog.len())
        .min_by_key(|&index| (last_published(index), index))
        .unwrap_or(0);

    Ok(index)
}

/// Resolve the bundle for this run: explicit name first, then the strategy
pub fn choose(
    catalog: &Catalog,
    explicit: Option<&str>,
    strategy: SelectionStrategy,
    now: DateTime<Utc>,
    period: Duration,
    log: &StatisticsLog,
) -> Result<usize> {
    match (explicit, strategy) {
        (Some(name), _) => select_by_name(catalog, name),
        (None, SelectionStrategy::Rotation) => select(catalog, now, period),
        (None, SelectionStrategy::LeastRecent) => select_least_recent(catalog, log),
    }
}
