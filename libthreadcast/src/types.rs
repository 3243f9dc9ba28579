//! Core types for Threadcast

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-assigned identifier of a published item
pub type PostId = u64;

/// Platform-assigned identifier of an uploaded media file
pub type MediaId = String;

/// One row of the statistics log.
///
/// Counters are `None` until a refresh pass fills them in; once known they
/// are never reset to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedItem {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub permalink: String,
    pub id: PostId,
    pub favorite_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub reply_count: Option<u64>,
}

impl PublishedItem {
    /// A freshly published item with unknown counters
    pub fn new(id: PostId, name: String, timestamp: DateTime<Utc>, permalink: String) -> Self {
        Self {
            name,
            timestamp,
            permalink,
            id,
            favorite_count: None,
            retweet_count: None,
            reply_count: None,
        }
    }

    /// An item is open while its favorite count has not been fetched yet
    pub fn is_open(&self) -> bool {
        self.favorite_count.is_none()
    }

    pub fn has_all_counters(&self) -> bool {
        self.favorite_count.is_some() && self.retweet_count.is_some() && self.reply_count.is_some()
    }

    /// Fill counters from a fresh lookup
    pub fn apply_counters(&mut self, counters: EngagementCounters) {
        self.favorite_count = Some(counters.favorite);
        self.retweet_count = Some(counters.share);
        self.reply_count = Some(counters.reply);
    }
}

/// Engagement metrics reported by the platform for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub favorite: u64,
    pub share: u64,
    pub reply: u64,
}

/// Upload category hint for a media file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Animated image (gif)
    Animated,
    /// Still image (png, jpeg, webp)
    Static,
}

impl MediaKind {
    /// Categorize a media file by extension; `None` for non-media files
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "gif" => Some(Self::Animated),
            "png" | "jpg" | "jpeg" | "webp" => Some(Self::Static),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Animated => "animated",
            Self::Static => "static",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A media file attached to a part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Build from a path, categorizing by extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        MediaKind::from_extension(ext).map(|kind| Self::new(path, kind))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Arguments of a single publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub text: String,
    pub media_ids: Vec<MediaId>,
    pub reply_to: Option<PostId>,
}

/// What the platform returns for a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: PostId,
    pub permalink: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: PostId) -> PublishedItem {
        PublishedItem::new(
            id,
            "announce1".to_string(),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            format!("https://example.social/@bot/{}", id),
        )
    }

    #[test]
    fn test_new_item_is_open() {
        let item = item(7);
        assert!(item.is_open());
        assert!(!item.has_all_counters());
        assert_eq!(item.favorite_count, None);
        assert_eq!(item.retweet_count, None);
        assert_eq!(item.reply_count, None);
    }

    #[test]
    fn test_apply_counters_closes_item() {
        let mut item = item(7);
        item.apply_counters(EngagementCounters {
            favorite: 3,
            share: 1,
            reply: 0,
        });

        assert!(!item.is_open());
        assert!(item.has_all_counters());
        assert_eq!(item.favorite_count, Some(3));
        assert_eq!(item.retweet_count, Some(1));
        assert_eq!(item.reply_count, Some(0));
    }

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("gif"), Some(MediaKind::Animated));
        assert_eq!(MediaKind::from_extension("GIF"), Some(MediaKind::Animated));
        assert_eq!(MediaKind::from_extension("png"), Some(MediaKind::Static));
        assert_eq!(MediaKind::from_extension("jpeg"), Some(MediaKind::Static));
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Static));
        assert_eq!(MediaKind::from_extension("webp"), Some(MediaKind::Static));
        assert_eq!(MediaKind::from_extension("md"), None);
        assert_eq!(MediaKind::from_extension("mp4"), None);
    }

    #[test]
    fn test_media_file_from_path() {
        let media = MediaFile::from_path(Path::new("tweets/announce1.gif")).unwrap();
        assert_eq!(media.kind, MediaKind::Animated);
        assert_eq!(media.file_name(), "announce1.gif");

        assert!(MediaFile::from_path(Path::new("tweets/announce1.md")).is_none());
        assert!(MediaFile::from_path(Path::new("tweets/README")).is_none());
    }
}
