//! Content repository scanning
//!
//! A content root holds bundles either as flat files sharing a base name
//! (`announce.md`, `announce1.md`, `announce1.png`) or as one subdirectory per
//! bundle. Every text file is one part; media files attach to the part whose
//! name prefixes their stem.
//!
//! # Examples
//!
//! ```no_run
//! use libthreadcast::content::ContentRepository;
//!
//! # fn example() -> libthreadcast::Result<()> {
//! let catalog = ContentRepository::new("tweets").scan()?;
//! for bundle in catalog.bundles() {
//!     println!("{} ({} parts)", bundle.name, bundle.parts.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ContentError, Result};
use crate::types::MediaFile;

/// Extensions recognized as text parts
pub const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Ordering key derived from a part's file stem.
///
/// Parts without a numeric suffix sort first, then by number, then by
/// whatever follows the number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PartKey {
    pub index: Option<u64>,
    pub tail: String,
}

/// One publishable unit: exactly one text payload plus optional media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub key: PartKey,
    pub text_path: PathBuf,
    pub text: String,
    pub media: Vec<MediaFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBundle {
    pub name: String,
    pub parts: Vec<Part>,
}

impl ContentBundle {
    pub fn contains_part(&self, part_name: &str) -> bool {
        self.parts.iter().any(|p| p.name == part_name)
    }
}

/// Bundles ordered by base name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    bundles: Vec<ContentBundle>,
}

impl Catalog {
    /// Build a catalog, dropping empty bundles and sorting by name
    pub fn new(mut bundles: Vec<ContentBundle>) -> Self {
        bundles.retain(|b| {
            if b.parts.is_empty() {
                debug!(bundle = %b.name, "excluding bundle without parts");
            }
            !b.parts.is_empty()
        });
        bundles.sort_by(|a, b| a.name.cmp(&b.name));
        Self { bundles }
    }

    pub fn bundles(&self) -> &[ContentBundle] {
        &self.bundles
    }

    pub fn get(&self, index: usize) -> Option<&ContentBundle> {
        self.bundles.get(index)
    }

    pub fn find(&self, name: &str) -> Option<(usize, &ContentBundle)> {
        self.bundles.iter().enumerate().find(|(_, b)| b.name == name)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

/// Read-only scanner over a content root
#[derive(Debug, Clone)]
pub struct ContentRepository {
    root: PathBuf,
}

impl ContentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root directory into a catalog.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::MalformedBundle` when a part has two text files,
    /// a media file has no owning text part, a text file is empty, or two
    /// bundles resolve to the same base name. IO failures surface as
    /// `ContentError::Io`.
    pub fn scan(&self) -> Result<Catalog> {
        let mut flat_files = Vec::new();
        let mut bundles = Vec::new();

        for path in sorted_entries(&self.root)? {
            if path.is_dir() {
                let dir_name = file_name(&path);
                let files: Vec<PathBuf> = sorted_entries(&path)?
                    .into_iter()
                    .filter(|p| {
                        if p.is_dir() {
                            debug!(path = %p.display(), "ignoring nested directory");
                        }
                        p.is_file()
                    })
                    .collect();
                let mut found = assemble(&files, |_| Ok(dir_name.clone()))?;
                if found.is_empty() {
                    debug!(bundle = %dir_name, "directory holds no text parts");
                }
                for part in found.iter_mut().flat_map(|b| b.parts.iter_mut()) {
                    part.name = format!("{}/{}", dir_name, part.name);
                }
                bundles.append(&mut found);
            } else if path.is_file() {
                flat_files.push(path);
            }
        }

        for bundle in assemble(&flat_files, flat_base_name)? {
            if bundles.iter().any(|b: &ContentBundle| b.name == bundle.name) {
                return Err(ContentError::MalformedBundle {
                    bundle: bundle.name,
                    reason: "defined both as a directory and as flat files".to_string(),
                }
                .into());
            }
            bundles.push(bundle);
        }

        let catalog = Catalog::new(bundles);
        debug!(root = %self.root.display(), bundles = catalog.len(), "scanned content");
        Ok(catalog)
    }
}

struct PartBuilder {
    text_path: PathBuf,
    media: Vec<MediaFile>,
}

/// Group files into bundles; `bundle_of` maps a part stem to its bundle name
fn assemble<F>(files: &[PathBuf], bundle_of: F) -> Result<Vec<ContentBundle>>
where
    F: Fn(&str) -> std::result::Result<String, ContentError>,
{
    let mut parts: BTreeMap<String, PartBuilder> = BTreeMap::new();
    let mut media = Vec::new();

    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            if let Some(existing) = parts.get(stem) {
                return Err(ContentError::MalformedBundle {
                    bundle: bundle_of(stem)?,
                    reason: format!(
                        "part '{}' has more than one text file ({} and {})",
                        stem,
                        file_name(&existing.text_path),
                        file_name(path)
                    ),
                }
                .into());
            }
            parts.insert(
                stem.to_string(),
                PartBuilder {
                    text_path: path.clone(),
                    media: Vec::new(),
                },
            );
        } else if let Some(file) = MediaFile::from_path(path) {
            media.push((stem.to_string(), file));
        } else {
            debug!(path = %path.display(), "ignoring file with unknown extension");
        }
    }

    for (stem, file) in media {
        let owner = parts
            .keys()
            .filter(|part| owns(part, &stem))
            .max_by_key(|part| part.len())
            .cloned();
        match owner {
            Some(part) => {
                if let Some(builder) = parts.get_mut(&part) {
                    builder.media.push(file);
                }
            }
            None => {
                return Err(ContentError::MalformedBundle {
                    bundle: bundle_of(&stem).unwrap_or_else(|_| stem.clone()),
                    reason: format!("media file {} has no text part", file.file_name()),
                }
                .into());
            }
        }
    }

    let mut grouped: BTreeMap<String, Vec<Part>> = BTreeMap::new();
    for (name, mut builder) in parts {
        let bundle = bundle_of(&name)?;
        let text = std::fs::read_to_string(&builder.text_path).map_err(ContentError::Io)?;
        let text = text.trim_end().to_string();
        if text.trim().is_empty() {
            return Err(ContentError::MalformedBundle {
                bundle,
                reason: format!("text file {} is empty", file_name(&builder.text_path)),
            }
            .into());
        }

        builder.media.sort_by_key(|m| m.file_name());
        let (_, key) = split_stem(&name);
        grouped.entry(bundle).or_default().push(Part {
            name,
            key,
            text_path: builder.text_path,
            text,
            media: builder.media,
        });
    }

    Ok(grouped
        .into_iter()
        .map(|(name, mut parts)| {
            parts.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.name.cmp(&b.name)));
            ContentBundle { name, parts }
        })
        .collect())
}

/// Split a stem into the text before its first digit and its ordering key
pub fn split_stem(stem: &str) -> (&str, PartKey) {
    let Some(start) = stem.find(|c: char| c.is_ascii_digit()) else {
        return (stem, PartKey::default());
    };

    let rest = &stem[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    let key = match rest[..end].parse::<u64>() {
        Ok(index) => PartKey {
            index: Some(index),
            tail: rest[end..].to_string(),
        },
        Err(_) => PartKey {
            index: None,
            tail: rest.to_string(),
        },
    };

    (&stem[..start], key)
}

fn flat_base_name(stem: &str) -> std::result::Result<String, ContentError> {
    let (prefix, _) = split_stem(stem);
    let base = prefix.trim_end_matches(['-', '_', '.', ' ']);
    if base.is_empty() {
        return Err(ContentError::MalformedBundle {
            bundle: stem.to_string(),
            reason: "file name has no base name before its part number".to_string(),
        });
    }
    Ok(base.to_string())
}

/// `part` owns a media stem when it prefixes it and no digit follows
fn owns(part: &str, media_stem: &str) -> bool {
    media_stem
        .strip_prefix(part)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(ContentError::Io)? {
        let path = entry.map_err(ContentError::Io)?.path();
        if file_name(&path).starts_with('.') {
            continue;
        }
        entries.push(path);
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThreadcastError;
    use crate::types::MediaKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn malformed_reason(result: Result<Catalog>) -> String {
        match result {
            Err(ThreadcastError::Content(ContentError::MalformedBundle { reason, .. })) => reason,
            other => panic!("Expected MalformedBundle, got {:?}", other),
        }
    }

    #[test]
    fn test_split_stem() {
        assert_eq!(split_stem("announce"), ("announce", PartKey::default()));
        assert_eq!(
            split_stem("announce12"),
            (
                "announce",
                PartKey {
                    index: Some(12),
                    tail: String::new()
                }
            )
        );
        assert_eq!(
            split_stem("release-2b"),
            (
                "release-",
                PartKey {
                    index: Some(2),
                    tail: "b".to_string()
                }
            )
        );
    }

    #[test]
    fn test_part_key_ordering() {
        let (_, none) = split_stem("a");
        let (_, two) = split_stem("a2");
        let (_, ten) = split_stem("a10");
        let (_, ten_b) = split_stem("a10b");

        assert!(none < two);
        assert!(two < ten);
        assert!(ten < ten_b);
    }

    #[test]
    fn test_scan_flat_bundles() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "announce2.md", "second");
        write(dir.path(), "announce10.md", "tenth");
        write(dir.path(), "announce1.md", "first\n");
        write(dir.path(), "announce1.png", "png");
        write(dir.path(), "announce1-anim.gif", "gif");
        write(dir.path(), "weekly.md", "weekly news");
        write(dir.path(), "notes.json", "{}");

        let catalog = ContentRepository::new(dir.path()).scan().unwrap();
        assert_eq!(catalog.len(), 2);

        let announce = catalog.get(0).unwrap();
        assert_eq!(announce.name, "announce");
        let names: Vec<_> = announce.parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["announce1", "announce2", "announce10"]);

        let first = &announce.parts[0];
        assert_eq!(first.text, "first");
        let media: Vec<_> = first.media.iter().map(|m| (m.file_name(), m.kind)).collect();
        assert_eq!(
            media,
            vec![
                ("announce1-anim.gif".to_string(), MediaKind::Animated),
                ("announce1.png".to_string(), MediaKind::Static),
            ]
        );
        assert!(announce.parts[2].media.is_empty());

        let weekly = catalog.get(1).unwrap();
        assert_eq!(weekly.name, "weekly");
        assert_eq!(weekly.parts.len(), 1);
        assert_eq!(weekly.parts[0].key, PartKey::default());
    }

    #[test]
    fn test_unsuffixed_part_orders_first() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "intro1.md", "one");
        write(dir.path(), "intro.md", "root");

        let catalog = ContentRepository::new(dir.path()).scan().unwrap();
        let parts: Vec<_> = catalog.get(0).unwrap().parts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(parts, vec!["root", "one"]);
    }

    #[test]
    fn test_media_does_not_attach_to_numeric_prefix() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a1.md", "one");
        write(dir.path(), "a10.md", "ten");
        write(dir.path(), "a10.png", "png");

        let catalog = ContentRepository::new(dir.path()).scan().unwrap();
        let bundle = catalog.get(0).unwrap();
        assert!(bundle.parts[0].media.is_empty());
        assert_eq!(bundle.parts[1].media.len(), 1);
    }

    #[test]
    fn test_scan_directory_bundles() {
        let dir = TempDir::new().unwrap();
        let release = dir.path().join("release");
        fs::create_dir(&release).unwrap();
        write(&release, "2.md", "two");
        write(&release, "1.md", "one");
        write(&release, "1.jpg", "jpg");
        fs::create_dir(dir.path().join("empty")).unwrap();

        let catalog = ContentRepository::new(dir.path()).scan().unwrap();
        assert_eq!(catalog.len(), 1);

        let bundle = catalog.find("release").unwrap().1;
        let texts: Vec<_> = bundle.parts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(bundle.parts[0].name, "release/1");
        assert_eq!(bundle.parts[0].media.len(), 1);
    }

    #[test]
    fn test_two_text_files_for_one_part_is_malformed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "announce1.md", "markdown");
        write(dir.path(), "announce1.txt", "plain");

        let reason = malformed_reason(ContentRepository::new(dir.path()).scan());
        assert!(reason.contains("more than one text file"));
    }

    #[test]
    fn test_media_without_text_is_malformed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "announce1.md", "one");
        write(dir.path(), "announce2.png", "png");

        let reason = malformed_reason(ContentRepository::new(dir.path()).scan());
        assert!(reason.contains("announce2.png has no text part"));
    }

    #[test]
    fn test_empty_text_is_malformed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "announce.md", "  \n");

        let reason = malformed_reason(ContentRepository::new(dir.path()).scan());
        assert!(reason.contains("is empty"));
    }

    #[test]
    fn test_directory_and_flat_name_collision_is_malformed() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("announce");
        fs::create_dir(&sub).unwrap();
        write(&sub, "1.md", "dir part");
        write(dir.path(), "announce1.md", "flat part");

        let reason = malformed_reason(ContentRepository::new(dir.path()).scan());
        assert!(reason.contains("both as a directory and as flat files"));
    }

    #[test]
    fn test_empty_root_gives_empty_catalog() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".hidden.md", "ignored");

        let catalog = ContentRepository::new(dir.path()).scan().unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = ContentRepository::new(dir.path().join("absent")).scan();
        assert!(matches!(
            result,
            Err(ThreadcastError::Content(ContentError::Io(_)))
        ));
    }
}
