//! The content root: categories containing stream directories.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::fs::atomic::write_atomic;
use crate::fs::naming::sanitize_path_component;
use crate::stream::info::{self, StreamRecord};
use crate::stream::item::StreamKind;
use crate::stream::queue::{self, QUEUE_FILE};

/// A stream directory inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHandle {
    pub category: String,
    pub name: String,
    pub dir: PathBuf,
}

/// A category directory and its streams, sorted by name.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub name: String,
    pub dir: PathBuf,
    pub streams: Vec<StreamHandle>,
}

/// Snapshot of the category and stream directories under the root.
#[derive(Debug, Clone)]
pub struct CategoryTree {
    root: PathBuf,
    categories: Vec<Category>,
}

/// Visible subdirectories of `dir`, sorted by name.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!("Skipping non UTF-8 directory in {}", dir.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort();
    Ok(dirs)
}

impl CategoryTree {
    /// Enumerate categories and streams. A missing root is an empty tree.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut categories = Vec::new();

        if root.is_dir() {
            for (name, dir) in subdirectories(root)? {
                let streams = match subdirectories(&dir) {
                    Ok(streams) => streams,
                    Err(e) => {
                        tracing::warn!("Skipping category {}: {}", name, e);
                        continue;
                    }
                };
                let streams = streams
                    .into_iter()
                    .map(|(stream, stream_dir)| StreamHandle {
                        category: name.clone(),
                        name: stream,
                        dir: stream_dir,
                    })
                    .collect();
                categories.push(Category {
                    name,
                    dir,
                    streams,
                });
            }
        } else {
            tracing::debug!("Content root {} does not exist", root.display());
        }

        Ok(Self {
            root: root.to_path_buf(),
            categories,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Result<&Category> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::CategoryNotFound(name.to_string()))
    }

    /// Every stream, category by category.
    pub fn streams(&self) -> impl Iterator<Item = &StreamHandle> {
        self.categories.iter().flat_map(|c| c.streams.iter())
    }

    pub fn find_stream(&self, category: &str, stream: &str) -> Result<&StreamHandle> {
        self.category(category)?
            .streams
            .iter()
            .find(|s| s.name == stream)
            .ok_or_else(|| Error::StreamNotFound {
                category: category.to_string(),
                stream: stream.to_string(),
            })
    }
}

/// The stream to consume next in a category: the one whose current item is
/// oldest. Fresh streams come first and exhausted ones last; streams whose
/// state cannot be read are skipped.
pub fn next_up(category: &Category) -> Option<(&StreamHandle, StreamRecord)> {
    let mut best: Option<(&StreamHandle, StreamRecord)> = None;

    for stream in &category.streams {
        let record = match info::load(&stream.dir) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping {}/{}: {}", stream.category, stream.name, e);
                continue;
            }
        };

        let better = match &best {
            Some((_, current)) => record.cursor().sort_date() < current.cursor().sort_date(),
            None => true,
        };
        if better {
            best = Some((stream, record));
        }
    }

    best
}

/// Create a category directory under the root.
pub fn create_category(root: &Path, name: &str) -> Result<PathBuf> {
    let name = sanitize_path_component(name)?;
    let dir = root.join(&name);
    if dir.exists() {
        return Err(Error::AlreadyExists(dir));
    }

    std::fs::create_dir_all(&dir)?;
    tracing::info!("Created category {}", name);
    Ok(dir)
}

/// Create a stream in an existing category with a fresh `info.txt`, plus an
/// empty `queue.txt` for queue-backed kinds.
pub fn create_stream(
    root: &Path,
    category: &str,
    name: &str,
    kind: StreamKind,
    feed_url: Option<&str>,
) -> Result<StreamHandle> {
    let category_dir = root.join(sanitize_path_component(category)?);
    if !category_dir.is_dir() {
        return Err(Error::CategoryNotFound(category.to_string()));
    }

    let name = sanitize_path_component(name)?;
    let dir = category_dir.join(&name);
    if dir.exists() {
        return Err(Error::AlreadyExists(dir));
    }

    let feed_url = match feed_url {
        Some(_) if !kind.accepts_feed() => return Err(Error::FeedNotSupported(dir)),
        Some(url) => Some(url::Url::parse(url)?.to_string()),
        None => None,
    };

    std::fs::create_dir(&dir)?;
    info::save(&dir, &StreamRecord::new(kind, feed_url))?;
    if kind.uses_queue() {
        write_atomic(&dir.join(QUEUE_FILE), &queue::serialize(&[]))?;
    }

    tracing::info!("Created {} stream {}/{}", kind, category, name);
    Ok(StreamHandle {
        category: category.to_string(),
        name,
        dir,
    })
}

/// Rename a category directory.
pub fn rename_category(root: &Path, old: &str, new: &str) -> Result<PathBuf> {
    let from = root.join(sanitize_path_component(old)?);
    if !from.is_dir() {
        return Err(Error::CategoryNotFound(old.to_string()));
    }

    let new = sanitize_path_component(new)?;
    let to = root.join(&new);
    if to.exists() {
        return Err(Error::AlreadyExists(to));
    }

    std::fs::rename(&from, &to)?;
    tracing::info!("Renamed category {} to {}", old, new);
    Ok(to)
}

/// Move a stream to another category and/or give it a new name.
///
/// The stream directory is renamed as a whole, so its state and media files
/// travel with it. `new_name` of `None` keeps the current name.
pub fn move_stream(
    root: &Path,
    category: &str,
    stream: &str,
    new_category: &str,
    new_name: Option<&str>,
) -> Result<StreamHandle> {
    let from = root
        .join(sanitize_path_component(category)?)
        .join(sanitize_path_component(stream)?);
    if !from.is_dir() {
        return Err(Error::StreamNotFound {
            category: category.to_string(),
            stream: stream.to_string(),
        });
    }

    let target_dir = root.join(sanitize_path_component(new_category)?);
    if !target_dir.is_dir() {
        return Err(Error::CategoryNotFound(new_category.to_string()));
    }

    let name = sanitize_path_component(new_name.unwrap_or(stream))?;
    let to = target_dir.join(&name);
    if to.exists() {
        return Err(Error::AlreadyExists(to));
    }

    std::fs::rename(&from, &to)?;
    tracing::info!(
        "Moved stream {}/{} to {}/{}",
        category,
        stream,
        new_category,
        name
    );
    Ok(StreamHandle {
        category: new_category.to_string(),
        name,
        dir: to,
    })
}
