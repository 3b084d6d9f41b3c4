//! Durable storage for permanent tags
//!
//! The tag store treats persistence as an opaque provider that loads and
//! saves the whole permanent partition at once. The default provider is a
//! YAML document replaced atomically on every save.

use crate::error::{Result, TagError};
use log::warn;
use shared::TagAssignment;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_TEMP_ATTEMPTS: u32 = 100;

pub type TagMap = BTreeMap<String, TagAssignment>;

pub trait TagPersistence: Send + Sync {
    /// Loads every persisted assignment. A missing or blank backing file is an
    /// empty map, not an error.
    fn load(&self) -> Result<TagMap>;

    fn save(&self, tags: &TagMap) -> Result<()>;
}

/// Permanent tags stored as a YAML mapping from user id to assignment.
#[derive(Debug, Clone)]
pub struct YamlFilePersistence {
    path: PathBuf,
}

impl YamlFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TagPersistence for YamlFilePersistence {
    fn load(&self) -> Result<TagMap> {
        if !self.path.exists() {
            return Ok(TagMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(TagMap::new());
        }
        // A document that is just `~` or `null` deserializes to None
        let tags: Option<TagMap> = serde_yaml::from_str(&content)?;
        Ok(tags.unwrap_or_default())
    }

    fn save(&self, tags: &TagMap) -> Result<()> {
        let content = serde_yaml::to_string(tags)?;
        write_atomic(&self.path, content.as_bytes())
    }
}

/// Replaces `path` with `content` via a synced temp file and rename, so a
/// crash mid-write never leaves a truncated document behind.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| TagError::Persist(format!("invalid tag file path {}", path.display())))?;

    fs::create_dir_all(&parent)?;
    let (mut file, temp_path) = create_temp_file(&parent, file_name)?;

    let written = file
        .write_all(content)
        .and_then(|_| file.sync_all())
        .and_then(|_| fs::rename(&temp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    #[cfg(unix)]
    {
        if let Err(e) = fs::File::open(&parent).and_then(|dir| dir.sync_all()) {
            warn!("Tag directory sync failed: {}", e);
        }
    }

    Ok(())
}

fn create_temp_file(parent: &Path, file_name: &str) -> Result<(fs::File, PathBuf)> {
    for attempt in 0..MAX_TEMP_ATTEMPTS {
        let temp_path = parent.join(format!(
            ".{}.tmp.{}.{}",
            file_name,
            std::process::id(),
            attempt
        ));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(file) => return Ok((file, temp_path)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(TagError::Persist(format!(
        "could not create a temp file next to {} after {} attempts",
        file_name, MAX_TEMP_ATTEMPTS
    )))
}
