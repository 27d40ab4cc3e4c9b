//! Discovery record types
//!
//! These are the records the scanning pipeline hands to the indexer. They
//! carry only what ends up in the `shares` and `files` tables.

use crate::error::{ConfigError, DbError};
use std::path::Path;

/// A network share found on a remote computer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    /// Computer (host) the share lives on
    pub computer: String,

    /// UNC path of the share, e.g. `\\HOST\Data`
    pub share_path: String,

    /// Share comment as reported by the server
    pub comment: Option<String>,
}

impl ShareRecord {
    /// Create a new share record
    pub fn new(
        computer: impl Into<String>,
        share_path: impl Into<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            computer: computer.into(),
            share_path: share_path.into(),
            comment,
        }
    }

    /// Build a record from a UNC path, taking the computer from its first component
    pub fn from_unc(unc: &str, comment: Option<String>) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidShare {
            share: unc.to_string(),
            reason: reason.to_string(),
        };

        let rest = unc
            .strip_prefix(r"\\")
            .ok_or_else(|| invalid(r"expected a UNC path starting with '\\'"))?;
        let (computer, share) = rest
            .split_once('\\')
            .ok_or_else(|| invalid("missing share name"))?;

        if computer.is_empty() {
            return Err(invalid("empty computer name"));
        }
        if share.is_empty() {
            return Err(invalid("empty share name"));
        }

        Ok(Self::new(computer, unc, comment))
    }

    /// Share name with the leading `\\<computer>\` stripped
    ///
    /// The prefix must match exactly (including case); anything else is
    /// rejected rather than guessed at.
    pub fn share_name(&self) -> Result<&str, DbError> {
        self.share_path
            .strip_prefix(r"\\")
            .and_then(|rest| rest.strip_prefix(self.computer.as_str()))
            .and_then(|rest| rest.strip_prefix('\\'))
            .filter(|name| !name.is_empty() && !self.computer.is_empty())
            .ok_or_else(|| DbError::InvalidSharePath {
                computer: self.computer.clone(),
                path: self.share_path.clone(),
            })
    }
}

/// A file found while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full path of the file
    pub full_path: String,

    /// File name (last path component)
    pub name: String,

    /// Size in bytes, if known
    pub size: Option<i64>,

    /// Extension including the leading dot (e.g. `.docx`), if any
    pub extension: Option<String>,
}

impl FileRecord {
    /// Create a new file record
    pub fn new(
        full_path: impl Into<String>,
        name: impl Into<String>,
        size: Option<i64>,
        extension: Option<String>,
    ) -> Self {
        Self {
            full_path: full_path.into(),
            name: name.into(),
            size,
            extension,
        }
    }

    /// Build a record from a path, deriving name and extension
    pub fn from_path(path: &Path, size: Option<u64>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let extension = path
            .extension()
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext.to_string_lossy()));

        Self {
            full_path: path.to_string_lossy().into_owned(),
            name,
            size: size.map(|s| i64::try_from(s).unwrap_or(i64::MAX)),
            extension,
        }
    }
}
