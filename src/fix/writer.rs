//! Disk reads and writes for the working copy.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

impl WriteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::Unchanged => "no change",
        }
    }
}

/// Current content of `path`, or `None` when there is no file there.
pub fn read_existing(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write `content` to `path` unless it already holds exactly that.
///
/// `existing` must be what [`read_existing`] returned for `path`. Parent
/// directories are created as needed. With `dry_run` nothing touches the disk
/// but the outcome that would have happened is still reported.
pub fn write_if_changed(
    path: &Path,
    existing: Option<&str>,
    content: &str,
    dry_run: bool,
) -> io::Result<WriteOutcome> {
    let outcome = match existing {
        None => WriteOutcome::Created,
        Some(current) if current.as_bytes() == content.as_bytes() => {
            return Ok(WriteOutcome::Unchanged);
        }
        Some(_) => WriteOutcome::Updated,
    };

    if dry_run {
        return Ok(outcome);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(outcome)
}
