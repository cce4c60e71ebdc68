//! Keeps every write inside the working copy.
//!
//! A proposed path is walked one component at a time from the working
//! directory. Any component that already exists as a symlink must resolve to
//! somewhere under the working directory, including the final one, since
//! reading and writing follow links.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafePath {
    #[error("path is empty")]
    Empty,

    #[error("absolute path not allowed: {0}")]
    Absolute(String),

    #[error("parent traversal not allowed: {0}")]
    Traversal(String),

    #[error("symlink leads outside the working directory: {0}")]
    Escapes(String),

    #[error("symlink target does not exist: {0}")]
    DanglingLink(String),

    #[error("cannot inspect {path}: {reason}")]
    Uninspectable { path: String, reason: String },
}

/// Absolute location of `candidate` under `workdir`, or why writing there is unsafe.
///
/// The target itself need not exist; missing trailing components are fine.
pub fn confine_to_workdir(workdir: &Path, candidate: &str) -> Result<PathBuf, UnsafePath> {
    if candidate.trim().is_empty() {
        return Err(UnsafePath::Empty);
    }
    let relative = Path::new(candidate);
    if relative.is_absolute() || relative.has_root() {
        return Err(UnsafePath::Absolute(candidate.to_string()));
    }
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(UnsafePath::Traversal(candidate.to_string()));
    }

    let root = workdir
        .canonicalize()
        .map_err(|e| uninspectable(workdir, &e))?;

    let mut current = root.clone();
    for component in relative.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        current.push(name);

        let meta = match fs::symlink_metadata(&current) {
            Ok(meta) => meta,
            // Nothing below a missing component can exist either.
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(uninspectable(&current, &e)),
        };
        if !meta.file_type().is_symlink() {
            continue;
        }

        let target = current
            .canonicalize()
            .map_err(|_| UnsafePath::DanglingLink(candidate.to_string()))?;
        if !target.starts_with(&root) {
            return Err(UnsafePath::Escapes(candidate.to_string()));
        }
    }

    Ok(root.join(relative))
}

fn uninspectable(path: &Path, err: &io::Error) -> UnsafePath {
    UnsafePath::Uninspectable {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_in_missing_dir_is_allowed() {
        let dir = tempdir().unwrap();
        let target = confine_to_workdir(dir.path(), "new_dir/new_file.rs").unwrap();
        assert_eq!(
            target,
            dir.path().canonicalize().unwrap().join("new_dir/new_file.rs")
        );
    }

    #[test]
    fn test_existing_file_is_allowed() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/app.js"), "x").unwrap();
        let target = confine_to_workdir(dir.path(), "./src/app.js").unwrap();
        assert!(target.ends_with("src/app.js"));
    }

    #[test]
    fn test_lexical_escapes_are_rejected() {
        let dir = tempdir().unwrap();
        assert_eq!(confine_to_workdir(dir.path(), "  "), Err(UnsafePath::Empty));
        assert!(matches!(
            confine_to_workdir(dir.path(), "/etc/passwd"),
            Err(UnsafePath::Absolute(_))
        ));
        assert!(matches!(
            confine_to_workdir(dir.path(), "../outside.txt"),
            Err(UnsafePath::Traversal(_))
        ));
        assert!(matches!(
            confine_to_workdir(dir.path(), "a/../../x"),
            Err(UnsafePath::Traversal(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_outside_is_rejected() {
        let outside = tempdir().unwrap();
        let root = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();
        assert!(matches!(
            confine_to_workdir(root.path(), "link/file.txt"),
            Err(UnsafePath::Escapes(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_outside_is_rejected() {
        let outside = tempdir().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, "safe").unwrap();
        let root = tempdir().unwrap();
        std::os::unix::fs::symlink(&victim, root.path().join("zz_out")).unwrap();

        assert_eq!(
            confine_to_workdir(root.path(), "zz_out"),
            Err(UnsafePath::Escapes("zz_out".to_string()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_workdir_is_allowed() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink(root.path().join("real.txt"), root.path().join("alias.txt"))
            .unwrap();
        assert!(confine_to_workdir(root.path(), "alias.txt").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_rejected() {
        let root = tempdir().unwrap();
        std::os::unix::fs::symlink("/nonexistent/issuefix-target", root.path().join("ghost"))
            .unwrap();
        assert!(matches!(
            confine_to_workdir(root.path(), "ghost"),
            Err(UnsafePath::DanglingLink(_))
        ));
    }
}
