use crate::utils::error::{Result, UnitError};
use std::fs;
use std::path::{Component, Path, PathBuf};

fn materialize_error(path: &Path, reason: impl Into<String>) -> UnitError {
    UnitError::SourceMaterializationError {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Absolute form of `path` with `.` and `..` folded away. Existing paths are
/// canonicalized so symlinked spellings compare equal.
pub fn resolve(path: &Path) -> std::io::Result<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Ok(canonical);
    }

    let mut resolved = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }

    // the deepest existing ancestor may itself be a symlink
    let mut existing = resolved.clone();
    let mut rest = Vec::new();
    while !existing.exists() {
        match existing.file_name() {
            Some(name) => rest.push(name.to_os_string()),
            None => return Ok(resolved),
        }
        existing.pop();
    }
    let mut out = fs::canonicalize(&existing)?;
    out.extend(rest.iter().rev());
    Ok(out)
}

/// True when one tree contains the other (or they are the same directory).
pub fn trees_overlap(a: &Path, b: &Path) -> std::io::Result<bool> {
    let (a, b) = (resolve(a)?, resolve(b)?);
    Ok(a.starts_with(&b) || b.starts_with(&a))
}

/// Copies `source` into `dest` verbatim, preserving relative paths.
/// An existing `dest` is replaced so repeated builds produce the same tree.
/// Returns the number of files copied.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    let meta = fs::metadata(source).map_err(|e| materialize_error(source, e.to_string()))?;
    if !meta.is_dir() {
        return Err(materialize_error(source, "not a directory"));
    }

    if trees_overlap(source, dest)? {
        return Err(materialize_error(
            source,
            format!("destination {} overlaps the source tree", dest.display()),
        ));
    }

    if dest.exists() {
        tracing::debug!("Removing previous tree at {}", dest.display());
        fs::remove_dir_all(dest)?;
    }

    copy_dir(source, dest)
}

fn copy_dir(source: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;

    let entries = fs::read_dir(source).map_err(|e| materialize_error(source, e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| materialize_error(source, e.to_string()))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| materialize_error(&from, e.to_string()))?;

        if file_type.is_dir() {
            copied += copy_dir(&from, &to)?;
        } else {
            // follows symlinks, like a build-context copy
            fs::copy(&from, &to).map_err(|e| materialize_error(&from, e.to_string()))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Copies one file into place, creating parent directories. Returns `false`
/// without touching anything when `dest` already is `source`.
pub fn copy_file(source: &Path, dest: &Path) -> std::io::Result<bool> {
    if resolve(source)? == resolve(dest)? {
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree_preserves_relative_paths() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("pkg/sub")).unwrap();
        fs::write(src.path().join("main.py"), "print('hi')").unwrap();
        fs::write(src.path().join("pkg/sub/util.py"), "X = 1").unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("src");
        let copied = copy_tree(src.path(), &dest).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.join("main.py")).unwrap(), "print('hi')");
        assert_eq!(fs::read_to_string(dest.join("pkg/sub/util.py")).unwrap(), "X = 1");
    }

    #[test]
    fn test_copy_tree_replaces_stale_files() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("main.py"), "v2").unwrap();

        let out = TempDir::new().unwrap();
        let dest = out.path().join("src");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.py"), "old").unwrap();

        copy_tree(src.path(), &dest).unwrap();

        assert!(!dest.join("stale.py").exists());
        assert_eq!(fs::read_to_string(dest.join("main.py")).unwrap(), "v2");
    }

    #[test]
    fn test_missing_source_is_a_materialization_error() {
        let out = TempDir::new().unwrap();
        let err = copy_tree(&out.path().join("nope"), &out.path().join("src")).unwrap_err();
        assert!(matches!(err, UnitError::SourceMaterializationError { .. }));
    }

    #[test]
    fn test_overlapping_trees_are_rejected_and_left_intact() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("pkg")).unwrap();
        fs::write(src.join("main.py"), "print('hi')").unwrap();

        // same directory, spelled differently
        let same = dir.path().join("pkg-less/../src");
        assert!(copy_tree(&src, &same).is_err());
        // destination containing the source
        assert!(copy_tree(&src, dir.path()).is_err());
        // destination inside the source
        assert!(copy_tree(&src, &src.join("pkg/out")).is_err());

        assert_eq!(fs::read_to_string(src.join("main.py")).unwrap(), "print('hi')");
    }

    #[test]
    fn test_copy_file_onto_itself_keeps_content() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "requests==2.31.0\n").unwrap();

        let copied = copy_file(&dir.path().join("./requirements.txt"), &manifest).unwrap();

        assert!(!copied);
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "requests==2.31.0\n");
    }

    #[test]
    fn test_resolve_folds_dot_segments() {
        let dir = TempDir::new().unwrap();
        let plain = resolve(&dir.path().join("a/b")).unwrap();
        let dotted = resolve(&dir.path().join("a/./c/../b")).unwrap();
        assert_eq!(plain, dotted);
    }

    #[test]
    fn test_file_source_is_rejected() {
        let out = TempDir::new().unwrap();
        let file = out.path().join("main.py");
        fs::write(&file, "").unwrap();

        let err = copy_tree(&file, &out.path().join("src")).unwrap_err();
        assert!(matches!(err, UnitError::SourceMaterializationError { .. }));
    }
}
