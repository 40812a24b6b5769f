//! Recorded logs on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReplayError, ReplayResult};
use crate::format::LOG_EXTENSION;

/// Path of the log `name` in `dir`.
///
/// # Errors
///
/// Returns `InvalidLogName` for empty names, names with path separators,
/// and names starting with a dot.
pub fn log_path(dir: &Path, name: &str) -> ReplayResult<PathBuf> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(&['/', '\\', '\0'][..])
        || name.contains("..");
    if invalid {
        return Err(ReplayError::InvalidLogName(name.to_owned()));
    }
    Ok(dir.join(format!("{name}.{LOG_EXTENSION}")))
}

/// Names of the logs in `dir`, sorted. A missing directory holds no logs.
///
/// # Errors
///
/// Returns `Io` if the directory cannot be read.
pub fn available_logs(dir: &Path) -> ReplayResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Deletes the log `name` from `dir`.
///
/// # Errors
///
/// Returns `NotFound` if there is no such log, `Io` if removal fails.
pub fn delete_log(dir: &Path, name: &str) -> ReplayResult<()> {
    let path = log_path(dir, name)?;
    if !path.is_file() {
        return Err(ReplayError::not_found("log", name));
    }
    fs::remove_file(&path)?;
    tracing::info!(log = %name, path = %path.display(), "Log deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("chronicle_catalog_{label}_{nanos}"))
    }

    #[test]
    fn test_log_names_validated() {
        let dir = Path::new("/logs");
        assert_eq!(
            log_path(dir, "sortie_1").unwrap(),
            PathBuf::from("/logs/sortie_1.aarlog")
        );
        for bad in ["", ".hidden", "../escape", "a/b", "a\\b"] {
            assert!(matches!(log_path(dir, bad), Err(ReplayError::InvalidLogName(_))));
        }
    }

    #[test]
    fn test_list_and_delete() {
        let dir = temp_dir("list");
        assert!(available_logs(&dir).unwrap().is_empty());

        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bravo.aarlog"), b"").unwrap();
        fs::write(dir.join("alpha.aarlog"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();

        assert_eq!(available_logs(&dir).unwrap(), vec!["alpha", "bravo"]);

        delete_log(&dir, "alpha").unwrap();
        assert_eq!(available_logs(&dir).unwrap(), vec!["bravo"]);
        assert!(matches!(
            delete_log(&dir, "alpha"),
            Err(ReplayError::NotFound { kind: "log", .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
