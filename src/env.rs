use std::path::{self, Path, PathBuf};

use crate::error::{Error, Result};

/// Where plugins live when `--plugins-dir` is not given, relative to the
/// server root the tool is usually run from.
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Resolve the plugins directory to an absolute path, failing fast when it
/// does not exist.
pub fn resolve_plugins_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let requested = explicit.unwrap_or_else(|| Path::new(DEFAULT_PLUGINS_DIR));
    let absolute = path::absolute(requested).map_err(|source| Error::Io {
        action: "resolve",
        path: requested.to_path_buf(),
        source,
    })?;
    if !absolute.is_dir() {
        return Err(Error::NotADirectory(absolute));
    }
    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn accepts_existing_directory() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_plugins_dir(Some(dir.path())).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.is_dir());
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("plugins");
        let err = resolve_plugins_dir(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::NotADirectory(path) if path == missing));
    }

    #[test]
    fn rejects_plain_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("server.jar");
        fs::write(&file, b"jar").unwrap();
        assert!(matches!(
            resolve_plugins_dir(Some(&file)),
            Err(Error::NotADirectory(_))
        ));
    }
}
