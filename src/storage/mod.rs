use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mods::models::{ProjectId, ReleaseFile};

pub mod hash;
pub mod reconcile;

/// Manifest file kept next to the plugins it describes.
pub const MANIFEST_FILE: &str = ".servermods.json";
const MANIFEST_TMP_FILE: &str = ".servermods.json.tmp";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to hash {}: {source}", .path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {} is corrupt and was left untouched: {source}", .path.display())]
    CorruptManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest {} has unsupported format version {version}", .path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What we know about one installed project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub server_mod_id: ProjectId,
    #[serde(default)]
    pub server_mod_name: String,
    /// Local file name inside the plugins directory.
    pub filename: String,
    /// Display name of the installed release, e.g. "WorldEdit 6.0".
    pub file_version: String,
    pub download_url: String,
    /// Content hash of the file at install time; survives user renames.
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ManifestData {
    version: u32,
    #[serde(default)]
    apikey: Option<String>,
    #[serde(default)]
    installed: BTreeMap<String, ManifestEntry>,
}

impl Default for ManifestData {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            apikey: None,
            installed: BTreeMap::new(),
        }
    }
}

/// Key under which a project's entry is stored in the manifest.
pub fn entry_key(id: ProjectId) -> String {
    id.to_string()
}

/// Installed-file manifest for a single plugins directory.
#[derive(Debug, Clone)]
pub struct Manifest {
    dir: PathBuf,
    data: ManifestData,
}

impl Manifest {
    /// Load the manifest from `dir`, creating and persisting an empty one if
    /// the directory has never been managed before.
    pub fn load(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("storage: no manifest at {}, creating one", path.display());
                let manifest = Self {
                    dir: dir.to_path_buf(),
                    data: ManifestData::default(),
                };
                manifest.save()?;
                return Ok(manifest);
            }
            Err(source) => {
                return Err(StorageError::Io {
                    action: "read",
                    path,
                    source,
                });
            }
        };

        let data: ManifestData = serde_json::from_slice(&bytes)
            .map_err(|source| StorageError::CorruptManifest {
                path: path.clone(),
                source,
            })?;
        if data.version != MANIFEST_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path,
                version: data.version,
            });
        }
        debug!(
            "storage: loaded {} entries from {}",
            data.installed.len(),
            path.display()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            data,
        })
    }

    /// Write the full manifest, replacing the previous file in one rename.
    pub fn save(&self) -> Result<(), StorageError> {
        let path = self.path();
        let tmp = self.dir.join(MANIFEST_TMP_FILE);
        let bytes = serde_json::to_vec_pretty(&self.data)?;
        fs::write(&tmp, &bytes).map_err(|source| StorageError::Io {
            action: "write",
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            action: "replace",
            path: path.clone(),
            source,
        })?;
        debug!("storage: saved manifest to {}", path.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn entries(&self) -> &BTreeMap<String, ManifestEntry> {
        &self.data.installed
    }

    pub fn entry(&self, id: ProjectId) -> Option<&ManifestEntry> {
        self.data.installed.get(&entry_key(id))
    }

    pub fn is_empty(&self) -> bool {
        self.data.installed.is_empty()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.data.apikey.as_deref()
    }

    pub fn set_api_key(&mut self, key: Option<String>) {
        self.data.apikey = key;
    }

    /// Hash `local_name` and record it as the installed copy of `file`.
    ///
    /// Only the in-memory state changes; call [`Manifest::save`] to persist.
    pub fn record_install(
        &mut self,
        project_id: ProjectId,
        project_name: &str,
        file: &ReleaseFile,
        local_name: &str,
    ) -> Result<&ManifestEntry, StorageError> {
        let path = self.dir.join(local_name);
        let hash = hash::content_hash(&path).map_err(|source| StorageError::Hash {
            path: path.clone(),
            source,
        })?;
        let entry = ManifestEntry {
            server_mod_id: project_id,
            server_mod_name: project_name.to_owned(),
            filename: local_name.to_owned(),
            file_version: file.name.clone(),
            download_url: file.download_url.clone(),
            hash,
        };
        info!(
            "storage: recorded {} as {} ({})",
            project_name, local_name, entry.file_version
        );
        let key = entry_key(project_id);
        self.data.installed.insert(key.clone(), entry);
        Ok(&self.data.installed[&key])
    }

    /// Forget a project. Removing an unknown project is a no-op.
    pub fn record_removal(&mut self, project_id: ProjectId) -> Option<ManifestEntry> {
        self.data.installed.remove(&entry_key(project_id))
    }

    pub(crate) fn replace_entries(&mut self, entries: BTreeMap<String, ManifestEntry>) {
        self.data.installed = entries;
    }

    /// Whether `name` is one of the manifest's own bookkeeping files.
    pub(crate) fn is_own_file(name: &str) -> bool {
        name == MANIFEST_FILE || name == MANIFEST_TMP_FILE
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    pub(crate) fn release(project_id: ProjectId, name: &str, url: &str) -> ReleaseFile {
        ReleaseFile {
            file_name: format!("{name}.jar"),
            name: name.into(),
            release_type: "release".into(),
            download_url: url.into(),
            game_version: "1.7.9".into(),
            project_id,
        }
    }

    #[test]
    fn load_creates_and_persists_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(dir.path()).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.api_key(), None);

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({"version": 1, "apikey": null, "installed": {}})
        );
    }

    #[test]
    fn corrupt_manifest_is_reported_not_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, b"{not json").unwrap();

        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, StorageError::CorruptManifest { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"{not json");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            br#"{"version": 2, "installed": {}}"#,
        )
        .unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { version: 2, .. }
        ));
    }

    #[test]
    fn reads_manifest_written_by_older_clients() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            br#"{"version": 1, "apikey": "secret", "installed": {"31043": {
                "server_mod_id": 31043, "server_mod_name": "WorldEdit",
                "filename": "worldedit.jar", "file_version": "WorldEdit 6.0",
                "download_url": "https://example.org/we.jar",
                "hash": "900150983cd24fb0d6963f7d28e17f72"}}}"#,
        )
        .unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.api_key(), Some("secret"));
        let entry = manifest.entry(31043).unwrap();
        assert_eq!(entry.filename, "worldedit.jar");
        assert_eq!(entry.file_version, "WorldEdit 6.0");
    }

    #[test]
    fn record_install_hashes_and_upserts() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        fs::write(dir.path().join("worldedit.jar"), b"abc").unwrap();

        let file = release(31043, "WorldEdit 6.0", "https://example.org/6.0.jar");
        manifest
            .record_install(31043, "WorldEdit", &file, "worldedit.jar")
            .unwrap();
        assert_eq!(
            manifest.entry(31043).unwrap(),
            &ManifestEntry {
                server_mod_id: 31043,
                server_mod_name: "WorldEdit".into(),
                filename: "worldedit.jar".into(),
                file_version: "WorldEdit 6.0".into(),
                download_url: "https://example.org/6.0.jar".into(),
                hash: "900150983cd24fb0d6963f7d28e17f72".into(),
            }
        );

        fs::write(dir.path().join("worldedit.jar"), b"newer build").unwrap();
        let newer = release(31043, "WorldEdit 6.1", "https://example.org/6.1.jar");
        manifest
            .record_install(31043, "WorldEdit", &newer, "worldedit.jar")
            .unwrap();
        assert_eq!(manifest.entries().len(), 1);
        assert_eq!(manifest.entry(31043).unwrap().file_version, "WorldEdit 6.1");

        // Not persisted until save.
        let reloaded = Manifest::load(dir.path()).unwrap();
        assert!(reloaded.is_empty());
        manifest.save().unwrap();
        let reloaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(reloaded.entries(), manifest.entries());
    }

    #[test]
    fn record_install_fails_when_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        let file = release(1, "Essentials", "https://example.org/e.jar");
        let err = manifest
            .record_install(1, "Essentials", &file, "essentials.jar")
            .unwrap_err();
        assert!(matches!(err, StorageError::Hash { .. }));
        assert!(manifest.is_empty());
    }

    #[test]
    fn record_removal_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        fs::write(dir.path().join("essentials.jar"), b"jar").unwrap();
        let file = release(7, "Essentials 2.x", "https://example.org/e.jar");
        manifest
            .record_install(7, "Essentials", &file, "essentials.jar")
            .unwrap();

        assert!(manifest.record_removal(7).is_some());
        assert!(manifest.record_removal(7).is_none());
        assert!(manifest.is_empty());
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::load(dir.path()).unwrap();
        manifest.set_api_key(Some("key".into()));
        manifest.save().unwrap();
        assert!(!dir.path().join(MANIFEST_TMP_FILE).exists());
        assert_eq!(Manifest::load(dir.path()).unwrap().api_key(), Some("key"));
    }
}
