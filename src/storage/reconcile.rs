//! Bring the manifest back in line with what is actually in the plugins
//! directory.
//!
//! Users rename jars (`WorldEdit.jar` -> `worldedit-6.jar`) or delete them
//! outright. An entry whose file vanished is matched against the unclaimed
//! files in the directory by content hash: a match is a rename and the entry
//! follows the file, no match means the plugin is gone and the entry is
//! dropped. Files the manifest never knew about are left alone.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use log::{debug, info, warn};
use walkdir::WalkDir;

use super::{Manifest, ManifestEntry, StorageError, hash};
use crate::mods::models::ProjectId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub project_id: ProjectId,
    pub project_name: String,
    pub from: String,
    pub to: String,
}

/// What reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub renamed: Vec<Renamed>,
    pub lost: Vec<ManifestEntry>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.renamed.is_empty() && self.lost.is_empty()
    }
}

/// Reconcile `manifest` against its directory.
///
/// When several missing entries share one hash, each matching file recovers
/// only the first of them still waiting; which entry that is depends on
/// manifest key order and is not part of the contract.
pub fn reconcile(manifest: &mut Manifest) -> Result<ReconcileReport, StorageError> {
    let dir = manifest.dir().to_path_buf();
    let mut kept = BTreeMap::new();
    let mut claimed = HashSet::new();
    let mut missing: HashMap<String, VecDeque<(String, ManifestEntry)>> = HashMap::new();

    for (key, entry) in manifest.entries() {
        if !entry.filename.is_empty() && dir.join(&entry.filename).is_file() {
            claimed.insert(entry.filename.clone());
            kept.insert(key.clone(), entry.clone());
        } else {
            debug!(
                "storage: {} is missing from {}",
                entry.filename,
                dir.display()
            );
            missing
                .entry(entry.hash.clone())
                .or_default()
                .push_back((key.clone(), entry.clone()));
        }
    }

    let mut report = ReconcileReport::default();
    if !missing.is_empty() {
        for name in list_files(&dir)? {
            if missing.is_empty() {
                break;
            }
            if claimed.contains(&name) || Manifest::is_own_file(&name) {
                continue;
            }
            let path = dir.join(&name);
            let digest =
                hash::content_hash(&path).map_err(|source| StorageError::Hash { path, source })?;
            let Some(waiting) = missing.get_mut(&digest) else {
                continue;
            };
            let Some((key, mut entry)) = waiting.pop_front() else {
                continue;
            };
            if waiting.is_empty() {
                missing.remove(&digest);
            }

            info!(
                "storage: {} was renamed from {} to {}",
                entry.server_mod_name, entry.filename, name
            );
            report.renamed.push(Renamed {
                project_id: entry.server_mod_id,
                project_name: entry.server_mod_name.clone(),
                from: entry.filename.clone(),
                to: name.clone(),
            });
            entry.filename = name.clone();
            claimed.insert(name);
            kept.insert(key, entry);
        }
    }

    let mut lost: Vec<ManifestEntry> = missing
        .into_values()
        .flatten()
        .map(|(_, entry)| entry)
        .collect();
    lost.sort_by_key(|entry| entry.server_mod_id);
    for entry in &lost {
        warn!(
            "storage: {} ({}) is no longer installed; forgetting it",
            entry.server_mod_name, entry.filename
        );
    }
    report.lost = lost;

    manifest.replace_entries(kept);
    Ok(report)
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<String>, StorageError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| StorageError::Io {
            action: "list",
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_owned()),
            None => debug!(
                "storage: skipping non UTF-8 file name {}",
                entry.path().display()
            ),
        }
    }
    Ok(names)
}
