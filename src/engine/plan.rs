//! Decide what install and update would do before anything touches disk.

use crate::mods::cache::FileCache;
use crate::mods::models::{Project, ProjectId, ReleaseFile};
use crate::mods::select::{FileFilter, JAR_EXTENSION};
use crate::storage::{Manifest, ManifestEntry};

/// A project paired with the file install would download for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallItem<'a> {
    pub project: &'a Project,
    pub file: &'a ReleaseFile,
}

impl InstallItem<'_> {
    /// Installs are named after the slug so reinstalling overwrites in place.
    pub fn local_name(&self) -> String {
        format!("{}{JAR_EXTENSION}", self.project.slug)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPlan<'a> {
    pub fetchable: Vec<InstallItem<'a>>,
    pub unqualified: Vec<&'a Project>,
}

impl InstallPlan<'_> {
    /// A single project without a qualifying file blocks the whole install.
    pub fn is_blocked(&self) -> bool {
        !self.unqualified.is_empty()
    }

    pub fn unqualified_slugs(&self) -> Vec<String> {
        self.unqualified.iter().map(|p| p.slug.clone()).collect()
    }
}

pub fn plan_install<'a>(
    projects: &'a [Project],
    cache: &'a FileCache,
    filter: &FileFilter,
) -> InstallPlan<'a> {
    let mut plan = InstallPlan::default();
    for project in projects {
        match cache.latest(project.id, filter) {
            Ok(file) => plan.fetchable.push(InstallItem { project, file }),
            Err(_) => plan.unqualified.push(project),
        }
    }
    plan
}

/// The parts of a manifest entry update planning needs to carry forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked {
    pub project_id: ProjectId,
    pub project_name: String,
    /// Name on disk as recorded (and possibly recovered by reconciliation).
    /// Updates overwrite this file rather than a slug-derived one.
    pub local_name: String,
    pub installed_version: String,
}

impl From<&ManifestEntry> for Tracked {
    fn from(entry: &ManifestEntry) -> Self {
        Self {
            project_id: entry.server_mod_id,
            project_name: entry.server_mod_name.clone(),
            local_name: entry.filename.clone(),
            installed_version: entry.file_version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateItem<'a> {
    pub tracked: Tracked,
    pub file: &'a ReleaseFile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan<'a> {
    pub up_to_date: Vec<UpdateItem<'a>>,
    pub updates: Vec<UpdateItem<'a>>,
    /// Previously installed projects that currently offer no qualifying file.
    pub unqualified: Vec<Tracked>,
}

impl UpdatePlan<'_> {
    pub fn has_work(&self) -> bool {
        !self.updates.is_empty()
    }
}

/// Classify every manifest entry against the newest qualifying file.
///
/// Run reconciliation first: an entry whose file was renamed would
/// otherwise be updated under a name that no longer exists.
pub fn plan_update<'c>(
    manifest: &Manifest,
    cache: &'c FileCache,
    filter: &FileFilter,
) -> UpdatePlan<'c> {
    let mut plan = UpdatePlan::default();
    for entry in manifest.entries().values() {
        let tracked = Tracked::from(entry);
        match cache.latest(entry.server_mod_id, filter) {
            Ok(file) if file.download_url == entry.download_url => {
                plan.up_to_date.push(UpdateItem { tracked, file });
            }
            Ok(file) => plan.updates.push(UpdateItem { tracked, file }),
            Err(_) => plan.unqualified.push(tracked),
        }
    }
    plan
}
