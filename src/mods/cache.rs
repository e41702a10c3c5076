use std::collections::{BTreeSet, HashMap};

use log::debug;

use super::models::{ProjectId, ReleaseFile};
use super::select::{self, FileFilter, NoQualifyingFile};
use super::{ApiError, ModRepository};

/// Release files fetched during one run, keyed by project.
///
/// Lives as long as the command that built it; nothing is persisted.
#[derive(Debug, Default)]
pub struct FileCache {
    files: HashMap<ProjectId, Vec<ReleaseFile>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch files for every id in `ids` that has not been fetched yet, in a
    /// single request.
    pub async fn ensure<R, I>(&mut self, repo: &R, ids: I) -> Result<(), ApiError>
    where
        R: ModRepository,
        I: IntoIterator<Item = ProjectId>,
    {
        let wanted: BTreeSet<ProjectId> = ids
            .into_iter()
            .filter(|id| !self.files.contains_key(id))
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }
        debug!("mods: fetching files for {} projects", wanted.len());
        let fetched = repo.fetch_files(&wanted).await?;
        self.insert(&wanted, fetched);
        Ok(())
    }

    /// Store a fetch result. Requested projects the API returned nothing for
    /// are remembered as having no files so they are not asked for again.
    pub fn insert(
        &mut self,
        requested: &BTreeSet<ProjectId>,
        mut fetched: HashMap<ProjectId, Vec<ReleaseFile>>,
    ) {
        for id in requested {
            let files = fetched.remove(id).unwrap_or_default();
            self.files.insert(*id, files);
        }
        for (id, files) in fetched {
            self.files.entry(id).or_default().extend(files);
        }
    }

    pub fn files(&self, project_id: ProjectId) -> &[ReleaseFile] {
        self.files
            .get(&project_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn latest(
        &self,
        project_id: ProjectId,
        filter: &FileFilter,
    ) -> Result<&ReleaseFile, NoQualifyingFile> {
        select::select(project_id, self.files(project_id), filter)
    }
}
