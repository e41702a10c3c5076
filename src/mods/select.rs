use thiserror::Error;

use super::models::{ProjectId, ReleaseFile};

/// Only plain jars can be dropped into a plugins directory.
pub const JAR_EXTENSION: &str = ".jar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("project {project_id} has no file matching the requested filters")]
pub struct NoQualifyingFile {
    pub project_id: ProjectId,
}

/// Constraints a release file must meet to be picked. Unset fields match
/// anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub release_channel: Option<String>,
    pub required_extension: Option<String>,
}

impl FileFilter {
    /// The filter used for install and update: any channel, jars only.
    pub fn jars() -> Self {
        Self {
            release_channel: None,
            required_extension: Some(JAR_EXTENSION.into()),
        }
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.release_channel = channel;
        self
    }

    pub fn matches(&self, file: &ReleaseFile) -> bool {
        if let Some(channel) = &self.release_channel
            && file.release_type != *channel
        {
            return false;
        }
        if let Some(extension) = &self.required_extension
            && !file.file_name.ends_with(extension.as_str())
        {
            return false;
        }
        true
    }
}

/// Pick the newest file of `project_id` that passes `filter`.
///
/// The API lists files oldest first and carries no usable timestamp, so
/// "newest" is simply the last match in API order.
pub fn select<'a>(
    project_id: ProjectId,
    files: &'a [ReleaseFile],
    filter: &FileFilter,
) -> Result<&'a ReleaseFile, NoQualifyingFile> {
    files
        .iter()
        .rev()
        .find(|file| filter.matches(file))
        .ok_or(NoQualifyingFile { project_id })
}
