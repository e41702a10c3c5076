use serde::Deserialize;

/// Numeric project identifier assigned by the ServerMods API.
pub type ProjectId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub stage: String,
}

impl Project {
    pub fn is_release_stage(&self) -> bool {
        self.stage == "release"
    }
}

/// One downloadable file of a project, as listed by `/files`.
///
/// The owning project is referenced by id only; look it up when a display
/// name is needed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFile {
    pub file_name: String,
    pub name: String,
    pub release_type: String,
    pub download_url: String,
    #[serde(default)]
    pub game_version: String,
    pub project_id: ProjectId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_api_file_payload() {
        let json = r#"{
            "downloadUrl": "https://dev.bukkit.org/media/files/1/2/WorldEdit.jar",
            "fileName": "WorldEdit.jar",
            "fileUrl": "https://dev.bukkit.org/files/1",
            "gameVersion": "CB 1.7.9-R0.2",
            "md5": "0123",
            "name": "WorldEdit 6.0",
            "projectId": 31043,
            "releaseType": "release"
        }"#;
        let file: ReleaseFile = serde_json::from_str(json).unwrap();
        assert_eq!(
            file,
            ReleaseFile {
                file_name: "WorldEdit.jar".into(),
                name: "WorldEdit 6.0".into(),
                release_type: "release".into(),
                download_url: "https://dev.bukkit.org/media/files/1/2/WorldEdit.jar".into(),
                game_version: "CB 1.7.9-R0.2".into(),
                project_id: 31043,
            }
        );
    }

    #[test]
    fn parses_project_payload() {
        let json = r#"{"id": 31043, "name": "WorldEdit", "slug": "worldedit", "stage": "beta"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, 31043);
        assert_eq!(project.slug, "worldedit");
        assert!(!project.is_release_stage());
    }
}
