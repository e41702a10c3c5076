use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::networking;

pub mod cache;
pub mod models;
pub mod select;

use models::{Project, ProjectId, ReleaseFile};

pub const DEFAULT_API_URL: &str = "https://api.curseforge.com/servermods";
const USER_AGENT: &str = concat!("servermods/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("ServerMods API error {code}: {message}")]
    Remote { code: String, message: String },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("download of {url} incomplete: received {received} of {expected} bytes")]
    Incomplete {
        url: String,
        received: u64,
        expected: u64,
    },
}

/// The remote side of every command: project search, file listings and
/// the downloads themselves.
#[allow(async_fn_in_trait)]
pub trait ModRepository {
    async fn search(&self, query: &str) -> Result<Vec<Project>, ApiError>;

    /// Files for each requested project, oldest first.
    async fn fetch_files(
        &self,
        ids: &BTreeSet<ProjectId>,
    ) -> Result<HashMap<ProjectId, Vec<ReleaseFile>>, ApiError>;

    /// Stream `url` into `dest`, reporting `(downloaded, total)` as bytes
    /// arrive. Returns the number of bytes written.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, ApiError>;
}

/// Error payload the API sends with a 200 status.
#[derive(Debug, Deserialize)]
struct RemoteErrorPayload {
    #[serde(rename = "errorCode")]
    error_code: serde_json::Value,
    #[serde(rename = "errorMessage", default)]
    error_message: String,
}

#[derive(Clone)]
pub struct ServerModsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ServerModsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!(
                    "mods: failed to build HTTP client ({}); using default configuration",
                    err
                );
                Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!("mods: GET {url} {query:?}");
        let resp = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }
        let body = resp.bytes().await.map_err(|source| ApiError::Http {
            url: url.clone(),
            source,
        })?;
        decode_payload(&url, &body)
    }
}

impl ModRepository for ServerModsClient {
    async fn search(&self, query: &str) -> Result<Vec<Project>, ApiError> {
        self.get_json("projects", &[("search", query.to_owned())])
            .await
    }

    async fn fetch_files(
        &self,
        ids: &BTreeSet<ProjectId>,
    ) -> Result<HashMap<ProjectId, Vec<ReleaseFile>>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let files: Vec<ReleaseFile> = self.get_json("files", &[("projectIds", joined)]).await?;
        Ok(group_by_project(files))
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, ApiError> {
        networking::download_to_path(&self.client, url, dest, progress).await
    }
}

/// Decode an API body, turning an `errorCode` object into [`ApiError::Remote`].
fn decode_payload<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, ApiError> {
    let decode = |source| ApiError::Decode {
        url: url.to_owned(),
        source,
    };
    let value: serde_json::Value = serde_json::from_slice(body).map_err(decode)?;
    if value
        .as_object()
        .is_some_and(|obj| obj.contains_key("errorCode"))
    {
        let payload: RemoteErrorPayload = serde_json::from_value(value).map_err(decode)?;
        let code = match payload.error_code {
            serde_json::Value::String(code) => code,
            other => other.to_string(),
        };
        return Err(ApiError::Remote {
            code,
            message: payload.error_message,
        });
    }
    serde_json::from_value(value).map_err(decode)
}

/// Split a flat file listing per project, keeping API order within each.
fn group_by_project(files: Vec<ReleaseFile>) -> HashMap<ProjectId, Vec<ReleaseFile>> {
    let mut grouped: HashMap<ProjectId, Vec<ReleaseFile>> = HashMap::new();
    for file in files {
        grouped.entry(file.project_id).or_default().push(file);
    }
    grouped
}
