use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::mods::ApiError;

/// Minimum spacing between progress callbacks while streaming.
const PROGRESS_TICK_SECS: f32 = 0.1;

/// Sibling path a download is streamed into before it replaces `dest`.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Download `url` to `dest`, calling `progress` with `(downloaded, total)`.
///
/// Bytes go to a `.part` file first; `dest` is only replaced once the whole
/// body has arrived, so an interrupted update never clobbers the jar that is
/// already installed.
pub async fn download_to_path(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64, ApiError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ApiError::Http {
            url: url.to_owned(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            url: url.to_owned(),
            status,
        });
    }

    let part = partial_path(dest);
    let total = response.content_length();
    let mut file = File::create(&part).await.map_err(|source| ApiError::Io {
        path: part.clone(),
        source,
    })?;

    let streamed = stream_body(response, &mut file, &part, url, total, progress).await;
    drop(file);
    let downloaded = match streamed {
        Ok(downloaded) => downloaded,
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&part).await {
                warn!(
                    "download: could not remove partial file {}: {cleanup}",
                    part.display()
                );
            }
            return Err(err);
        }
    };

    fs::rename(&part, dest)
        .await
        .map_err(|source| ApiError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
    debug!("download: wrote {downloaded} bytes to {}", dest.display());
    Ok(downloaded)
}

async fn stream_body(
    response: reqwest::Response,
    file: &mut File,
    part: &Path,
    url: &str,
    total: Option<u64>,
    progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64, ApiError> {
    let write_err = |source| ApiError::Io {
        path: part.to_path_buf(),
        source,
    };
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_tick = Instant::now();

    progress(0, total);
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            // The connection closed before Content-Length bytes arrived.
            Err(source)
                if (source.is_body() || source.is_decode())
                    && total.is_some_and(|expected| downloaded < expected) =>
            {
                debug!("download: body of {url} ended early: {source}");
                return Err(ApiError::Incomplete {
                    url: url.to_owned(),
                    received: downloaded,
                    expected: total.unwrap_or_default(),
                });
            }
            Err(source) => {
                return Err(ApiError::Http {
                    url: url.to_owned(),
                    source,
                });
            }
        };
        file.write_all(&chunk).await.map_err(write_err)?;
        downloaded += chunk.len() as u64;

        if last_tick.elapsed().as_secs_f32() > PROGRESS_TICK_SECS {
            progress(downloaded, total);
            last_tick = Instant::now();
        }
    }

    // Final callback.
    progress(downloaded, total);
    file.flush().await.map_err(write_err)?;

    if let Some(total) = total
        && downloaded < total
    {
        return Err(ApiError::Incomplete {
            url: url.to_owned(),
            received: downloaded,
            expected: total,
        });
    }
    Ok(downloaded)
}
