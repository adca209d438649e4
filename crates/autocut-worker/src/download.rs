//! Streaming HTTP download of job media.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_async, RetryConfig};

/// Download `url` into `dir` as `{prefix}-{uuid}.{extension}`.
///
/// Transient failures are retried; a partial file is removed before each
/// retry and on final failure.
pub async fn download_to_file(
    client: &Client,
    url: &Url,
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> WorkerResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}-{}.{}", prefix, Uuid::new_v4(), extension));

    let retry = RetryConfig::new("download");
    let bytes = retry_async(&retry, || async {
        let outcome = fetch(client, url, &path).await;
        if outcome.is_err() {
            let _ = tokio::fs::remove_file(&path).await;
        }
        outcome
    })
    .await?;

    info!(
        host = url.host_str().unwrap_or(""),
        bytes,
        path = %path.display(),
        "Download complete"
    );
    Ok(path)
}

async fn fetch(client: &Client, url: &Url, path: &Path) -> WorkerResult<u64> {
    debug!(url = %url, "Downloading");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| WorkerError::download_failed(format!("request failed: {}", e)))?;

    let status = response.status();
    if status.is_client_error() {
        return Err(WorkerError::invalid_input(format!(
            "download returned {}",
            status
        )));
    }
    if !status.is_success() {
        return Err(WorkerError::download_failed(format!(
            "download returned {}",
            status
        )));
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| WorkerError::download_failed(format!("stream interrupted: {}", e)))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        return Err(WorkerError::download_failed("empty response body"));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ep1.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/ep1.mp4", server.uri())).unwrap();
        let path = download_to_file(&Client::new(), &url, dir.path(), "source", "mp4")
            .await
            .unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().starts_with("source-"));
        assert_eq!(tokio::fs::read(&path).await.unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/missing.mp4", server.uri())).unwrap();
        let err = download_to_file(&Client::new(), &url, dir.path(), "source", "mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::InvalidInput(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/empty.mp4", server.uri())).unwrap();
        let err = download_to_file(&Client::new(), &url, dir.path(), "source", "mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::DownloadFailed(_)));
    }
}
