//! Remote object store backend (WebDAV-style HTTP API)
//!
//! Files are uploaded with `PUT` and directories are created with `MKCOL`.
//! Destination paths are the local mount view of the store; the configured
//! `strip_prefix` regex removes the mount prefix before the remainder is
//! appended to `<base_url>/<username>`.

use super::traits::{size_mb, BackendKind, StorageBackend};
use crate::config::{secret_string, RemoteConfig, SecretString};
use crate::domain::{PipelineError, Result, StorageError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use secrecy::ExposeSecret;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the API username
pub const ENV_USERNAME: &str = "NEXTCLOUD_API_USERNAME";
/// Environment variable holding the API password
pub const ENV_PASSWORD: &str = "NEXTCLOUD_API_PASSWORD";
/// Environment variable holding the API base URL
pub const ENV_BASE_URL: &str = "NEXTCLOUD_API_URL";

/// Credentials for the remote store
#[derive(Debug, Clone)]
pub struct RemoteCredentials {
    /// API username, also the first path segment under the base URL
    pub username: String,
    /// API password
    pub password: SecretString,
    /// Base URL of the WebDAV files endpoint
    pub base_url: String,
}

impl RemoteCredentials {
    /// Read credentials from the process environment
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error naming every missing variable.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let username = read(ENV_USERNAME);
        let password = read(ENV_PASSWORD);
        let base_url = read(ENV_BASE_URL);

        let missing: Vec<&str> = [
            (ENV_USERNAME, username.is_none()),
            (ENV_PASSWORD, password.is_none()),
            (ENV_BASE_URL, base_url.is_none()),
        ]
        .into_iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| name)
        .collect();

        match (username, password, base_url) {
            (Some(username), Some(password), Some(base_url)) => Ok(Self {
                username,
                password: secret_string(password),
                base_url,
            }),
            _ => {
                tracing::error!(missing = ?missing, "Missing required environment variables for remote storage");
                Err(PipelineError::Configuration(format!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// Remote storage backend
#[derive(Debug)]
pub struct RemoteBackend {
    client: Client,
    api_root: Url,
    username: String,
    password: SecretString,
    strip_prefix: Regex,
}

impl RemoteBackend {
    /// Create a remote backend
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when the base URL or the strip-prefix
    /// regex is invalid, or the HTTP client cannot be built.
    pub fn new(credentials: RemoteCredentials, config: &RemoteConfig) -> Result<Self> {
        let mut api_root = Url::parse(&credentials.base_url).map_err(|e| {
            PipelineError::Configuration(format!(
                "Invalid remote base URL '{}': {e}",
                credentials.base_url
            ))
        })?;
        api_root
            .path_segments_mut()
            .map_err(|_| {
                PipelineError::Configuration(format!(
                    "Remote base URL cannot be a base: {}",
                    credentials.base_url
                ))
            })?
            .pop_if_empty()
            .push(&credentials.username);

        let strip_prefix = Regex::new(&config.strip_prefix).map_err(|e| {
            PipelineError::Configuration(format!("Invalid remote.strip_prefix regex: {e}"))
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_root,
            username: credentials.username,
            password: credentials.password,
            strip_prefix,
        })
    }

    /// Path relative to the store root for a destination path
    pub fn relative_path(&self, dest: &Path) -> String {
        let dest = dest.to_string_lossy();
        self.strip_prefix
            .replace(&dest, "")
            .trim_start_matches('/')
            .to_string()
    }

    /// Full request URL for a destination path
    pub fn url_for(&self, dest: &Path) -> Url {
        let relative = self.relative_path(dest);
        let mut url = self.api_root.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(relative.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.expose_secret().as_ref()))
    }
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn ensure_directory(&self, path: &Path) -> Result<()> {
        let relative = self.relative_path(path);
        let url = self.url_for(path);
        let method = Method::from_bytes(b"MKCOL")
            .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?;

        let response = self.request(method, url).send().await.map_err(|e| {
            tracing::error!(error = %e, remote_folder_path = %relative, "Folder creation request failed");
            StorageError::BackendUnavailable(e.to_string())
        })?;

        // 405 and 409 are returned for collections that already exist
        match response.status() {
            StatusCode::CREATED | StatusCode::METHOD_NOT_ALLOWED | StatusCode::CONFLICT => {
                tracing::info!(
                    remote_folder_path = %relative,
                    status = response.status().as_u16(),
                    "Folder ready"
                );
                Ok(())
            }
            status => {
                tracing::error!(
                    remote_folder_path = %relative,
                    status = status.as_u16(),
                    "Folder creation failed"
                );
                Err(StorageError::UnexpectedStatus {
                    status: status.as_u16(),
                    path: relative,
                }
                .into())
            }
        }
    }

    async fn place(&self, source: &Path, dest: &Path) -> Result<()> {
        let metadata = match tokio::fs::metadata(source).await {
            Ok(m) if m.is_file() => m,
            _ => {
                tracing::error!(source_path = %source.display(), "Upload failed, local file not found");
                return Err(StorageError::SourceNotFound(source.to_path_buf()).into());
            }
        };

        let relative = self.relative_path(dest);
        let url = self.url_for(dest);

        tracing::info!(
            file_size_mb = size_mb(metadata.len()),
            dest_path = %relative,
            "Upload started"
        );

        // Streamed from disk, never buffered whole
        let file = tokio::fs::File::open(source)
            .await
            .map_err(|_| StorageError::SourceNotFound(source.to_path_buf()))?;

        let response = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, metadata.len())
            .body(file)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, dest_path = %relative, "Upload request failed");
                StorageError::BackendUnavailable(e.to_string())
            })?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                tracing::info!(dest_path = %relative, "Upload succeeded");
                Ok(())
            }
            status => {
                tracing::error!(
                    dest_path = %relative,
                    status = status.as_u16(),
                    "Upload failed with unexpected response"
                );
                Err(StorageError::UnexpectedStatus {
                    status: status.as_u16(),
                    path: relative,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn backend(base_url: &str) -> RemoteBackend {
        let credentials = RemoteCredentials {
            username: "svc-user".to_string(),
            password: secret_string("pw".to_string()),
            base_url: base_url.to_string(),
        };
        RemoteBackend::new(credentials, &RemoteConfig::default()).unwrap()
    }

    #[test]
    fn test_relative_path_strips_mount_prefix() {
        let backend = backend("https://cloud.example.org/remote.php/dav/files");
        let rel = backend.relative_path(&PathBuf::from(
            "/data/nextcloud/svc-user/files/results/genoflu/s1__genoflu.tsv",
        ));
        assert_eq!(rel, "results/genoflu/s1__genoflu.tsv");
    }

    #[test]
    fn test_relative_path_without_prefix() {
        let backend = backend("https://cloud.example.org/dav");
        assert_eq!(backend.relative_path(Path::new("/results/x.tsv")), "results/x.tsv");
    }

    #[test]
    fn test_url_for_appends_username_and_encodes() {
        let backend = backend("https://cloud.example.org/remote.php/dav/files/");
        let url = backend.url_for(Path::new("/mnt/files/run 1/s1__genoflu.tsv"));
        assert_eq!(
            url.as_str(),
            "https://cloud.example.org/remote.php/dav/files/svc-user/run%201/s1__genoflu.tsv"
        );
    }

    #[tokio::test]
    async fn test_ensure_directory_accepts_existing_collection() {
        let mut server = mockito::Server::new_async().await;
        let created = server
            .mock("MKCOL", "/svc-user/results")
            .match_header("authorization", "Basic c3ZjLXVzZXI6cHc=")
            .with_status(201)
            .create_async()
            .await;
        let backend = backend(&server.url());

        backend
            .ensure_directory(Path::new("/mnt/files/results"))
            .await
            .unwrap();
        created.assert_async().await;

        let exists = server
            .mock("MKCOL", "/svc-user/existing")
            .with_status(405)
            .create_async()
            .await;
        backend
            .ensure_directory(Path::new("/mnt/files/existing"))
            .await
            .unwrap();
        exists.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_directory_rejects_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("MKCOL", "/svc-user/results")
            .with_status(500)
            .create_async()
            .await;

        let err = backend(&server.url())
            .ensure_directory(Path::new("/mnt/files/results"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Storage(StorageError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_place_uploads_file_body() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("s1__genoflu.tsv");
        std::fs::write(&source, "Strain\tGenotype\ns1\tA\n").unwrap();

        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("PUT", "/svc-user/results/s1__genoflu.tsv")
            .match_header("content-type", "application/octet-stream")
            .match_body("Strain\tGenotype\ns1\tA\n")
            .with_status(201)
            .create_async()
            .await;

        backend(&server.url())
            .place(&source, Path::new("/mnt/files/results/s1__genoflu.tsv"))
            .await
            .unwrap();
        upload.assert_async().await;
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_place_unexpected_status() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("x.tsv");
        std::fs::write(&source, "x").unwrap();

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("PUT", "/svc-user/x.tsv")
            .with_status(507)
            .create_async()
            .await;

        let err = backend(&server.url())
            .place(&source, Path::new("/mnt/files/x.tsv"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Storage(StorageError::UnexpectedStatus { status: 507, .. })
        ));
    }

    #[tokio::test]
    async fn test_place_missing_source_makes_no_request() {
        let backend = backend("http://127.0.0.1:9");
        let err = backend
            .place(Path::new("/nonexistent/file.tsv"), Path::new("/mnt/files/x.tsv"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Storage(StorageError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_from_env_reports_missing_variables() {
        // Only asserts on the error path; the variables are unset in CI
        if std::env::var(ENV_USERNAME).is_ok() {
            return;
        }
        let err = RemoteCredentials::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_USERNAME));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let credentials = RemoteCredentials {
            username: "u".to_string(),
            password: secret_string("p".to_string()),
            base_url: "not a url".to_string(),
        };
        let err = RemoteBackend::new(credentials, &RemoteConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
