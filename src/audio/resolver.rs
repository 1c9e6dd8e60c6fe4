//! Audio Resource Resolution
//!
//! Turns an [`AudioRef`] into an [`AudioClip`]: bundled names are read from
//! the bundle directory, remote URLs are fetched over HTTP.

use super::{AudioClip, AudioError, AudioRef};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trait for turning audio references into playable clips
pub trait ResourceResolver: Send + Sync + 'static {
    /// Resolve a reference into encoded audio bytes
    fn resolve(
        &self,
        resource: &AudioRef,
    ) -> impl std::future::Future<Output = Result<AudioClip, AudioError>> + Send;
}

/// Default resolver: bundle directory on disk plus an HTTP client.
pub struct DefaultResolver {
    bundle_dir: PathBuf,
    client: reqwest::Client,
}

impl DefaultResolver {
    /// Create a resolver reading bundled assets from `bundle_dir`.
    pub fn new(bundle_dir: impl Into<PathBuf>, http_timeout: Duration) -> Result<Self, AudioError> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| AudioError::NetworkFailure {
                resource: "http client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            bundle_dir: bundle_dir.into(),
            client,
        })
    }

    /// Directory bundled names are resolved against.
    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    /// Map a bundle name onto the bundle directory, refusing to escape it.
    fn bundle_path(&self, name: &str) -> Result<PathBuf, AudioError> {
        let relative = Path::new(name);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if name.is_empty() || escapes {
            return Err(AudioError::ResourceNotFound(name.to_string()));
        }
        Ok(self.bundle_dir.join(relative))
    }

    async fn read_bundle(&self, resource: &AudioRef, name: &str) -> Result<AudioClip, AudioError> {
        let path = self.bundle_path(name)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(AudioClip::new(resource.clone(), bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AudioError::ResourceNotFound(path.display().to_string()))
            }
            Err(e) => Err(AudioError::PlaybackFailed(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn fetch_remote(&self, resource: &AudioRef, url: &str) -> Result<AudioClip, AudioError> {
        let network_failure = |reason: String| AudioError::NetworkFailure {
            resource: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_failure(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AudioError::ResourceNotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(network_failure(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| network_failure(e.to_string()))?;

        tracing::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(AudioClip::new(resource.clone(), bytes.to_vec()))
    }
}

impl ResourceResolver for DefaultResolver {
    async fn resolve(&self, resource: &AudioRef) -> Result<AudioClip, AudioError> {
        match resource {
            AudioRef::Bundle(name) => self.read_bundle(resource, name).await,
            AudioRef::Remote(url) => self.fetch_remote(resource, url).await,
        }
    }
}
