// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blob filestore contract.
//!
//! The core consumes exactly three operations: download a blob, upload a
//! blob, list blobs under a prefix. Paths are opaque filestore keys, not
//! local filesystem paths.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from filestore operations.
#[derive(Debug, Error)]
pub enum FilestoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {code} for {path}")]
    Status { path: String, code: u16 },
}

/// Narrow blob-store contract the core consumes.
#[async_trait]
pub trait Filestore: Clone + Send + Sync + 'static {
    async fn download(&self, path: &str) -> Result<Vec<u8>, FilestoreError>;
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), FilestoreError>;
    /// Keys under `prefix`, non-recursive semantics are the backend's.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, FilestoreError>;
}

/// Filestore served by the control plane's HTTP surface.
#[derive(Clone)]
pub struct ApiFilestore {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl ApiFilestore {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Result<Self, FilestoreError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| FilestoreError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/filestore/{}", self.base, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Filestore for ApiFilestore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, FilestoreError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| FilestoreError::Transport(e.to_string()))?;
        match resp.status().as_u16() {
            404 => Err(FilestoreError::NotFound(path.to_string())),
            code if !resp.status().is_success() => Err(FilestoreError::Status {
                path: path.to_string(),
                code,
            }),
            _ => Ok(resp
                .bytes()
                .await
                .map_err(|e| FilestoreError::Transport(e.to_string()))?
                .to_vec()),
        }
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), FilestoreError> {
        let resp = self
            .http
            .put(self.url(path))
            .bearer_auth(&self.token)
            .body(bytes)
            .send()
            .await
            .map_err(|e| FilestoreError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FilestoreError::Status {
                path: path.to_string(),
                code: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, FilestoreError> {
        let resp = self
            .http
            .get(format!("{}/api/v1/filestore", self.base))
            .query(&[("prefix", prefix)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| FilestoreError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FilestoreError::Status {
                path: prefix.to_string(),
                code: resp.status().as_u16(),
            });
        }
        resp.json::<Vec<String>>()
            .await
            .map_err(|e| FilestoreError::Transport(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFilestore;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// In-memory filestore with failure injection and a download gate.
    ///
    /// The gate lets a test hold downloads open to observe prefetch
    /// overlap: [`hold_downloads`] parks every download until
    /// [`release_downloads`] is called.
    ///
    /// [`hold_downloads`]: FakeFilestore::hold_downloads
    /// [`release_downloads`]: FakeFilestore::release_downloads
    #[derive(Clone, Default)]
    pub struct FakeFilestore {
        inner: Arc<Mutex<Inner>>,
        release: Arc<Notify>,
    }

    #[derive(Default)]
    struct Inner {
        files: HashMap<String, Vec<u8>>,
        fail: HashSet<String>,
        fail_uploads: HashSet<String>,
        uploads: Vec<String>,
        held: bool,
    }

    impl FakeFilestore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
            self.inner.lock().files.insert(path.into(), bytes.into());
        }

        pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
            self.inner.lock().files.get(path).cloned()
        }

        /// Uploaded keys, in upload order.
        pub fn uploads(&self) -> Vec<String> {
            self.inner.lock().uploads.clone()
        }

        /// Make downloads of `path` fail.
        pub fn fail_download(&self, path: impl Into<String>) {
            self.inner.lock().fail.insert(path.into());
        }

        /// Make uploads under `prefix` fail.
        pub fn fail_upload(&self, prefix: impl Into<String>) {
            self.inner.lock().fail_uploads.insert(prefix.into());
        }

        /// Park all downloads until [`release_downloads`].
        ///
        /// [`release_downloads`]: FakeFilestore::release_downloads
        pub fn hold_downloads(&self) {
            self.inner.lock().held = true;
        }

        pub fn release_downloads(&self) {
            self.inner.lock().held = false;
            self.release.notify_waiters();
        }
    }

    #[async_trait]
    impl Filestore for FakeFilestore {
        async fn download(&self, path: &str) -> Result<Vec<u8>, FilestoreError> {
            loop {
                let notified = {
                    let inner = self.inner.lock();
                    if !inner.held {
                        break;
                    }
                    self.release.notified()
                };
                notified.await;
            }
            let inner = self.inner.lock();
            if inner.fail.contains(path) {
                return Err(FilestoreError::Transport(format!(
                    "injected failure for {path}"
                )));
            }
            inner
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| FilestoreError::NotFound(path.to_string()))
        }

        async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), FilestoreError> {
            let mut inner = self.inner.lock();
            if inner.fail_uploads.iter().any(|p| path.starts_with(p.as_str())) {
                return Err(FilestoreError::Transport(format!(
                    "injected upload failure for {path}"
                )));
            }
            inner.uploads.push(path.to_string());
            inner.files.insert(path.to_string(), bytes);
            Ok(())
        }

        async fn list(&self, prefix: &str) -> Result<Vec<String>, FilestoreError> {
            let inner = self.inner.lock();
            let mut keys: Vec<String> = inner
                .files
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(test)]
#[path = "filestore_tests.rs"]
mod tests;
