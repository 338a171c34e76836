//! Yandex Disk REST backend.
//!
//! Talks to `https://cloud-api.yandex.net/v1/disk` with an OAuth token.
//! Uploads are two-step: ask for an upload href (refused with 409 when the
//! path exists, since we never pass `overwrite=true`), then PUT the bytes.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use speed_core::StoreError;

use crate::backend::{ObjectBackend, StoreFuture};

pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// An OAuth token. Only [`DiskToken::expose`] hands out the raw value.
#[derive(Clone)]
pub struct DiskToken(String);

impl DiskToken {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DiskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DiskToken(***)")
    }
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "_embedded")]
    embedded: Option<ResourceList>,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    items: Vec<ResourceItem>,
}

#[derive(Debug, Deserialize)]
struct ResourceItem {
    name: String,
}

pub struct YaDiskBackend {
    http: reqwest::Client,
    api_url: String,
    token: DiskToken,
}

impl YaDiskBackend {
    pub fn new(api_url: String, token: DiskToken, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Backend(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{endpoint}", self.api_url))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("OAuth {}", self.token.expose()),
            )
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("HTTP request failed: {e}")))?;
        check_status(resp, path).await
    }

    async fn link(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<String, StoreError> {
        let link: Link = self
            .send(builder, path)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to parse link: {e}")))?;
        Ok(link.href)
    }

    async fn resource(&self, path: &str, query: &[(&str, &str)]) -> Result<Resource, StoreError> {
        let builder = self
            .request(Method::GET, "/resources")
            .query(&[("path", path)])
            .query(query);
        self.send(builder, path)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to parse resource: {e}")))
    }
}

async fn check_status(resp: reqwest::Response, path: &str) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => StoreError::TokenInvalid,
        StatusCode::NOT_FOUND => StoreError::NotFound(path.to_string()),
        StatusCode::CONFLICT => StoreError::AlreadyExists(path.to_string()),
        _ => StoreError::Backend(format!("Yandex Disk returned {status}: {body}")),
    })
}

impl ObjectBackend for YaDiskBackend {
    fn check_token(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let resp = self
                .request(Method::GET, "")
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("HTTP request failed: {e}")))?;
            match resp.status() {
                s if s.is_success() => Ok(true),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
                s => Err(StoreError::Backend(format!(
                    "token check returned {s}"
                ))),
            }
        })
    }

    fn is_dir<'a>(&'a self, path: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            match self.resource(path, &[("fields", "type")]).await {
                Ok(resource) => Ok(resource.kind == "dir"),
                Err(StoreError::NotFound(_)) => Ok(false),
                Err(e) => Err(e),
            }
        })
    }

    fn mkdir<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::PUT, "/resources")
                .query(&[("path", path)]);
            self.send(builder, path).await?;
            tracing::info!(path, "Directory created");
            Ok(())
        })
    }

    fn upload<'a>(&'a self, path: &'a str, bytes: &'a [u8]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let href = self
                .link(
                    self.request(Method::GET, "/resources/upload")
                        .query(&[("path", path), ("overwrite", "false")]),
                    path,
                )
                .await?;

            let resp = self
                .http
                .put(&href)
                .body(bytes.to_vec())
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("Upload failed: {e}")))?;
            check_status(resp, path).await?;
            Ok(())
        })
    }

    fn publish<'a>(&'a self, path: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let builder = self
                .request(Method::PUT, "/resources/publish")
                .query(&[("path", path)]);
            self.send(builder, path).await?;

            self.link(
                self.request(Method::GET, "/resources/download")
                    .query(&[("path", path)]),
                path,
            )
            .await
        })
    }

    fn list<'a>(&'a self, dir: &'a str) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move {
            let resource = self
                .resource(dir, &[("limit", "1000"), ("fields", "type,_embedded.items.name")])
                .await?;
            let mut names: Vec<String> = resource
                .embedded
                .map(|list| list.items.into_iter().map(|item| item.name).collect())
                .unwrap_or_default();
            names.sort();
            Ok(names)
        })
    }

    fn download<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let href = self
                .link(
                    self.request(Method::GET, "/resources/download")
                        .query(&[("path", path)]),
                    path,
                )
                .await?;
            let resp = self
                .http
                .get(&href)
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("Download failed: {e}")))?;
            let bytes = check_status(resp, path)
                .await?
                .bytes()
                .await
                .map_err(|e| StoreError::Backend(format!("Download failed: {e}")))?;
            Ok(bytes.to_vec())
        })
    }

    fn remove<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let builder = self
                .request(Method::DELETE, "/resources")
                .query(&[("path", path), ("permanently", "true")]);
            self.send(builder, path).await?;
            Ok(())
        })
    }

    fn backend_name(&self) -> &str {
        "yandex-disk"
    }
}
