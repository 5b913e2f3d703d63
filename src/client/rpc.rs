//! Typed HTTP calls to the directory, catalog and storage devices

use crate::catalog::{FileRecord, OpenRequest, SetSizeRequest};
use crate::common::auth::{GROUPS_HEADER, USER_HEADER};
use crate::common::{ClusterConfig, Credentials, Error, HealthResponse, Result, TlsOptions};
use crate::directory::VolumeRecord;
use crate::storage::{ObjectInfo, TruncateRequest, TruncateResponse};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    scheme: &'static str,
    running: Arc<AtomicBool>,
}

impl RpcClient {
    pub fn new(
        credentials: &Credentials,
        tls: Option<&TlsOptions>,
        config: &ClusterConfig,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, header_value(credentials.username())?);
        headers.insert(GROUPS_HEADER, header_value(&credentials.groups_header_value())?);

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .default_headers(headers);

        let scheme = match tls {
            Some(tls) => {
                let pem = std::fs::read(&tls.ca_cert_path)?;
                builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
                "https"
            }
            None => "http",
        };

        Ok(Self {
            http: builder.build()?,
            scheme,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(Error::NotRunning("client".into()))
        }
    }

    fn url(&self, address: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, address, path)
    }

    // === Any service ===

    /// Probe a service; works before the client is marked running
    pub async fn health(&self, address: &str) -> Result<HealthResponse> {
        let resp = self
            .http
            .get(self.url(address, "/health"))
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", address, e)))?;
        let resp = check(resp, || Error::NotRunning(address.to_string())).await?;
        Ok(resp.json().await?)
    }

    // === Directory ===

    pub async fn resolve_volume(&self, directory: &str, volume: &str) -> Result<VolumeRecord> {
        self.ensure_running()?;
        let resp = self
            .http
            .get(self.url(directory, &format!("/volumes/{}", volume)))
            .send()
            .await?;
        let resp = check(resp, || Error::VolumeNotFound(volume.to_string())).await?;
        Ok(resp.json().await?)
    }

    // === Metadata catalog ===

    pub async fn storage_devices(&self, catalog: &str) -> Result<Vec<String>> {
        self.ensure_running()?;
        let resp = self
            .http
            .get(self.url(catalog, "/storage-devices"))
            .send()
            .await?;
        let resp = check(resp, || Error::NotRunning(catalog.to_string())).await?;
        Ok(resp.json().await?)
    }

    pub async fn open_file(&self, catalog: &str, path: &str, create: bool) -> Result<FileRecord> {
        self.ensure_running()?;
        let resp = self
            .http
            .post(self.url(catalog, "/files/open"))
            .json(&OpenRequest {
                path: path.to_string(),
                create,
            })
            .send()
            .await?;
        let resp = check(resp, || Error::FileNotFound(path.to_string())).await?;
        Ok(resp.json().await?)
    }

    pub async fn get_file(&self, catalog: &str, file_id: &str) -> Result<FileRecord> {
        self.ensure_running()?;
        let resp = self
            .http
            .get(self.url(catalog, &format!("/files/{}", file_id)))
            .send()
            .await?;
        let resp = check(resp, || Error::FileNotFound(file_id.to_string())).await?;
        Ok(resp.json().await?)
    }

    pub async fn set_file_size(
        &self,
        catalog: &str,
        file_id: &str,
        size: u64,
        truncate: bool,
    ) -> Result<FileRecord> {
        self.ensure_running()?;
        let resp = self
            .http
            .post(self.url(catalog, &format!("/files/{}/size", file_id)))
            .json(&SetSizeRequest { size, truncate })
            .send()
            .await?;
        let resp = check(resp, || Error::FileNotFound(file_id.to_string())).await?;
        Ok(resp.json().await?)
    }

    // === Storage devices ===

    /// Fetch an object; `None` if the device never stored it
    pub async fn read_object(
        &self,
        device: &str,
        file_id: &str,
        object_no: u64,
    ) -> Result<Option<Bytes>> {
        self.ensure_running()?;
        let resp = self
            .http
            .get(self.url(device, &format!("/objects/{}/{}", file_id, object_no)))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp, || Error::ObjectNotFound {
            file_id: file_id.to_string(),
            object_no,
        })
        .await?;
        Ok(Some(resp.bytes().await?))
    }

    pub async fn write_object(
        &self,
        device: &str,
        file_id: &str,
        object_no: u64,
        data: Bytes,
    ) -> Result<ObjectInfo> {
        self.ensure_running()?;
        let resp = self
            .http
            .put(self.url(device, &format!("/objects/{}/{}", file_id, object_no)))
            .body(data)
            .send()
            .await?;
        let resp = check(resp, || Error::NotRunning(device.to_string())).await?;
        Ok(resp.json().await?)
    }

    pub async fn object_info(
        &self,
        device: &str,
        file_id: &str,
        object_no: u64,
    ) -> Result<ObjectInfo> {
        self.ensure_running()?;
        let resp = self
            .http
            .get(self.url(
                device,
                &format!("/objects/{}/{}/checksum", file_id, object_no),
            ))
            .send()
            .await?;
        let resp = check(resp, || Error::ObjectNotFound {
            file_id: file_id.to_string(),
            object_no,
        })
        .await?;
        Ok(resp.json().await?)
    }

    pub async fn truncate(
        &self,
        device: &str,
        file_id: &str,
        size: u64,
        stripe_size: u64,
    ) -> Result<TruncateResponse> {
        self.ensure_running()?;
        let resp = self
            .http
            .post(self.url(device, &format!("/files/{}/truncate", file_id)))
            .json(&TruncateRequest { size, stripe_size })
            .send()
            .await?;
        let resp = check(resp, || Error::NotRunning(device.to_string())).await?;
        Ok(resp.json().await?)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::InvalidConfig(format!("credentials not usable as header: {}", e)))
}

/// Map a non-success response to an [`Error`]
async fn check(resp: Response, not_found: impl FnOnce() -> Error) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    Err(match status {
        StatusCode::NOT_FOUND => not_found(),
        StatusCode::FORBIDDEN => Error::PermissionDenied(message),
        StatusCode::BAD_REQUEST => Error::InvalidPath(message),
        _ => Error::UnexpectedStatus {
            status: status.as_u16(),
            message,
        },
    })
}
