//! Google Drive v3 backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, instrument};

use super::query::ListQuery;
use super::types::{DriveErrorResponse, FilesListResponse, Page, StorageError};
use super::FileStorage;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Drive caps `pageSize` at 1000.
const MAX_PAGE_SIZE: u32 = 1000;

const LIST_FIELDS: &str = "nextPageToken,files(id,name)";

/// Connection settings for [`GoogleDriveStorage`]
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub access_token: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl DriveConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: DRIVE_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Drive-backed [`FileStorage`]. The access token must already be authorized
/// for the `drive` scope.
pub struct GoogleDriveStorage {
    client: Client,
    config: DriveConfig,
}

impl GoogleDriveStorage {
    pub fn new(config: DriveConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .user_agent(concat!("skurename/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn list_url(&self, query: &ListQuery, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields={}&supportsAllDrives=true&includeItemsFromAllDrives=true",
            self.config.api_base,
            urlencoding::encode(&query.to_drive_expression()),
            query.page_size().min(MAX_PAGE_SIZE),
            urlencoding::encode(LIST_FIELDS),
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        url
    }

    fn file_url(&self, id: &str) -> String {
        format!(
            "{}/files/{}?fields=id,name&supportsAllDrives=true",
            self.config.api_base,
            urlencoding::encode(id)
        )
    }

    async fn check_status(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}

/// Map a non-success Drive response to a [`StorageError`].
fn classify_error(status: StatusCode, body: &str) -> StorageError {
    let message = serde_json::from_str::<DriveErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return StorageError::RateLimited;
    }

    if status == StatusCode::FORBIDDEN && message.to_lowercase().contains("rate limit") {
        return StorageError::RateLimited;
    }

    StorageError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl FileStorage for GoogleDriveStorage {
    #[instrument(skip(self, query), fields(q = %query.to_drive_expression()))]
    async fn list(&self, query: &ListQuery, page_token: Option<&str>) -> Result<Page, StorageError> {
        let url = self.list_url(query, page_token);
        debug!("Requesting: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let list: FilesListResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(e.to_string()))?;

        Ok(Page {
            entries: list.files,
            next_page_token: list.next_page_token,
        })
    }

    #[instrument(skip(self))]
    async fn rename(&self, id: &str, new_name: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .patch(self.file_url(id))
            .bearer_auth(&self.config.access_token)
            .json(&serde_json::json!({ "name": new_name }))
            .send()
            .await?;
        Self::check_status(response).await?;

        info!("Renamed {} to {}", id, new_name);
        Ok(())
    }
}
