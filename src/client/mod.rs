//! HTTP client for a running team-points server.

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::model::{Category, CategoryPatch, Member, MemberFields};
use crate::service::ResetOutcome;

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "TEAM_POINTS_API_URL";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url`, e.g. `http://127.0.0.1:5000/api`
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        // Already installed by the binary; libraries and tests may not have done so
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("team-points/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_members(&self) -> Result<Vec<Member>> {
        let response = self
            .http
            .get(self.url("/members"))
            .send()
            .await
            .context("Failed to fetch members")?;
        read_json(response).await
    }

    pub async fn create_member(&self, fields: &MemberFields) -> Result<Member> {
        let response = self
            .http
            .post(self.url("/members"))
            .json(fields)
            .send()
            .await
            .context("Failed to create member")?;
        read_json(response).await
    }

    /// Overwrite the given fields of a member; `total` is recomputed by the server
    pub async fn update_member(&self, id: &str, fields: &MemberFields) -> Result<Member> {
        let response = self
            .http
            .put(self.url(&format!("/members/{}", id)))
            .json(fields)
            .send()
            .await
            .with_context(|| format!("Failed to update member {}", id))?;
        read_json(response).await
    }

    pub async fn delete_member(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/members/{}", id)))
            .send()
            .await
            .context("Failed to delete member")?;
        read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Add `value` to one category of a member
    pub async fn adjust(&self, id: &str, category: &str, value: i64) -> Result<Member> {
        let response = self
            .http
            .patch(self.url(&format!("/members/{}/{}", id, category)))
            .json(&json!({ "value": value }))
            .send()
            .await
            .with_context(|| format!("Failed to adjust {} for member {}", category, id))?;
        read_json(response).await
    }

    pub async fn reset_points(&self) -> Result<ResetOutcome> {
        let response = self
            .http
            .post(self.url("/members/reset-points"))
            .send()
            .await
            .context("Failed to reset points")?;
        read_json(response).await
    }

    /// Upload sheet text; the server replaces every member with its rows
    pub async fn import_sheet(&self, text: String) -> Result<Vec<Member>> {
        let response = self
            .http
            .post(self.url("/members/import"))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(text)
            .send()
            .await
            .context("Failed to upload sheet")?;
        read_json(response).await
    }

    /// Download the standings as tab-separated text
    pub async fn export_sheet(&self) -> Result<String> {
        let response = self
            .http
            .get(self.url("/members/export"))
            .send()
            .await
            .context("Failed to download sheet")?;
        let response = check_status(response).await?;
        response.text().await.context("Failed to read sheet body")
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let response = self
            .http
            .get(self.url("/categories"))
            .send()
            .await
            .context("Failed to fetch categories")?;
        read_json(response).await
    }

    pub async fn update_category(&self, id: &str, patch: &CategoryPatch) -> Result<Category> {
        let response = self
            .http
            .put(self.url(&format!("/categories/{}", id)))
            .json(patch)
            .send()
            .await
            .with_context(|| format!("Failed to update category {}", id))?;
        read_json(response).await
    }

    pub async fn update_category_by_key(&self, key: &str, patch: &CategoryPatch) -> Result<Category> {
        let response = self
            .http
            .put(self.url(&format!("/categories/key/{}", key)))
            .json(patch)
            .send()
            .await
            .with_context(|| format!("Failed to update category {}", key))?;
        read_json(response).await
    }
}

/// Turn a non-success response into an error carrying the server's `msg`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let message = body
        .get("msg")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    match status {
        StatusCode::NOT_FOUND => anyhow::bail!("Not found: {}", message),
        StatusCode::BAD_REQUEST => anyhow::bail!("Rejected: {}", message),
        _ => anyhow::bail!("Server returned {}: {}", status.as_u16(), message),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    response.json().await.context("Failed to parse response JSON")
}
