use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::error::{CatalogError, Result};
use crate::records::{CategoryDetail, TaxonomyRow};

const CATEGORIES_PATH: &str = "/api/admin/catalog/categories";

/// HTTP client for the catalog API's category endpoints.
///
/// Each call is a single attempt; failures are returned to the caller, which
/// decides how to surface them.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(CatalogClient { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/admin/catalog/categories`
    pub async fn list_categories(&self) -> Result<Vec<TaxonomyRow>> {
        let url = format!("{}{}", self.base_url, CATEGORIES_PATH);
        log::debug!("GET {}", url);
        let response = check(self.http.get(&url).send().await?, None).await?;
        let rows: Vec<TaxonomyRow> = response.json().await?;
        log::debug!("fetched {} taxonomy rows", rows.len());
        Ok(rows)
    }

    /// `GET /api/admin/catalog/categories/{id}`
    pub async fn get_category(&self, id: i64) -> Result<CategoryDetail> {
        let url = format!("{}{}/{}", self.base_url, CATEGORIES_PATH, id);
        log::debug!("GET {}", url);
        let response = check(self.http.get(&url).send().await?, Some(id)).await?;
        Ok(response.json().await?)
    }

    /// `DELETE /api/admin/catalog/categories/{id}`; any 2xx counts as deleted.
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        let url = format!("{}{}/{}", self.base_url, CATEGORIES_PATH, id);
        log::debug!("DELETE {}", url);
        check(self.http.delete(&url).send().await?, Some(id)).await?;
        log::info!("deleted category {}", id);
        Ok(())
    }
}

async fn check(response: Response, id: Option<i64>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(CatalogError::NotFound(id));
    }

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
    });
    log::warn!("catalog api returned {}: {}", status, message);
    Err(CatalogError::Upstream {
        status: status.as_u16(),
        message,
    })
}

// The catalog API reports failures as `{"error": "..."}` or `{"message": "..."}`.
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let client = CatalogClient::new("http://catalog.local/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://catalog.local");
    }

    #[test]
    fn error_bodies() {
        assert_eq!(
            upstream_message(r#"{"error": "category has products"}"#).as_deref(),
            Some("category has products")
        );
        assert_eq!(
            upstream_message(r#"{"message": "nope"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(upstream_message("<html>"), None);
    }
}
