//! Catalog refresh over HTTP.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;

use super::Catalog;
use crate::error::CatalogError;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Downloads catalogs published in this tool's JSON schema.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: Client,
}

impl CatalogFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Fetches and validates a catalog from `url`.
    pub async fn fetch(&self, url: &str) -> Result<Catalog, CatalogError> {
        let failed = |reason: String| CatalogError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header("User-Agent", concat!("runtime-forge/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        let catalog = Catalog::from_json(&body)?;

        tracing::info!(url = %url, releases = catalog.len(), "Fetched runtime catalog");
        Ok(catalog)
    }

    /// Fetches a catalog and writes it to `cache_path`.
    pub async fn fetch_to(&self, url: &str, cache_path: &Path) -> Result<Catalog, CatalogError> {
        let catalog = self.fetch(url).await?;
        catalog.save(cache_path)?;
        tracing::info!(path = %cache_path.display(), "Cached runtime catalog");
        Ok(catalog)
    }
}

impl Default for CatalogFetcher {
    fn default() -> Self {
        Self::new()
    }
}
