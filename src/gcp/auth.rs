// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bearer tokens for Google API calls.
//!
//! A static token (from configuration or `IRIS_ACCESS_TOKEN`) is used as-is.
//! Otherwise tokens come from the GCE metadata server and are cached until shortly
//! before they expire.

use crate::constants::{METADATA_TOKEN_URL, TOKEN_EXPIRY_MARGIN};
use crate::errors::ProviderError;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Environment variable holding a static access token
pub const ACCESS_TOKEN_ENV: &str = "IRIS_ACCESS_TOKEN";

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

/// Where access tokens come from.
pub enum TokenSource {
    /// A fixed token
    Static(String),
    /// The metadata server of the VM, Cloud Run service or App Engine instance we run on
    Metadata {
        /// Token endpoint
        url: String,
        /// Cached token and the instant it should be refreshed
        cached: Mutex<Option<(String, Instant)>>,
    },
}

impl TokenSource {
    /// Pick a token source: explicit token, then `IRIS_ACCESS_TOKEN`, then the metadata server.
    #[must_use]
    pub fn resolve(configured: Option<&str>) -> Self {
        if let Some(token) = configured {
            return Self::Static(token.to_string());
        }
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                return Self::Static(token);
            }
        }
        Self::metadata(METADATA_TOKEN_URL)
    }

    /// Metadata-server token source for a given endpoint.
    #[must_use]
    pub fn metadata(url: &str) -> Self {
        Self::Metadata {
            url: url.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Current access token.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Token`] if the metadata server cannot be reached or
    /// answers with something other than a token.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, ProviderError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata { url, cached } => {
                let mut cached = cached.lock().await;
                if let Some((token, refresh_at)) = cached.as_ref() {
                    if Instant::now() < *refresh_at {
                        return Ok(token.clone());
                    }
                }

                let response = http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| ProviderError::Token(format!("metadata server unreachable: {e}")))?;
                if !response.status().is_success() {
                    return Err(ProviderError::Token(format!(
                        "metadata server answered {}",
                        response.status()
                    )));
                }
                let token: MetadataToken = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Token(format!("bad metadata token: {e}")))?;

                let lifetime = Duration::from_secs(token.expires_in)
                    .saturating_sub(TOKEN_EXPIRY_MARGIN);
                debug!(expires_in = token.expires_in, "Fetched access token from metadata server");
                *cached = Some((token.access_token.clone(), Instant::now() + lifetime));
                Ok(token.access_token)
            }
        }
    }
}
