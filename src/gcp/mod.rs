// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Google Cloud REST client.
//!
//! A thin wrapper over `reqwest` that knows the API roots Iris talks to, attaches
//! bearer tokens, follows list pagination, retries transient failures and speaks
//! the batch protocol.
//!
//! # Example
//!
//! ```rust,no_run
//! use iris::config::Config;
//! use iris::gcp::{GcpClient, Service};
//!
//! # async fn example() -> Result<(), iris::errors::ProviderError> {
//! let client = GcpClient::new(&Config::default())?;
//! let zones = client.list_zones("my-project").await?;
//! let disks = client
//!     .list_all(Service::Compute, "/compute/v1/projects/my-project/zones/us-east1-b/disks", "items", &[])
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;

use crate::batch::HttpVerb;
use crate::config::Config;
use crate::constants::{
    BIGQUERY_API_ROOT, BIGTABLE_ADMIN_API_ROOT, COMPUTE_API_ROOT, PUBSUB_API_ROOT,
    RESOURCE_MANAGER_API_ROOT, SQLADMIN_API_ROOT, STORAGE_API_ROOT,
};
use crate::errors::ProviderError;
use crate::labels::LabelMap;
use crate::retry::{retry_provider_call, RetryPolicy};
use auth::TokenSource;
use base64::Engine;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use url::form_urlencoded;

/// A Google API family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Compute Engine
    Compute,
    /// Cloud Storage JSON API
    Storage,
    /// BigQuery
    Bigquery,
    /// Pub/Sub
    Pubsub,
    /// Cloud SQL Admin
    SqlAdmin,
    /// Bigtable Admin
    BigtableAdmin,
    /// Resource Manager
    ResourceManager,
}

impl Service {
    fn default_root(self) -> &'static str {
        match self {
            Self::Compute => COMPUTE_API_ROOT,
            Self::Storage => STORAGE_API_ROOT,
            Self::Bigquery => BIGQUERY_API_ROOT,
            Self::Pubsub => PUBSUB_API_ROOT,
            Self::SqlAdmin => SQLADMIN_API_ROOT,
            Self::BigtableAdmin => BIGTABLE_ADMIN_API_ROOT,
            Self::ResourceManager => RESOURCE_MANAGER_API_ROOT,
        }
    }

    /// Path of the service's batch endpoint, for services that have one.
    #[must_use]
    pub fn batch_path(self) -> Option<&'static str> {
        match self {
            Self::Compute => Some("/batch/compute/v1"),
            Self::Storage => Some("/batch/storage/v1"),
            Self::Bigquery => Some("/batch/bigquery/v2"),
            _ => None,
        }
    }
}

/// Whether a project id belongs to an Apps Script project (`sys-` plus 26 digits).
///
/// These are created implicitly and cannot be labeled.
#[must_use]
pub fn is_apps_script_project(project_id: &str) -> bool {
    project_id
        .strip_prefix("sys-")
        .is_some_and(|digits| digits.len() == 26 && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Authenticated client for every Google API Iris uses.
pub struct GcpClient {
    http: reqwest::Client,
    endpoint_override: Option<String>,
    token: TokenSource,
    retry: RetryPolicy,
}

impl GcpClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("iris/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ProviderError::Request {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint_override: config
                .endpoint_override
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            token: TokenSource::resolve(config.access_token.as_deref()),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// API root for a service, honouring `endpoint_override`.
    #[must_use]
    pub fn root(&self, service: Service) -> &str {
        self.endpoint_override
            .as_deref()
            .unwrap_or_else(|| service.default_root())
    }

    /// Absolute URL for a path (which may already carry a query) plus extra query pairs.
    #[must_use]
    pub fn url(&self, service: Service, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}{path}", self.root(service));
        if !query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            url.push(if path.contains('?') { '&' } else { '?' });
            url.push_str(&encoded);
        }
        url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) async fn bearer(&self) -> Result<String, ProviderError> {
        self.token.token(&self.http).await
    }

    /// GET a resource.
    ///
    /// # Errors
    ///
    /// Returns an error once retries are exhausted or on a non-retryable status.
    pub async fn get(&self, service: Service, path: &str) -> Result<Value, ProviderError> {
        let url = self.url(service, path, &[]);
        self.call(Method::GET, &url, None).await
    }

    /// Send a JSON body with `verb` to `path` (which may include a query string).
    ///
    /// # Errors
    ///
    /// Returns an error once retries are exhausted or on a non-retryable status.
    pub async fn send(
        &self,
        verb: HttpVerb,
        service: Service,
        path: &str,
        body: &Value,
    ) -> Result<Value, ProviderError> {
        let method = match verb {
            HttpVerb::Post => Method::POST,
            HttpVerb::Patch => Method::PATCH,
        };
        let url = self.url(service, path, &[]);
        self.call(method, &url, Some(body)).await
    }

    /// List every item of a paginated collection.
    ///
    /// Follows `nextPageToken` until it is absent. `items_key` names the array
    /// holding the page's items (`items`, `datasets`, `topics`, ...); a page
    /// without it contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns the error of the first page that fails.
    pub async fn list_all(
        &self,
        service: Service,
        path: &str,
        items_key: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Value>, ProviderError> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0;

        loop {
            page_count += 1;
            let mut pairs: Vec<(&str, &str)> = query.to_vec();
            if let Some(token) = page_token.as_deref() {
                pairs.push(("pageToken", token));
            }
            let url = self.url(service, path, &pairs);
            let mut page = self.call(Method::GET, &url, None).await?;

            let items = match page.get_mut(items_key).map(Value::take) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let item_count = items.len();
            all_items.extend(items);

            debug!(
                path = path,
                page = page_count,
                items_in_page = item_count,
                total_items = all_items.len(),
                "Fetched list page"
            );

            match page.get("nextPageToken").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(all_items)
    }

    /// Names of every zone visible to a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone list cannot be fetched.
    pub async fn list_zones(&self, project_id: &str) -> Result<Vec<String>, ProviderError> {
        let zones = self
            .list_all(
                Service::Compute,
                &format!("/compute/v1/projects/{project_id}/zones"),
                "items",
                &[],
            )
            .await?;
        Ok(zones
            .iter()
            .filter_map(|z| z.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Ids of every active project the caller can see, Apps Script projects excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the project list cannot be fetched.
    pub async fn list_projects(&self) -> Result<Vec<String>, ProviderError> {
        let projects = self
            .list_all(Service::ResourceManager, "/v1/projects", "projects", &[])
            .await?;
        Ok(projects
            .iter()
            .filter(|p| p.get("lifecycleState").and_then(Value::as_str) == Some("ACTIVE"))
            .filter_map(|p| p.get("projectId").and_then(Value::as_str))
            .filter(|id| !is_apps_script_project(id))
            .map(str::to_string)
            .collect())
    }

    /// A project's own labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be read.
    pub async fn project_labels(&self, project_id: &str) -> Result<LabelMap, ProviderError> {
        let project = self
            .get(Service::ResourceManager, &format!("/v3/projects/{project_id}"))
            .await?;
        Ok(crate::record::ResourceRecord::new(project).labels_at("/labels"))
    }

    /// Publish one JSON message to a Pub/Sub topic.
    ///
    /// # Errors
    ///
    /// Returns an error if publishing fails.
    pub async fn publish(
        &self,
        project_id: &str,
        topic: &str,
        data: &Value,
    ) -> Result<(), ProviderError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data.to_string());
        let body = json!({ "messages": [{ "data": encoded }] });
        self.send(
            HttpVerb::Post,
            Service::Pubsub,
            &format!("/v1/projects/{project_id}/topics/{topic}:publish"),
            &body,
        )
        .await?;
        Ok(())
    }

    /// One request with retries; the response body decoded as JSON.
    async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let operation_name = format!("{method} {url}");
        retry_provider_call(
            self.retry,
            || self.call_once(method.clone(), url, body),
            &operation_name,
        )
        .await
    }

    async fn call_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        debug!(method = %method, url = %url, "Google API request");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(self.bearer().await?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::Request {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                message: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|source| ProviderError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
