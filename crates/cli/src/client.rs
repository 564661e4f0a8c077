//! API client for communicating with the Cluster Recommender API

use anyhow::{Context, Result};
use recommender_lib::{CatalogTarget, HealthResponse};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the Cluster Recommender API
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// A path on `base_url` is kept as the prefix of every request.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = builder.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.request(Method::GET, path)?).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.request(Method::PUT, path)?.json(body)).await
    }

    /// Fetch service health, which is also served with 503 when unhealthy
    pub async fn status(&self) -> Result<HealthResponse> {
        let response = self
            .request(Method::GET, "status")?
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        response.json().await.context("Failed to parse response")
    }
}

/// Relative path of the cluster endpoint for a target
pub fn cluster_path(target: &CatalogTarget) -> String {
    format!(
        "recommender/provider/{}/service/{}/region/{}/cluster",
        target.provider, target.service, target.region
    )
}

pub const MULTICLOUD_PATH: &str = "recommender/multicloud";

/// Problem document returned by the API on failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemResponse {
    pub title: String,
    pub status: u16,
    #[serde(default)]
    pub detail: String,
}

/// Server build information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVersion {
    pub name: String,
    pub version: String,
    pub commit: String,
}

fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ProblemResponse>(body) {
        Ok(problem) if problem.detail.is_empty() => {
            anyhow::anyhow!("API error ({}): {}", status, problem.title)
        }
        Ok(problem) => anyhow::anyhow!("API error ({}): {}: {}", status, problem.title, problem.detail),
        Err(_) => anyhow::anyhow!("API error ({}): {}", status, body),
    }
}
