//! HTTP adapter for the read-side game API.
//!
//! Implements `StatsReader`, `HistoryReader` and `LeaderboardReader`
//! against the REST endpoints that sit next to the session server.
//!
//! # Authentication
//!
//! Each request carries `Authorization: Bearer <token>` when the
//! credential provider has a credential. A 401 or 403 response
//! invalidates the credential.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::UserId;
use crate::ports::{
    ApiError, CredentialProvider, HistoryEntry, HistoryPage, HistoryReader, LeaderboardEntry,
    LeaderboardReader, StatsReader, UserStats,
};

/// Configuration for the HTTP API adapter.
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Base URL all endpoint paths are joined onto.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// List envelope used by paginated endpoints.
#[derive(Debug, Deserialize)]
struct Paginated<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// REST client for stats, history and leaderboard.
pub struct HttpGameApi {
    base_url: Url,
    timeout: Duration,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpGameApi {
    /// Creates a client. Fails if the base URL does not parse.
    pub fn new(
        config: HttpApiConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            timeout: config.timeout,
            client,
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Network(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut request = self.client.get(url.clone()).header("Accept", "application/json");
        if let Some(credential) = self.credentials.current() {
            request = request.bearer_auth(credential.expose());
        }

        tracing::debug!(url = %url, "GET");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "request timed out");
                ApiError::Timeout
            } else if e.is_connect() {
                ApiError::Network(format!("Connection failed: {}", e))
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.reject(status, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Maps a failed status, dropping the credential on auth failures.
    fn reject(&self, status: StatusCode, body: String) -> ApiError {
        let error = map_status(status, body);
        if error == ApiError::Unauthorized {
            tracing::warn!(status = status.as_u16(), "credential rejected, invalidating");
            self.credentials.invalidate();
        }
        error
    }
}

#[async_trait]
impl StatsReader for HttpGameApi {
    async fn fetch_stats(&self, user_id: UserId) -> Result<UserStats, ApiError> {
        let url = self.endpoint(&format!("users/{}/stats/", user_id))?;
        self.get_json(url).await
    }
}

#[async_trait]
impl HistoryReader for HttpGameApi {
    async fn fetch_history(&self, page: HistoryPage) -> Result<Vec<HistoryEntry>, ApiError> {
        let mut url = self.endpoint("users/game-history/")?;
        if page.page > 1 {
            url.query_pairs_mut()
                .append_pair("page", &page.page.to_string());
        }
        let envelope: Paginated<HistoryEntry> = self.get_json(url).await?;
        Ok(envelope.results)
    }
}

#[async_trait]
impl LeaderboardReader for HttpGameApi {
    async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let url = self.endpoint("leaderboard/top10/")?;
        let envelope: Paginated<LeaderboardEntry> = self.get_json(url).await?;
        Ok(envelope.results)
    }
}

/// Parses the base URL and makes sure relative joins append to its path.
fn normalize_base(raw: &str) -> Result<Url, ApiError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ApiError::Network(format!("Invalid base URL '{}': {}", raw, e)))
}

fn map_status(status: StatusCode, body: String) -> ApiError {
    match status.as_u16() {
        401 | 403 => ApiError::Unauthorized,
        code => ApiError::Status {
            status: code,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::credentials::InMemoryCredentialStore;

    fn api_with(base: &str, store: Arc<InMemoryCredentialStore>) -> HttpGameApi {
        HttpGameApi::new(HttpApiConfig::new(base), store).unwrap()
    }

    #[test]
    fn endpoints_join_onto_base_path() {
        let api = api_with(
            "http://localhost:8000/user",
            Arc::new(InMemoryCredentialStore::new()),
        );

        assert_eq!(
            api.endpoint("users/7/stats/").unwrap().as_str(),
            "http://localhost:8000/user/users/7/stats/"
        );
        assert_eq!(
            api.endpoint("leaderboard/top10/").unwrap().as_str(),
            "http://localhost:8000/user/leaderboard/top10/"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = HttpGameApi::new(
            HttpApiConfig::new("not a url"),
            Arc::new(InMemoryCredentialStore::new()),
        );
        assert!(matches!(result, Err(ApiError::Network(_))));
    }

    #[test]
    fn auth_statuses_map_to_unauthorized() {
        assert_eq!(
            map_status(StatusCode::UNAUTHORIZED, String::new()),
            ApiError::Unauthorized
        );
        assert_eq!(
            map_status(StatusCode::FORBIDDEN, String::new()),
            ApiError::Unauthorized
        );
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, "missing".into()),
            ApiError::Status {
                status: 404,
                message: "missing".into()
            }
        );
    }

    #[test]
    fn rejection_invalidates_credential_only_on_auth_failure() {
        let store = Arc::new(InMemoryCredentialStore::with_token("t-1"));
        let api = api_with("http://localhost:8000/user/", store.clone());

        api.reject(StatusCode::INTERNAL_SERVER_ERROR, String::new());
        assert!(store.current().is_some());

        api.reject(StatusCode::FORBIDDEN, String::new());
        assert!(store.current().is_none());
    }

    #[test]
    fn paginated_envelope_defaults_to_empty() {
        let page: Paginated<LeaderboardEntry> = serde_json::from_str("{}").unwrap();
        assert!(page.results.is_empty());

        let page: Paginated<LeaderboardEntry> = serde_json::from_str(
            r#"{"count":1,"results":[{"rank":1,"username":"alice","wins":5}]}"#,
        )
        .unwrap();
        assert_eq!(page.results[0].username, "alice");
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let api = HttpGameApi::new(
            HttpApiConfig::new("http://127.0.0.1:1/user/").with_timeout(Duration::from_secs(2)),
            Arc::new(InMemoryCredentialStore::new()),
        )
        .unwrap();

        let result = api.fetch_leaderboard().await;

        assert!(matches!(
            result,
            Err(ApiError::Network(_)) | Err(ApiError::Timeout)
        ));
    }
}
