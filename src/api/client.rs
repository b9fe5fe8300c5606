use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::config::ApiConfig;
use super::error::{is_transient_status, ApiError};
use super::record::{CertificatePatch, CertificateRecord};
use crate::types::Operation;

const API_KEY_HEADER: &str = "x-api-key";
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Paging and search parameters for `list`
#[derive(Debug, Clone, Serialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self { page: 1, limit: 20, search: None }
    }
}

/// Client for the external certificate registry.
///
/// Every call carries the static `X-API-Key` header. Timeouts, connection
/// failures, `429` and `5xx` answers are retried up to `retry_attempts`
/// extra times; any other answer is final. Response bodies come back as
/// the service sent them.
#[derive(Debug, Clone)]
pub struct CertificateApi {
    http: reqwest::Client,
    config: ApiConfig,
    base_url: Option<Url>,
}

impl CertificateApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let base_url = if config.is_enabled() {
            let url = Url::parse(&config.api_base_url).map_err(|source| ApiError::InvalidBaseUrl {
                url: config.api_base_url.clone(),
                source,
            })?;
            Some(url)
        } else {
            None
        };

        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let value = HeaderValue::from_str(&config.api_key).map_err(|_| ApiError::InvalidApiKey)?;
            headers.insert(API_KEY_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|source| ApiError::Request { operation: Operation::Ping, source })?;

        Ok(Self { http, config, base_url })
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Register a certificate. A `409` means it already exists, in which
    /// case the stored record is updated instead.
    pub async fn create(&self, record: &CertificateRecord) -> Result<Value, ApiError> {
        if !self.is_enabled() {
            return Ok(json!({
                "success": true,
                "message": "API integration disabled",
                "skipped": true
            }));
        }

        info!(
            "Pushing certificate {} to registry (valid {} to {})",
            record.certificate_id, record.issue_date, record.expiry_date
        );
        let url = self.url(&[])?;
        let response = self
            .execute(Operation::Create, || self.http.post(url.clone()).json(record))
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => read_json(Operation::Create, response).await,
            StatusCode::CONFLICT => {
                warn!("Certificate {} already exists, updating it", record.certificate_id);
                self.update(&CertificatePatch::from(record)).await
            }
            _ => Err(status_error(Operation::Create, response).await),
        }
    }

    pub async fn update(&self, patch: &CertificatePatch) -> Result<Value, ApiError> {
        let url = self.url(&[])?;
        let response = self
            .execute(Operation::Update, || self.http.put(url.clone()).json(patch))
            .await?;

        if response.status() == StatusCode::OK {
            info!("Certificate {} updated in registry", patch.certificate_id);
            read_json(Operation::Update, response).await
        } else {
            Err(status_error(Operation::Update, response).await)
        }
    }

    /// The stored certificate, or `None` when the registry does not know it
    pub async fn get(&self, certificate_id: &str) -> Result<Option<Value>, ApiError> {
        let url = self.url(&[("certificate_id", certificate_id)])?;
        let response = self.execute(Operation::Read, || self.http.get(url.clone())).await?;

        match response.status() {
            StatusCode::OK => {
                let body = read_json(Operation::Read, response).await?;
                Ok(success_data(body))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error(Operation::Read, response).await),
        }
    }

    pub async fn delete(&self, certificate_id: &str) -> Result<Value, ApiError> {
        let url = self.url(&[("certificate_id", certificate_id)])?;
        let response = self.execute(Operation::Delete, || self.http.delete(url.clone())).await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => read_json(Operation::Delete, response).await,
            _ => Err(status_error(Operation::Delete, response).await),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Value, ApiError> {
        let page = query.page.to_string();
        let limit = query.limit.to_string();
        let mut pairs = vec![("page", page.as_str()), ("limit", limit.as_str())];
        if let Some(search) = &query.search {
            pairs.push(("search", search.as_str()));
        }

        let url = self.url(&pairs)?;
        let response = self.execute(Operation::List, || self.http.get(url.clone())).await?;

        if response.status() == StatusCode::OK {
            read_json(Operation::List, response).await
        } else {
            Err(status_error(Operation::List, response).await)
        }
    }

    /// First certificate whose recipient matches a name search
    pub async fn find_by_recipient(&self, recipient_name: &str) -> Result<Option<Value>, ApiError> {
        let query = ListQuery { page: 1, limit: 1, search: Some(recipient_name.to_string()) };
        let body = self.list(&query).await?;
        Ok(success_data(body)
            .and_then(|data| data.as_array().and_then(|rows| rows.first().cloned())))
    }

    /// Whether the service answers at all. `400` counts: the endpoint is up
    /// but wants parameters. A disabled client has nothing to reach and
    /// always passes.
    pub async fn ping(&self) -> bool {
        let Ok(url) = self.url(&[]) else {
            return true;
        };
        match self.http.get(url).timeout(PING_TIMEOUT).send().await {
            Ok(response) => matches!(response.status(), StatusCode::OK | StatusCode::BAD_REQUEST),
            Err(e) => {
                debug!("Ping failed: {}", e);
                false
            }
        }
    }

    fn url(&self, pairs: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone().ok_or(ApiError::Disabled)?;
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request, retrying transient failures. Returns the first
    /// non-transient response for the caller to interpret.
    async fn execute<F>(&self, operation: Operation, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = self.config.retry_attempts + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                warn!("Retry attempt {}/{} for {}", attempt, self.config.retry_attempts, operation);
                tokio::time::sleep(self.config.retry_delay()).await;
            }

            match build().send().await {
                Ok(response) if is_transient_status(response.status().as_u16()) => {
                    warn!("{} answered HTTP {}", operation, response.status());
                    last_error = Some(status_error(operation, response).await);
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    warn!("{} request timed out", operation);
                    last_error = Some(ApiError::Timeout { operation, attempts });
                }
                Err(e) if e.is_connect() => {
                    warn!("Could not connect to API service: {}", e);
                    last_error = Some(ApiError::Connection { operation, attempts });
                }
                Err(source) => return Err(ApiError::Request { operation, source }),
            }
        }

        Err(last_error.unwrap_or(ApiError::Connection { operation, attempts }))
    }
}

/// `data` of a `{"success": true, "data": ...}` envelope
fn success_data(body: Value) -> Option<Value> {
    if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        body.get("data").cloned().filter(|d| !d.is_null())
    } else {
        None
    }
}

async fn read_json(operation: Operation, response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| ApiError::Request { operation, source })?;

    if text.trim().is_empty() {
        return Ok(json!({ "success": status.is_success() }));
    }
    serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse {
        operation,
        message: e.to_string(),
    })
}

async fn status_error(operation: Operation, response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::Status { operation, status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_data() {
        assert_eq!(
            success_data(json!({"success": true, "data": {"certificate_id": "A"}})),
            Some(json!({"certificate_id": "A"}))
        );
        assert_eq!(success_data(json!({"success": false, "data": {"x": 1}})), None);
        assert_eq!(success_data(json!({"success": true, "data": null})), None);
    }

    #[test]
    fn test_disabled_client_builds_without_url() {
        let api = CertificateApi::new(ApiConfig::default()).unwrap();
        assert!(!api.is_enabled());
        assert!(matches!(api.url(&[]), Err(ApiError::Disabled)));
    }

    #[tokio::test]
    async fn test_disabled_client_ping_passes() {
        let api = CertificateApi::new(ApiConfig::default()).unwrap();
        assert!(api.ping().await);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig {
            api_enabled: true,
            api_base_url: "not a url".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(CertificateApi::new(config), Err(ApiError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_query_pairs_are_encoded() {
        let config = ApiConfig {
            api_enabled: true,
            api_base_url: "https://registry.example.com/api.php".into(),
            ..ApiConfig::default()
        };
        let api = CertificateApi::new(config).unwrap();
        let url = api.url(&[("search", "Jane Doe"), ("limit", "1")]).unwrap();
        assert_eq!(url.as_str(), "https://registry.example.com/api.php?search=Jane+Doe&limit=1");
    }

    #[tokio::test]
    async fn test_create_when_disabled_is_skipped() {
        let api = CertificateApi::new(ApiConfig::default()).unwrap();
        let record = CertificateRecord::with_id("ABC", "Jane", "Cloud", None, 2);
        let result = api.create(&record).await.unwrap();
        assert_eq!(result["skipped"], true);
        assert_eq!(result["success"], true);
    }
}
