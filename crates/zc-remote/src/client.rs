//! Authenticated service-to-service HTTP calls.

use std::sync::Arc;

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use zc_auth::ServiceTokenIssuer;
use zc_common::{DEFAULT_AUTH_HEADER_PREFIX, JSON_API_CONTENT_TYPE};
use zc_config::{AppConfig, HttpClientConfig};

use crate::error::{RemoteError, Result, ServiceRequestError};

/// Verbs a service may use against another service.
pub const SUPPORTED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::PATCH];

/// Build the shared reqwest client with the configured timeouts.
pub fn build_http_client(config: &HttpClientConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .user_agent(&config.user_agent)
        .build()?;
    Ok(client)
}

/// A fully-read response from another service.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub method: Method,
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ServiceResponse {
    /// Read the whole response, failing with [`ServiceRequestError`] when
    /// the status is in [400, 600).
    pub async fn read(method: Method, response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if (400..600).contains(&status.as_u16()) {
            let error = ServiceRequestError {
                method,
                status,
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                url,
                body,
            };
            warn!(status = error.status_code(), url = %error.url, "Service request failed");
            return Err(error.into());
        }

        Ok(Self {
            method,
            url,
            status,
            headers,
            body,
        })
    }

    pub fn reason(&self) -> &str {
        self.status.canonical_reason().unwrap_or_default()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Makes token-authenticated requests on behalf of a named service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    issuer: Arc<ServiceTokenIssuer>,
    header_prefix: String,
}

impl ServiceClient {
    pub fn new(http: reqwest::Client, issuer: Arc<ServiceTokenIssuer>) -> Self {
        Self {
            http,
            issuer,
            header_prefix: DEFAULT_AUTH_HEADER_PREFIX.to_string(),
        }
    }

    pub fn with_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.header_prefix = prefix.into();
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = build_http_client(&config.http)?;
        let issuer = ServiceTokenIssuer::from_config(&config.jwt)?;
        Ok(Self::new(http, Arc::new(issuer)).with_header_prefix(&config.jwt.auth_header_prefix))
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Call `endpoint` as `service_name`.
    ///
    /// The body, when given, is sent as the JSON:API payload. Transport
    /// failures surface as [`RemoteError::Http`]; nothing is retried.
    pub async fn request(
        &self,
        service_name: &str,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<ServiceResponse> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(RemoteError::UnsupportedMethod {
                method,
                service_name: service_name.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        let token = self.issuer.issue(service_name)?;

        let mut request = self
            .http
            .request(method.clone(), endpoint)
            .header(AUTHORIZATION, format!("{} {}", self.header_prefix, token))
            .header(CONTENT_TYPE, JSON_API_CONTENT_TYPE);

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        debug!(service = %service_name, %method, %endpoint, "Sending service request");
        let response = request.send().await?;
        ServiceResponse::read(method, response).await
    }

    pub async fn get(&self, service_name: &str, endpoint: &str) -> Result<ServiceResponse> {
        self.request(service_name, endpoint, Method::GET, None).await
    }

    pub async fn post(&self, service_name: &str, endpoint: &str, body: &Value) -> Result<ServiceResponse> {
        self.request(service_name, endpoint, Method::POST, Some(body)).await
    }
}
