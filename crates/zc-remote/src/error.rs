use reqwest::{Method, StatusCode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RemoteError>;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// No gateway route fits the resource type and parameter shape
    #[error("{0}")]
    RouteNotFound(String),

    /// More than one gateway route fits the same call
    #[error("Ambiguous route for resource_type \"{resource_type}\": {}", templates.join(", "))]
    AmbiguousRoute {
        resource_type: String,
        templates: Vec<String>,
    },

    #[error("Invalid URL template {template}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Malformed route table: {0}")]
    MalformedRouteTable(String),

    #[error("Method {method} is not supported. service_name: {service_name}, endpoint: {endpoint}")]
    UnsupportedMethod {
        method: Method,
        service_name: String,
        endpoint: String,
    },

    #[error(transparent)]
    ServiceRequest(#[from] ServiceRequestError),

    /// The call succeeded but the body has no `data` envelope
    #[error("Error retrieving resource. Url: {url}. Content: {content}")]
    RemoteResource { url: String, content: String },

    #[error("Malformed JSON:API document: {0}")]
    MalformedDocument(String),

    #[error("Invalid remote reference: {0}")]
    InvalidReference(String),

    #[error("Token error: {0}")]
    Token(#[from] zc_auth::AuthError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    /// The failed response, when the remote endpoint answered with 4xx/5xx.
    pub fn service_request(&self) -> Option<&ServiceRequestError> {
        match self {
            Self::ServiceRequest(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure happened on the wire or at the remote endpoint,
    /// as opposed to a local routing or parsing problem.
    pub fn is_request_failure(&self) -> bool {
        matches!(self, Self::ServiceRequest(_) | Self::Http(_))
    }
}

/// A remote endpoint answered with a status in [400, 600).
#[derive(Error, Debug, Clone)]
#[error("{} Error: {reason} for {method} {url}. Content: {body}", status.as_u16())]
pub struct ServiceRequestError {
    pub method: Method,
    pub status: StatusCode,
    pub reason: String,
    pub url: String,
    pub body: String,
}

impl ServiceRequestError {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}
