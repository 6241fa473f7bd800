//! Fetch resources owned by other services.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use zc_common::RemoteResource;
use zc_config::AppConfig;

use crate::client::{build_http_client, ServiceClient, ServiceResponse};
use crate::document::{wrap, Wrapped};
use crate::error::{RemoteError, Result};
use crate::routes::{PathParams, RouteResolver};

/// Route resolution, authenticated GET and document wrapping in one call.
#[derive(Clone)]
pub struct RemoteResources {
    resolver: Arc<RouteResolver>,
    client: Arc<ServiceClient>,
}

impl RemoteResources {
    pub fn new(resolver: Arc<RouteResolver>, client: Arc<ServiceClient>) -> Self {
        Self { resolver, client }
    }

    /// Gateway resolver and service client sharing one HTTP connection pool.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = build_http_client(&config.http)?;
        let issuer = zc_auth::ServiceTokenIssuer::from_config(&config.jwt)?;

        let resolver = RouteResolver::gateway(http.clone(), &config.gateway.root_path)
            .with_cache_ttl(config.gateway.route_cache_ttl());
        let client = ServiceClient::new(http, Arc::new(issuer))
            .with_header_prefix(&config.jwt.auth_header_prefix);

        Ok(Self::new(Arc::new(resolver), Arc::new(client)))
    }

    pub fn resolver(&self) -> &Arc<RouteResolver> {
        &self.resolver
    }

    pub fn client(&self) -> &Arc<ServiceClient> {
        &self.client
    }

    /// Fetch `resource_type` identified by `params`, as `service_name`.
    ///
    /// `include` and `page_size` are passed through as query parameters.
    pub async fn get_resource(
        &self,
        service_name: &str,
        resource_type: &str,
        params: &PathParams,
        include: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<Wrapped> {
        let mut query = Vec::new();
        if let Some(include) = include {
            query.push(("include".to_string(), include.to_string()));
        }
        if let Some(page_size) = page_size {
            query.push(("page_size".to_string(), page_size.to_string()));
        }

        let url = self.resolver.resolve(resource_type, params, &query).await?;
        self.get_resource_from_url(service_name, &url).await
    }

    /// Fetch whatever `url` points at, as `service_name`.
    pub async fn get_resource_from_url(&self, service_name: &str, url: &str) -> Result<Wrapped> {
        let response = self.client.get(service_name, url).await?;
        wrap_response(&response)
    }

    /// Fetch the resource a stored remote reference points at.
    pub async fn get_reference(
        &self,
        service_name: &str,
        reference: &RemoteResource,
        include: Option<&str>,
    ) -> Result<Wrapped> {
        let (Some(resource_type), Some(id)) = (&reference.resource_type, &reference.id) else {
            return Err(RemoteError::InvalidReference(format!(
                "type: {:?}, id: {:?}",
                reference.resource_type, reference.id
            )));
        };

        self.get_resource(service_name, resource_type, &PathParams::id(id), include, None)
            .await
    }
}

/// Parse a JSON:API response body and wrap its primary data.
pub fn wrap_response(response: &ServiceResponse) -> Result<Wrapped> {
    let missing_data = || RemoteError::RemoteResource {
        url: response.url.clone(),
        content: response.body.clone(),
    };

    let document: Value = serde_json::from_str(&response.body).map_err(|_| missing_data())?;
    let data = document.get("data").ok_or_else(missing_data)?;

    let included = match document.get("included") {
        None | Some(Value::Null) => None,
        Some(Value::Array(included)) => Some(included.as_slice()),
        Some(_) => return Err(RemoteError::malformed("included is not an array")),
    };

    debug!(
        url = %response.url,
        included = included.map_or(0, |items| items.len()),
        "Wrapping remote resource"
    );
    wrap(data, included)
}
