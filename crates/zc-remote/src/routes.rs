//! Route resolution against the gateway route table.
//!
//! The gateway publishes a JSON object mapping URL templates to
//! `{domain, resource_type}`. Resolving a resource type means finding the
//! one template whose placeholders match the supplied parameters exactly,
//! expanding it, and prefixing the owning service's domain.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::ServiceResponse;
use crate::error::{RemoteError, Result};
use crate::template::UriTemplate;

// ============================================================================
// Parameters
// ============================================================================

/// A path parameter: a single key, or a collection of keys that turns into
/// a `filter[<name>__in]=a,b,c` query instead of a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Scalar(value.clone())
    }
}

macro_rules! scalar_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ParamValue {
            fn from(value: $t) -> Self {
                Self::Scalar(value.to_string())
            }
        })*
    };
}

scalar_from_int!(i32, i64, u32, u64, usize);

impl<T: ToString> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString> From<&[T]> for ParamValue {
    fn from(values: &[T]) -> Self {
        Self::List(values.iter().map(ToString::to_string).collect())
    }
}

/// Named path parameters, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(IndexMap<String, ParamValue>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common `{id}` lookup.
    pub fn id(value: impl Into<ParamValue>) -> Self {
        Self::new().with("id", value)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> BTreeSet<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    fn scalar(&self, name: &str) -> Option<String> {
        match self.0.get(name) {
            Some(ParamValue::Scalar(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn lists(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().filter_map(|(name, value)| match value {
            ParamValue::List(values) => Some((name.as_str(), values.as_slice())),
            ParamValue::Scalar(_) => None,
        })
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

// ============================================================================
// Route table
// ============================================================================

/// Where a template lives and which resource type it serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteDescriptor {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub template: UriTemplate,
    pub descriptor: RouteDescriptor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table from the gateway's JSON object. Entries that are not
    /// route descriptors, or whose template does not parse, are skipped.
    pub fn from_value(value: Value) -> Result<Self> {
        let entries: IndexMap<String, Value> = match value {
            Value::Object(map) => map.into_iter().collect(),
            other => {
                return Err(RemoteError::MalformedRouteTable(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut routes = Vec::with_capacity(entries.len());
        for (template, entry) in entries {
            let descriptor = match serde_json::from_value::<RouteDescriptor>(entry) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    debug!(%template, error = %e, "Skipping non-route gateway entry");
                    continue;
                }
            };
            match UriTemplate::parse(&template) {
                Ok(template) => routes.push(Route {
                    template,
                    descriptor,
                }),
                Err(e) => warn!(error = %e, "Skipping gateway route with invalid template"),
            }
        }

        Ok(Self { routes })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a fully-qualified URL for `resource_type`.
    ///
    /// Exactly one route of that type may have a placeholder set equal to
    /// the names in `params`; zero is [`RemoteError::RouteNotFound`] and
    /// more than one is [`RemoteError::AmbiguousRoute`]. List-valued
    /// parameters become `filter[<name>__in]` queries, then `query` pairs
    /// are appended in order.
    pub fn resolve(
        &self,
        resource_type: &str,
        params: &PathParams,
        query: &[(String, String)],
    ) -> Result<String> {
        let candidates: Vec<&Route> = self
            .routes
            .iter()
            .filter(|route| route.descriptor.resource_type.as_deref() == Some(resource_type))
            .collect();

        if candidates.is_empty() {
            return Err(RemoteError::RouteNotFound(format!(
                "No route for resource_type: \"{}\"",
                resource_type
            )));
        }

        let names = params.names();
        let matching: Vec<&Route> = candidates
            .into_iter()
            .filter(|route| route.template.variables() == names)
            .collect();

        let route = match matching.as_slice() {
            [route] => *route,
            [] => {
                return Err(RemoteError::RouteNotFound(format!(
                    "No route for resource_type: \"{}\" accepts parameters [{}]",
                    resource_type,
                    names.into_iter().collect::<Vec<_>>().join(", ")
                )))
            }
            many => {
                return Err(RemoteError::AmbiguousRoute {
                    resource_type: resource_type.to_string(),
                    templates: many.iter().map(|r| r.template.to_string()).collect(),
                })
            }
        };

        let mut url = format!(
            "{}{}",
            route.descriptor.domain,
            route.template.expand(|name| params.scalar(name))
        );

        let extras: Vec<String> = params
            .lists()
            .map(|(name, values)| {
                let joined = values
                    .iter()
                    .map(|v| urlencoding::encode(v).into_owned())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("filter[{}__in]={}", name, joined)
            })
            .chain(
                query
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value))),
            )
            .collect();

        if !extras.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&extras.join("&"));
        }

        Ok(url)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Route sources
// ============================================================================

/// Where route tables come from.
#[async_trait]
pub trait RouteSource: Send + Sync {
    async fn fetch_routes(&self) -> Result<RouteTable>;
}

/// Fetches the route table from the gateway with an unauthenticated GET.
pub struct GatewayRouteSource {
    http: reqwest::Client,
    root_path: String,
}

impl GatewayRouteSource {
    pub fn new(http: reqwest::Client, root_path: impl Into<String>) -> Self {
        Self {
            http,
            root_path: root_path.into(),
        }
    }
}

#[async_trait]
impl RouteSource for GatewayRouteSource {
    async fn fetch_routes(&self) -> Result<RouteTable> {
        debug!(gateway = %self.root_path, "Fetching route table");

        let response = self.http.get(&self.root_path).send().await?;
        let response = ServiceResponse::read(Method::GET, response).await?;
        let table = RouteTable::from_json(&response.body)?;

        debug!(routes = table.len(), "Fetched route table");
        Ok(table)
    }
}

/// A fixed route table, for services whose routes are provisioned locally.
pub struct StaticRouteSource {
    table: RouteTable,
}

impl StaticRouteSource {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl RouteSource for StaticRouteSource {
    async fn fetch_routes(&self) -> Result<RouteTable> {
        Ok(self.table.clone())
    }
}

// ============================================================================
// Resolver
// ============================================================================

struct CachedTable {
    table: Arc<RouteTable>,
    fetched_at: Instant,
}

/// Resolves resource types to URLs, fetching the route table from its
/// source on every call unless a cache TTL is set.
pub struct RouteResolver {
    source: Arc<dyn RouteSource>,
    cache_ttl: Option<Duration>,
    cached: RwLock<Option<CachedTable>>,
}

impl RouteResolver {
    pub fn new(source: Arc<dyn RouteSource>) -> Self {
        Self {
            source,
            cache_ttl: None,
            cached: RwLock::new(None),
        }
    }

    pub fn gateway(http: reqwest::Client, root_path: impl Into<String>) -> Self {
        Self::new(Arc::new(GatewayRouteSource::new(http, root_path)))
    }

    /// Reuse a fetched table for `ttl`. `None` fetches on every call.
    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    pub async fn route_table(&self) -> Result<Arc<RouteTable>> {
        let Some(ttl) = self.cache_ttl else {
            return Ok(Arc::new(self.source.fetch_routes().await?));
        };

        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < ttl {
                    return Ok(entry.table.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(entry) = cached.as_ref() {
            if entry.fetched_at.elapsed() < ttl {
                return Ok(entry.table.clone());
            }
        }

        let table = Arc::new(self.source.fetch_routes().await?);
        *cached = Some(CachedTable {
            table: table.clone(),
            fetched_at: Instant::now(),
        });
        Ok(table)
    }

    /// Drop the cached table so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    pub async fn resolve(
        &self,
        resource_type: &str,
        params: &PathParams,
        query: &[(String, String)],
    ) -> Result<String> {
        let table = self.route_table().await?;
        let url = table.resolve(resource_type, params, query)?;
        debug!(%resource_type, %url, "Resolved route");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn table() -> RouteTable {
        RouteTable::from_value(json!({
            "/users{/id}": {"domain": "http://users", "resource_type": "User"},
            "/orders{/id}": {"domain": "http://orders", "resource_type": "Order"},
            "/companies/{company_id}/orders{/id}": {"domain": "http://orders", "resource_type": "CompanyOrder"},
            "/health": {"domain": "http://gateway"},
            "version": "1.2.0"
        }))
        .unwrap()
    }

    #[test]
    fn test_skips_non_route_entries() {
        assert_eq!(table().len(), 4);
    }

    #[test]
    fn test_resolve_scalar_id() {
        let url = table().resolve("User", &PathParams::id(1), &[]).unwrap();
        assert_eq!(url, "http://users/users/1");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let table = table();
        let params = PathParams::id("abc");
        let first = table.resolve("Order", &params, &[]).unwrap();
        let second = table.resolve("Order", &params, &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_collection_id_becomes_filter() {
        let url = table().resolve("User", &PathParams::id(vec![1, 2, 3]), &[]).unwrap();
        assert_eq!(url, "http://users/users?filter[id__in]=1,2,3");
        assert!(url.ends_with("?filter[id__in]=1,2,3"));
    }

    #[test]
    fn test_resolve_appends_query_params() {
        let query = vec![
            ("include".to_string(), "author,comments".to_string()),
            ("page_size".to_string(), "50".to_string()),
        ];
        let url = table().resolve("User", &PathParams::id(5), &query).unwrap();
        assert_eq!(url, "http://users/users/5?include=author%2Ccomments&page_size=50");

        let url = table().resolve("User", &PathParams::id(vec![5, 6]), &query).unwrap();
        assert_eq!(
            url,
            "http://users/users?filter[id__in]=5,6&include=author%2Ccomments&page_size=50"
        );
    }

    #[test]
    fn test_resolve_multiple_path_params() {
        let params = PathParams::new().with("company_id", 12).with("id", 4);
        let url = table().resolve("CompanyOrder", &params, &[]).unwrap();
        assert_eq!(url, "http://orders/companies/12/orders/4");
    }

    #[test]
    fn test_unknown_type_is_route_not_found() {
        let err = table().resolve("Movie", &PathParams::id(1), &[]).unwrap_err();
        assert!(matches!(err, RemoteError::RouteNotFound(ref msg) if msg.contains("Movie")));
    }

    #[test]
    fn test_param_shape_mismatch_is_route_not_found() {
        let err = table()
            .resolve("User", &PathParams::new().with("slug", "x"), &[])
            .unwrap_err();
        assert!(matches!(err, RemoteError::RouteNotFound(ref msg) if msg.contains("slug")));

        // No parameters at all does not fit `/users{/id}` either
        assert!(table().resolve("User", &PathParams::new(), &[]).is_err());
    }

    #[test]
    fn test_same_shape_twice_is_ambiguous() {
        let table = RouteTable::from_value(json!({
            "/users{/id}": {"domain": "http://users", "resource_type": "User"},
            "/people{/id}": {"domain": "http://people", "resource_type": "User"}
        }))
        .unwrap();

        let err = table.resolve("User", &PathParams::id(1), &[]).unwrap_err();
        match err {
            RemoteError::AmbiguousRoute { resource_type, templates } => {
                assert_eq!(resource_type, "User");
                assert_eq!(templates.len(), 2);
            }
            other => panic!("expected AmbiguousRoute, got {other:?}"),
        }
    }

    #[test]
    fn test_different_shapes_pick_the_matching_one() {
        let table = RouteTable::from_value(json!({
            "/events": {"domain": "http://events", "resource_type": "Event"},
            "/events/{id}": {"domain": "http://events", "resource_type": "Event"}
        }))
        .unwrap();

        assert_eq!(
            table.resolve("Event", &PathParams::new(), &[]).unwrap(),
            "http://events/events"
        );
        assert_eq!(
            table.resolve("Event", &PathParams::id(8), &[]).unwrap(),
            "http://events/events/8"
        );
    }

    #[test]
    fn test_non_object_table_is_malformed() {
        assert!(matches!(
            RouteTable::from_value(json!(["/users"])),
            Err(RemoteError::MalformedRouteTable(_))
        ));
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RouteSource for CountingSource {
        async fn fetch_routes(&self) -> Result<RouteTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(table())
        }
    }

    #[tokio::test]
    async fn test_resolver_fetches_every_call_by_default() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let resolver = RouteResolver::new(source.clone());

        resolver.resolve("User", &PathParams::id(1), &[]).await.unwrap();
        resolver.resolve("User", &PathParams::id(2), &[]).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolver_cache_ttl() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let resolver =
            RouteResolver::new(source.clone()).with_cache_ttl(Some(Duration::from_secs(60)));

        resolver.resolve("User", &PathParams::id(1), &[]).await.unwrap();
        resolver.resolve("Order", &PathParams::id(2), &[]).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        resolver.invalidate().await;
        resolver.resolve("User", &PathParams::id(1), &[]).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_static_source() {
        let resolver = RouteResolver::new(Arc::new(StaticRouteSource::new(table())));
        let url = resolver.resolve("Order", &PathParams::id(3), &[]).await.unwrap();
        assert_eq!(url, "http://orders/orders/3");
    }
}
