//! Cross-service resource resolution for ZeroCater services.
//!
//! A service finds where another service's resource lives by asking the
//! gateway's route table ([`RouteResolver`]), calls it with a signed
//! service token ([`ServiceClient`]) and turns the JSON:API response into
//! navigable [`ResourceWrapper`]s, resolving relationships against the
//! compound document's `included` array. [`RemoteResources`] strings the
//! three together.
//!
//! ```ignore
//! let remote = RemoteResources::from_config(&config)?;
//! let user = remote
//!     .get_resource("orders", "User", &PathParams::id(42), Some("company"), None)
//!     .await?;
//! let company = user.as_single().and_then(|u| u.one("company"));
//! ```

pub mod client;
pub mod document;
pub mod error;
pub mod facade;
pub mod routes;
pub mod template;

pub use client::{build_http_client, ServiceClient, ServiceResponse, SUPPORTED_METHODS};
pub use document::{wrap, FieldValue, Links, ResourceWrapper, ToMany, ToOne, Wrapped};
pub use error::{RemoteError, Result, ServiceRequestError};
pub use facade::{wrap_response, RemoteResources};
pub use routes::{
    GatewayRouteSource, ParamValue, PathParams, Route, RouteDescriptor, RouteResolver, RouteSource,
    RouteTable, StaticRouteSource,
};
pub use template::UriTemplate;

pub use reqwest::Method;
