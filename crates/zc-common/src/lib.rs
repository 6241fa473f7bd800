use serde::{Deserialize, Serialize};

pub mod logging;

// ============================================================================
// JSON:API conventions
// ============================================================================

/// Media type every inter-service request is sent with.
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Scheme prefix used in the `Authorization` header for signed tokens.
pub const DEFAULT_AUTH_HEADER_PREFIX: &str = "JWT";

// ============================================================================
// Remote references
// ============================================================================

/// A pointer to a resource owned by another service.
///
/// This is what a remote foreign key stores locally: the resource type and
/// its primary key, both kept as strings. Either part may be absent when the
/// reference is unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteResource {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub id: Option<String>,
}

impl RemoteResource {
    pub fn new(resource_type: impl Into<String>, id: impl ToString) -> Self {
        let resource_type = resource_type.into();
        let id = id.to_string();
        Self {
            resource_type: (!resource_type.is_empty()).then_some(resource_type),
            id: (!id.is_empty()).then_some(id),
        }
    }

    /// A reference with neither a type nor an id.
    pub fn empty() -> Self {
        Self {
            resource_type: None,
            id: None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.resource_type.is_some() && self.id.is_some()
    }
}
