//! JSON:API document wrapping.
//!
//! A [`ResourceWrapper`] is a read-only snapshot of one resource object:
//! `id`, `type`, and one field per attribute or relationship, keyed by the
//! snake_case form of the JSON:API member name. Relationship references are
//! replaced by their full representation from the compound document's
//! `included` array whenever it has one, otherwise they stay as
//! `{type, id}` stubs.

use std::collections::HashMap;
use std::sync::Arc;

use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RemoteError, Result};

/// Deepest chain of nested relationships that will be expanded.
pub const MAX_RELATIONSHIP_DEPTH: usize = 64;

/// `self` and `related` links of a relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub self_link: Option<String>,
    pub related: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToOne {
    /// `None` when the relationship's `data` is null or absent
    pub resource: Option<Arc<ResourceWrapper>>,
    pub links: Option<Links>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToMany {
    pub resources: Vec<Arc<ResourceWrapper>>,
    pub links: Option<Links>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Attribute(Value),
    ToOne(ToOne),
    ToMany(ToMany),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceWrapper {
    id: String,
    resource_type: String,
    fields: IndexMap<String, FieldValue>,
}

impl ResourceWrapper {
    /// Wrap a single resource object, resolving relationships against
    /// `included` when given.
    pub fn from_document(document: &Value, included: Option<&[Value]>) -> Result<Self> {
        let index = included.map(IncludedIndex::build).transpose()?;
        Wrapper::new(index.as_ref()).wrap(document)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// True when the wrapper only knows `{type, id}`.
    pub fn is_stub(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(FieldValue::Attribute(value)) => Some(value),
            _ => None,
        }
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn to_one(&self, name: &str) -> Option<&ToOne> {
        match self.fields.get(name) {
            Some(FieldValue::ToOne(rel)) => Some(rel),
            _ => None,
        }
    }

    pub fn to_many(&self, name: &str) -> Option<&ToMany> {
        match self.fields.get(name) {
            Some(FieldValue::ToMany(rel)) => Some(rel),
            _ => None,
        }
    }

    /// The related resource of a to-one relationship.
    pub fn one(&self, name: &str) -> Option<&ResourceWrapper> {
        self.to_one(name).and_then(|rel| rel.resource.as_deref())
    }

    /// The related resources of a to-many relationship.
    pub fn many(&self, name: &str) -> Option<&[Arc<ResourceWrapper>]> {
        self.to_many(name).map(|rel| rel.resources.as_slice())
    }

    /// Links of a relationship, whichever its cardinality.
    pub fn links(&self, name: &str) -> Option<&Links> {
        match self.fields.get(name) {
            Some(FieldValue::ToOne(rel)) => rel.links.as_ref(),
            Some(FieldValue::ToMany(rel)) => rel.links.as_ref(),
            _ => None,
        }
    }

    /// Flat JSON view: `id`, `type`, then every field, relationships nested.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        out.insert("type".to_string(), Value::String(self.resource_type.clone()));

        for (name, field) in &self.fields {
            let value = match field {
                FieldValue::Attribute(value) => value.clone(),
                FieldValue::ToOne(rel) => rel
                    .resource
                    .as_ref()
                    .map_or(Value::Null, |resource| resource.to_value()),
                FieldValue::ToMany(rel) => {
                    Value::Array(rel.resources.iter().map(|resource| resource.to_value()).collect())
                }
            };
            out.insert(name.clone(), value);
        }

        Value::Object(out)
    }
}

/// Primary data of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Wrapped {
    Single(ResourceWrapper),
    Collection(Vec<ResourceWrapper>),
    /// `data` was null
    Empty,
}

impl Wrapped {
    pub fn as_single(&self) -> Option<&ResourceWrapper> {
        match self {
            Self::Single(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[ResourceWrapper]> {
        match self {
            Self::Collection(resources) => Some(resources),
            _ => None,
        }
    }

    pub fn into_vec(self) -> Vec<ResourceWrapper> {
        match self {
            Self::Single(resource) => vec![resource],
            Self::Collection(resources) => resources,
            Self::Empty => Vec::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Single(resource) => resource.to_value(),
            Self::Collection(resources) => {
                Value::Array(resources.iter().map(ResourceWrapper::to_value).collect())
            }
            Self::Empty => Value::Null,
        }
    }
}

/// Wrap primary data, a single resource object, an array of them, or null.
pub fn wrap(data: &Value, included: Option<&[Value]>) -> Result<Wrapped> {
    let index = included.map(IncludedIndex::build).transpose()?;
    let mut wrapper = Wrapper::new(index.as_ref());

    match data {
        Value::Null => Ok(Wrapped::Empty),
        Value::Array(items) => items
            .iter()
            .map(|item| wrapper.wrap(item))
            .collect::<Result<Vec<_>>>()
            .map(Wrapped::Collection),
        _ => wrapper.wrap(data).map(Wrapped::Single),
    }
}

// ============================================================================
// Side-table and recursion
// ============================================================================

type ResourceKey = (String, String);

/// `included` resources keyed by `(type, id)`. The first entry wins.
struct IncludedIndex<'a> {
    by_key: HashMap<ResourceKey, &'a Value>,
}

impl<'a> IncludedIndex<'a> {
    fn build(included: &'a [Value]) -> Result<Self> {
        let mut by_key = HashMap::with_capacity(included.len());
        for (position, resource) in included.iter().enumerate() {
            let object = resource.as_object().ok_or_else(|| {
                RemoteError::malformed(format!("included[{}] is not an object", position))
            })?;
            let key = identity(object, &format!("included[{}]", position))?;
            by_key.entry(key).or_insert(resource);
        }
        Ok(Self { by_key })
    }

    fn get(&self, key: &ResourceKey) -> Option<&'a Value> {
        self.by_key.get(key).copied()
    }
}

/// One wrapping pass over a document.
///
/// Resources pulled from `included` are built once per pass and shared, so
/// a resource referenced from many places costs one expansion.
struct Wrapper<'i, 'a> {
    included: Option<&'i IncludedIndex<'a>>,
    /// Resources being expanded on the current recursion path
    path: Vec<ResourceKey>,
    resolved: HashMap<ResourceKey, Arc<ResourceWrapper>>,
}

impl<'i, 'a> Wrapper<'i, 'a> {
    fn new(included: Option<&'i IncludedIndex<'a>>) -> Self {
        Self {
            included,
            path: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    /// Wrap a primary resource object.
    fn wrap(&mut self, document: &Value) -> Result<ResourceWrapper> {
        let (key, object) = resource_object(document)?;
        let object = if is_stub(object) {
            self.lookup(&key).unwrap_or(object)
        } else {
            object
        };
        self.expand(key, object)
    }

    /// Wrap the target of a relationship.
    fn related(&mut self, document: &Value) -> Result<Arc<ResourceWrapper>> {
        let (key, object) = resource_object(document)?;

        // A cycle back to a resource already being expanded stays a stub
        if self.path.contains(&key) {
            return Ok(Arc::new(stub(key)));
        }

        if !is_stub(object) {
            return self.expand(key, object).map(Arc::new);
        }

        if let Some(resource) = self.resolved.get(&key) {
            return Ok(resource.clone());
        }

        match self.lookup(&key) {
            Some(full) => {
                let resource = Arc::new(self.expand(key.clone(), full)?);
                self.resolved.insert(key, resource.clone());
                Ok(resource)
            }
            None => Ok(Arc::new(stub(key))),
        }
    }

    fn lookup(&self, key: &ResourceKey) -> Option<&'a Map<String, Value>> {
        self.included
            .and_then(|index| index.get(key))
            .and_then(Value::as_object)
    }

    fn expand(&mut self, key: ResourceKey, object: &Map<String, Value>) -> Result<ResourceWrapper> {
        if self.path.len() >= MAX_RELATIONSHIP_DEPTH {
            return Err(RemoteError::malformed(format!(
                "relationships of {}:{} nest deeper than {} levels",
                key.0, key.1, MAX_RELATIONSHIP_DEPTH
            )));
        }

        self.path.push(key.clone());
        let result = self.build(key, object);
        self.path.pop();
        result
    }

    fn build(&mut self, key: ResourceKey, object: &Map<String, Value>) -> Result<ResourceWrapper> {
        let (resource_type, id) = key;
        let mut fields = IndexMap::new();

        if let Some(attributes) = object.get("attributes") {
            let attributes = attributes.as_object().ok_or_else(|| {
                RemoteError::malformed(format!("attributes of {}:{} is not an object", resource_type, id))
            })?;
            for (name, value) in attributes {
                insert_field(&mut fields, name, FieldValue::Attribute(value.clone()));
            }
        }

        if let Some(relationships) = object.get("relationships") {
            let relationships = relationships.as_object().ok_or_else(|| {
                RemoteError::malformed(format!(
                    "relationships of {}:{} is not an object",
                    resource_type, id
                ))
            })?;
            for (name, relationship) in relationships {
                let field = self.relationship(name, relationship)?;
                insert_field(&mut fields, name, field);
            }
        }

        Ok(ResourceWrapper {
            id,
            resource_type,
            fields,
        })
    }

    fn relationship(&mut self, name: &str, relationship: &Value) -> Result<FieldValue> {
        let object = relationship.as_object().ok_or_else(|| {
            RemoteError::malformed(format!("relationship {} is not an object", name))
        })?;

        let links = object
            .get("links")
            .map(|links| parse_links(name, links))
            .transpose()?;

        match object.get("data") {
            Some(Value::Array(items)) => {
                let resources = items
                    .iter()
                    .map(|item| self.related(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(FieldValue::ToMany(ToMany { resources, links }))
            }
            Some(Value::Null) | None => Ok(FieldValue::ToOne(ToOne {
                resource: None,
                links,
            })),
            Some(data @ Value::Object(_)) => Ok(FieldValue::ToOne(ToOne {
                resource: Some(self.related(data)?),
                links,
            })),
            Some(other) => Err(RemoteError::malformed(format!(
                "relationship {} has invalid data {}",
                name, other
            ))),
        }
    }
}

/// Fields are keyed by the snake_case member name. When two members map to
/// the same key the later one wins, so relationships shadow attributes.
fn insert_field(fields: &mut IndexMap<String, FieldValue>, name: &str, value: FieldValue) {
    let key = name.to_snake_case();
    if fields.insert(key.clone(), value).is_some() {
        debug!(member = %name, field = %key, "Member replaces an earlier field of the same name");
    }
}

fn resource_object(document: &Value) -> Result<(ResourceKey, &Map<String, Value>)> {
    let object = document.as_object().ok_or_else(|| {
        RemoteError::malformed(format!("resource object must be a JSON object, got {}", document))
    })?;
    let key = identity(object, "resource object")?;
    Ok((key, object))
}

fn stub((resource_type, id): ResourceKey) -> ResourceWrapper {
    ResourceWrapper {
        id,
        resource_type,
        fields: IndexMap::new(),
    }
}

/// A bare `{type, id}` reference, as opposed to a full resource object.
fn is_stub(object: &Map<String, Value>) -> bool {
    !object.contains_key("attributes") && !object.contains_key("relationships")
}

fn identity(object: &Map<String, Value>, context: &str) -> Result<ResourceKey> {
    let resource_type = match object.get("type") {
        Some(Value::String(t)) if !t.is_empty() => t.clone(),
        _ => {
            return Err(RemoteError::malformed(format!(
                "{} is missing a string \"type\"",
                context
            )))
        }
    };

    let id = match object.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(RemoteError::malformed(format!(
                "{} of type {} is missing \"id\"",
                context, resource_type
            )))
        }
    };

    Ok((resource_type, id))
}

fn parse_links(name: &str, links: &Value) -> Result<Links> {
    let object = links.as_object().ok_or_else(|| {
        RemoteError::malformed(format!("links of relationship {} is not an object", name))
    })?;

    // A link is either a URL string or a link object with an `href`
    let link = |key: &str| -> Option<String> {
        match object.get(key)? {
            Value::String(url) => Some(url.clone()),
            Value::Object(link) => link.get("href").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    };

    Ok(Links {
        self_link: link("self"),
        related: link("related"),
    })
}
