use serde_json::{Map, Value};
use thiserror::Error;
use zc_remote::RemoteError;

use crate::event::ServiceEvent;

pub type Result<T> = std::result::Result<T, EmitError>;

#[derive(Error, Debug)]
pub enum EmitError {
    /// The event request itself failed
    #[error(transparent)]
    Failure(#[from] EmitEventFailure),

    /// Anything that went wrong before the request, e.g. no route
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl EmitError {
    pub fn failure(&self) -> Option<&EmitEventFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Remote(_) => None,
        }
    }
}

/// An event request failed, with the event's details attached for triage.
#[derive(Error, Debug)]
#[error(
    "Failed to emit event {event_name} to {target}. resource_type: {resource_type}, resource_id: {}, user_id: {}, meta: {}",
    or_none(.resource_id),
    or_none(.user_id),
    meta_text(.meta)
)]
pub struct EmitEventFailure {
    pub event_name: String,
    pub target: String,
    pub resource_type: String,
    pub resource_id: Option<Value>,
    pub user_id: Option<Value>,
    pub meta: Option<Map<String, Value>>,
    #[source]
    pub source: RemoteError,
}

impl EmitEventFailure {
    pub(crate) fn new(target: &str, event: &ServiceEvent, source: RemoteError) -> Self {
        Self {
            event_name: event.event_type.clone(),
            target: target.to_string(),
            resource_type: event.resource_type.clone(),
            resource_id: event.resource_id.clone(),
            user_id: event.user_id.clone(),
            meta: event.meta.clone(),
            source,
        }
    }

    /// The failed response, when the receiving service answered 4xx/5xx.
    pub fn service_request(&self) -> Option<&zc_remote::ServiceRequestError> {
        self.source.service_request()
    }
}

fn or_none(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "None".to_string(),
    }
}

fn meta_text(meta: &Option<Map<String, Value>>) -> String {
    match meta {
        Some(meta) => Value::Object(meta.clone()).to_string(),
        None => "None".to_string(),
    }
}
