use serde::Serialize;
use serde_json::{json, Map, Value};

/// What happened, to which resource, on whose behalf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEvent {
    /// Event name, e.g. `order_confirmed`
    pub event_type: String,
    pub resource_type: String,
    /// Sent as given, so numeric ids stay JSON numbers
    pub resource_id: Option<Value>,
    pub user_id: Option<Value>,
    #[serde(skip)]
    pub meta: Option<Map<String, Value>>,
}

impl ServiceEvent {
    pub fn new(event_type: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            user_id: None,
            meta: None,
        }
    }

    pub fn resource_id(mut self, id: impl Into<Value>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn user_id(mut self, id: impl Into<Value>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// The creation document sent to the `target` event resource.
    pub fn to_payload(&self, target: &str) -> Value {
        let mut payload = json!({
            "data": {
                "type": target,
                "attributes": self,
            }
        });

        let meta = self.meta.as_ref().filter(|meta| !meta.is_empty());
        if let (Some(meta), Some(document)) = (meta, payload.as_object_mut()) {
            document.insert("meta".to_string(), Value::Object(meta.clone()));
        }

        payload
    }
}
