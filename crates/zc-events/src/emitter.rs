use std::sync::Arc;

use tracing::{debug, warn};
use zc_remote::{PathParams, RemoteResources, RouteResolver, ServiceClient, ServiceResponse};

use crate::error::{EmitEventFailure, Result};
use crate::event::ServiceEvent;

/// Posts [`ServiceEvent`]s to the service that owns the target event type.
#[derive(Clone)]
pub struct EventEmitter {
    resolver: Arc<RouteResolver>,
    client: Arc<ServiceClient>,
}

impl EventEmitter {
    pub fn new(resolver: Arc<RouteResolver>, client: Arc<ServiceClient>) -> Self {
        Self { resolver, client }
    }

    /// Share the resolver and client of an existing facade.
    pub fn from_remote(remote: &RemoteResources) -> Self {
        Self::new(remote.resolver().clone(), remote.client().clone())
    }

    /// Emit `event` as `sender` and hand back the raw response.
    ///
    /// Failures propagate unchanged. Prefer
    /// [`emit_service_event`](Self::emit_service_event), whose errors carry
    /// the event details.
    #[deprecated(note = "use emit_service_event, which attaches event context to failures")]
    pub async fn emit_event(
        &self,
        sender: &str,
        target_event_type: &str,
        event: &ServiceEvent,
    ) -> zc_remote::Result<ServiceResponse> {
        self.send(sender, target_event_type, event).await
    }

    /// Emit `event` as `sender`.
    ///
    /// A failed request (transport error or 4xx/5xx answer) becomes
    /// [`EmitEventFailure`]. Route resolution and signing errors pass
    /// through as [`EmitError::Remote`](crate::EmitError::Remote).
    pub async fn emit_service_event(
        &self,
        sender: &str,
        target_event_type: &str,
        event: &ServiceEvent,
    ) -> Result<ServiceResponse> {
        match self.send(sender, target_event_type, event).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_request_failure() => {
                let failure = EmitEventFailure::new(target_event_type, event, e);
                warn!(error = %failure, "Event emission failed");
                Err(failure.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send(
        &self,
        sender: &str,
        target_event_type: &str,
        event: &ServiceEvent,
    ) -> zc_remote::Result<ServiceResponse> {
        let url = self
            .resolver
            .resolve(target_event_type, &PathParams::new(), &[])
            .await?;
        let payload = event.to_payload(target_event_type);

        debug!(
            sender = %sender,
            event = %event.event_type,
            target = %target_event_type,
            %url,
            "Emitting event"
        );
        self.client.post(sender, &url, &payload).await
    }
}
