//! Event emission between ZeroCater services.
//!
//! An event is POSTed as a JSON:API resource to whichever service the
//! gateway publishes for the target event type. This is the synchronous
//! HTTP sibling of queue-based publishing: the call returns once the
//! receiving service has answered.

mod emitter;
mod error;
mod event;

pub use emitter::EventEmitter;
pub use error::{EmitError, EmitEventFailure, Result};
pub use event::ServiceEvent;
