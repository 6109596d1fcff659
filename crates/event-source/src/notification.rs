//! Notification value carried through a single dispatch

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::listener::Receiver;

/// Identity of an [`EventSource`](crate::EventSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A notification passed to every listener of one dispatch.
///
/// Both flags only ever go from `false` to `true`. A notification that has
/// been stopped stays stopped, so build a fresh one per dispatch unless that
/// is what you want.
#[derive(Debug, Clone)]
pub struct Notification {
    event_type: String,
    target: Option<SourceId>,
    default_prevented: bool,
    propagation_stopped: bool,
    timestamp: DateTime<Utc>,
    /// Receiver of the registration currently being invoked
    receiver: Option<Receiver>,
}

impl Notification {
    /// Create a notification of the given type with both flags cleared
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            default_prevented: false,
            propagation_stopped: false,
            timestamp: Utc::now(),
            receiver: None,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Source that most recently dispatched this notification
    pub fn target(&self) -> Option<SourceId> {
        self.target
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// When the notification was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Skip every listener after the current one
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Mark the notification as handled; becomes the dispatch result
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Receiver the running listener was registered with.
    ///
    /// Only set while a listener registered with a receiver is executing.
    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver.as_ref()
    }

    /// Receiver of the running listener, downcast to `T`
    pub fn receiver_as<T: Any>(&self) -> Option<Rc<T>> {
        self.receiver.as_ref().and_then(Receiver::downcast::<T>)
    }

    pub(crate) fn set_target(&mut self, target: SourceId) {
        self.target = Some(target);
    }

    /// Swap the bound receiver, returning the previous one so nested
    /// dispatches can restore it.
    pub(crate) fn bind_receiver(&mut self, receiver: Option<Receiver>) -> Option<Receiver> {
        std::mem::replace(&mut self.receiver, receiver)
    }
}
