use thiserror::Error;

/// Reasons a listener registration was not stored.
///
/// Only [`EventSource::try_register`](crate::EventSource::try_register)
/// returns these; every other operation treats them as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Event type must not be empty")]
    EmptyEventType,

    #[error("Listener already registered for event type: {event_type}")]
    AlreadyRegistered { event_type: String },
}

impl EventError {
    /// Create an already registered error.
    pub fn already_registered(event_type: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            event_type: event_type.into(),
        }
    }

    /// Whether this error describes a malformed call rather than a repeat.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::EmptyEventType)
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
