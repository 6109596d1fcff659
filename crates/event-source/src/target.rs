use crate::listener::{ListenerRef, Receiver};
use crate::notification::Notification;
use crate::source::EventSource;

/// Gives any type that owns an [`EventSource`] the listener operations.
///
/// Implement [`event_source`](EventTarget::event_source); the rest forwards
/// to it.
///
/// ```
/// use event_source::{EventSource, EventTarget, ListenerRef, Notification};
///
/// struct Document {
///     events: EventSource,
/// }
///
/// impl EventTarget for Document {
///     fn event_source(&self) -> &EventSource {
///         &self.events
///     }
/// }
///
/// let doc = Document { events: EventSource::new() };
/// doc.add_listener("load", &ListenerRef::from_fn(|n| n.prevent_default()), None);
/// assert!(doc.dispatch_event(&mut Notification::new("load")));
/// ```
pub trait EventTarget {
    fn event_source(&self) -> &EventSource;

    fn add_listener(&self, event_type: &str, listener: &ListenerRef, receiver: Option<&Receiver>) {
        self.event_source().register(event_type, listener, receiver);
    }

    fn remove_listener(
        &self,
        event_type: Option<&str>,
        listener: Option<&ListenerRef>,
        receiver: Option<&Receiver>,
    ) {
        self.event_source().unregister(event_type, listener, receiver);
    }

    fn dispatch_event(&self, notification: &mut Notification) -> bool {
        self.event_source().dispatch(notification)
    }
}

impl EventTarget for EventSource {
    fn event_source(&self) -> &EventSource {
        self
    }
}
