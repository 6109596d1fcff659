//! Listener registry and synchronous dispatch

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::config::SourceConfig;
use crate::error::{EventError, Result};
use crate::listener::{ListenerRef, Receiver, Registration};
use crate::notification::{Notification, SourceId};

/// Per-type listener registry with in-order, synchronous dispatch.
///
/// All operations take `&self`, so a listener may register or unregister on
/// the source that is currently dispatching to it. Such changes apply from
/// the next dispatch on; the running dispatch works on a snapshot.
pub struct EventSource {
    id: SourceId,
    config: SourceConfig,
    /// Event type to registrations in dispatch order. A type with no
    /// registrations has no entry.
    listeners: RefCell<HashMap<String, Vec<Registration>>>,
}

impl EventSource {
    /// Create an empty event source with default configuration
    pub fn new() -> Self {
        Self::with_config(SourceConfig::default())
    }

    /// Create an empty event source with the given configuration
    pub fn with_config(config: SourceConfig) -> Self {
        Self {
            id: SourceId::new(),
            config,
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// Identity written into [`Notification::target`] on dispatch
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Register `listener` for `event_type`, optionally bound to `receiver`.
    ///
    /// An empty event type or an already registered pair is ignored.
    pub fn register(&self, event_type: &str, listener: &ListenerRef, receiver: Option<&Receiver>) {
        match self.try_register(event_type, listener, receiver) {
            Ok(()) => {}
            Err(e) if e.is_invalid_input() => {
                if self.config.report_invalid_registrations {
                    warn!(
                        error = %e,
                        has_receiver = receiver.is_some(),
                        source = %self.id,
                        "Ignoring invalid listener registration"
                    );
                }
            }
            Err(e) => {
                trace!(error = %e, source = %self.id, "Listener already registered");
            }
        }
    }

    /// Like [`register`](Self::register), but reports why nothing was stored.
    pub fn try_register(
        &self,
        event_type: &str,
        listener: &ListenerRef,
        receiver: Option<&Receiver>,
    ) -> Result<()> {
        if event_type.is_empty() {
            return Err(EventError::EmptyEventType);
        }

        let registration = Registration::new(listener.clone(), receiver.cloned());
        let mut listeners = self.listeners.borrow_mut();

        if let Some(existing) = listeners.get(event_type) {
            if existing.contains(&registration) {
                return Err(EventError::already_registered(event_type));
            }
        }

        let entries = listeners.entry(event_type.to_string()).or_default();
        entries.push(registration);
        trace!(
            event_type = %event_type,
            listeners = entries.len(),
            source = %self.id,
            "Listener registered"
        );

        Ok(())
    }

    /// Remove registrations.
    ///
    /// With no `event_type` the removal applies to every registered type.
    /// Per type, an entry is removed when:
    /// - `listener` is given and the entry's `(listener, receiver)` pair
    ///   equals `(listener, receiver)`
    /// - `listener` is absent, `receiver` is given, and the entry is bound
    ///   to `receiver` (whatever its listener)
    /// - both are absent
    ///
    /// Types left without registrations are dropped from the registry.
    pub fn unregister(
        &self,
        event_type: Option<&str>,
        listener: Option<&ListenerRef>,
        receiver: Option<&Receiver>,
    ) {
        let mut listeners = self.listeners.borrow_mut();

        match event_type {
            Some(event_type) => {
                Self::remove_matching(&mut listeners, event_type, listener, receiver);
            }
            None => {
                let event_types: Vec<String> = listeners.keys().cloned().collect();
                for event_type in &event_types {
                    Self::remove_matching(&mut listeners, event_type, listener, receiver);
                }
            }
        }
    }

    /// Remove every registration for `event_type`
    pub fn unregister_all(&self, event_type: &str) {
        self.unregister(Some(event_type), None, None);
    }

    /// Remove every registration bound to `receiver`, across all types
    pub fn unregister_receiver(&self, receiver: &Receiver) {
        self.unregister(None, None, Some(receiver));
    }

    fn remove_matching(
        listeners: &mut HashMap<String, Vec<Registration>>,
        event_type: &str,
        listener: Option<&ListenerRef>,
        receiver: Option<&Receiver>,
    ) {
        let Some(entries) = listeners.get_mut(event_type) else {
            return;
        };

        let before = entries.len();
        entries.retain(|registration| !registration.is_removed_by(listener, receiver));
        let removed = before - entries.len();

        if removed > 0 {
            trace!(event_type = %event_type, removed, "Listeners removed");
        }

        if entries.is_empty() {
            listeners.remove(event_type);
            debug!(event_type = %event_type, "No listeners left for event type");
        }
    }

    /// Deliver `notification` to the listeners of its type, in registration
    /// order.
    ///
    /// Sets the notification's target to this source first. Stops after the
    /// listener that stops propagation; does nothing if propagation was
    /// already stopped. Returns whether any listener prevented the default.
    pub fn dispatch(&self, notification: &mut Notification) -> bool {
        notification.set_target(self.id);

        if notification.is_propagation_stopped() {
            return notification.default_prevented();
        }

        // Release the borrow before running listeners; they may mutate us.
        let snapshot = match self.listeners.borrow().get(notification.event_type()) {
            Some(entries) => entries.clone(),
            None => return notification.default_prevented(),
        };

        trace!(
            event_type = %notification.event_type(),
            listeners = snapshot.len(),
            source = %self.id,
            "Dispatching notification"
        );

        for (index, registration) in snapshot.iter().enumerate() {
            {
                let receiver = registration.receiver.clone();
                let mut binding = ReceiverBinding::bind(notification, receiver);
                registration.listener.call(binding.notification());
            }

            if notification.is_propagation_stopped() {
                trace!(
                    event_type = %notification.event_type(),
                    skipped = snapshot.len() - index - 1,
                    "Propagation stopped"
                );
                break;
            }
        }

        notification.default_prevented()
    }

    /// Whether any listener is registered for `event_type`
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listeners.borrow().contains_key(event_type)
    }

    /// Number of registrations for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.borrow().get(event_type).map_or(0, Vec::len)
    }

    /// Number of registrations across all event types
    pub fn total_listener_count(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    /// Event types with at least one registration, sorted
    pub fn event_types(&self) -> Vec<String> {
        let mut event_types: Vec<String> = self.listeners.borrow().keys().cloned().collect();
        event_types.sort();
        event_types
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

/// Binds a registration's receiver to the notification for one listener
/// call and restores the previous one on drop, unwinding included.
struct ReceiverBinding<'a> {
    notification: &'a mut Notification,
    previous: Option<Receiver>,
}

impl<'a> ReceiverBinding<'a> {
    fn bind(notification: &'a mut Notification, receiver: Option<Receiver>) -> Self {
        let previous = notification.bind_receiver(receiver);
        Self {
            notification,
            previous,
        }
    }

    fn notification(&mut self) -> &mut Notification {
        &mut *self.notification
    }
}

impl Drop for ReceiverBinding<'_> {
    fn drop(&mut self) {
        self.notification.bind_receiver(self.previous.take());
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("id", &self.id)
            .field("event_types", &self.event_types())
            .field("listener_count", &self.total_listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recorder(log: &Log, name: &'static str) -> ListenerRef {
        let log = Rc::clone(log);
        ListenerRef::from_fn(move |_| log.borrow_mut().push(name))
    }

    #[test]
    fn test_register_and_count() {
        let source = EventSource::new();
        assert!(source.is_empty());

        source.register("load", &ListenerRef::from_fn(|_| {}), None);
        source.register("load", &ListenerRef::from_fn(|_| {}), None);
        source.register("unload", &ListenerRef::from_fn(|_| {}), None);

        assert_eq!(source.listener_count("load"), 2);
        assert_eq!(source.listener_count("unload"), 1);
        assert_eq!(source.total_listener_count(), 3);
        assert_eq!(source.event_types(), vec!["load", "unload"]);
        assert!(!source.is_empty());
    }

    #[test]
    fn test_register_is_idempotent() {
        let source = EventSource::new();
        let listener = ListenerRef::from_fn(|_| {});
        let receiver = Receiver::new(());

        source.register("load", &listener, None);
        source.register("load", &listener, None);
        assert_eq!(source.listener_count("load"), 1);

        // Same listener with a receiver is a different pair
        source.register("load", &listener, Some(&receiver));
        source.register("load", &listener, Some(&receiver));
        assert_eq!(source.listener_count("load"), 2);
    }

    #[test]
    fn test_try_register_errors() {
        let source = EventSource::new();
        let listener = ListenerRef::from_fn(|_| {});

        assert_eq!(
            source.try_register("", &listener, None),
            Err(EventError::EmptyEventType)
        );
        assert!(source.is_empty());

        assert_eq!(source.try_register("load", &listener, None), Ok(()));
        assert_eq!(
            source.try_register("load", &listener, None),
            Err(EventError::already_registered("load"))
        );
    }

    #[test]
    fn test_register_empty_type_is_noop() {
        let config = SourceConfig::default().with_invalid_registration_reports(true);
        let source = EventSource::with_config(config);
        source.register("", &ListenerRef::from_fn(|_| {}), None);
        assert!(source.is_empty());
        assert!(!source.has_listeners(""));
    }

    #[test]
    fn test_unregister_exact_pair() {
        let source = EventSource::new();
        let listener = ListenerRef::from_fn(|_| {});
        let receiver = Receiver::new(());
        source.register("load", &listener, None);
        source.register("load", &listener, Some(&receiver));

        source.unregister(Some("load"), Some(&listener), None);
        assert_eq!(source.listener_count("load"), 1);

        source.unregister(Some("load"), Some(&listener), Some(&receiver));
        assert!(!source.has_listeners("load"));
        assert!(source.is_empty());
    }

    #[test]
    fn test_unregister_by_receiver() {
        let source = EventSource::new();
        let receiver = Receiver::new("panel");
        let bound_a = ListenerRef::from_fn(|_| {});
        let bound_b = ListenerRef::from_fn(|_| {});
        let unbound = ListenerRef::from_fn(|_| {});
        source.register("load", &bound_a, Some(&receiver));
        source.register("load", &unbound, None);
        source.register("resize", &bound_b, Some(&receiver));

        source.unregister(Some("load"), None, Some(&receiver));
        assert_eq!(source.listener_count("load"), 1);
        assert_eq!(source.listener_count("resize"), 1);

        source.unregister_receiver(&receiver);
        assert!(!source.has_listeners("resize"));
        assert_eq!(source.event_types(), vec!["load"]);
    }

    #[test]
    fn test_unregister_all_for_type() {
        let source = EventSource::new();
        let receiver = Receiver::new(());
        source.register("load", &ListenerRef::from_fn(|_| {}), None);
        source.register("load", &ListenerRef::from_fn(|_| {}), Some(&receiver));
        source.register("resize", &ListenerRef::from_fn(|_| {}), None);

        source.unregister_all("load");
        assert!(!source.has_listeners("load"));
        assert_eq!(source.listener_count("load"), 0);
        assert!(source.has_listeners("resize"));
    }

    #[test]
    fn test_unregister_without_type_applies_everywhere() {
        let source = EventSource::new();
        let listener = ListenerRef::from_fn(|_| {});
        source.register("load", &listener, None);
        source.register("resize", &listener, None);
        source.register("resize", &ListenerRef::from_fn(|_| {}), None);

        source.unregister(None, Some(&listener), None);
        assert!(!source.has_listeners("load"));
        assert_eq!(source.listener_count("resize"), 1);

        source.unregister(None, None, None);
        assert!(source.is_empty());
    }

    #[test]
    fn test_unregister_unknown_type_is_noop() {
        let source = EventSource::new();
        source.register("load", &ListenerRef::from_fn(|_| {}), None);

        source.unregister(Some("missing"), None, None);
        source.unregister(Some(""), None, None);
        assert_eq!(source.total_listener_count(), 1);
    }

    #[test]
    fn test_dispatch_in_order() {
        let source = EventSource::new();
        let log = Log::default();
        source.register("load", &recorder(&log, "a"), None);
        source.register("load", &recorder(&log, "b"), None);
        source.register("load", &recorder(&log, "c"), None);

        let mut notification = Notification::new("load");
        assert!(!source.dispatch(&mut notification));
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(notification.target(), Some(source.id()));
    }

    #[test]
    fn test_dispatch_only_matching_type() {
        let source = EventSource::new();
        let log = Log::default();
        source.register("load", &recorder(&log, "load"), None);
        source.register("resize", &recorder(&log, "resize"), None);

        source.dispatch(&mut Notification::new("resize"));
        assert_eq!(*log.borrow(), vec!["resize"]);
    }

    #[test]
    fn test_dispatch_without_listeners() {
        let source = EventSource::new();
        let mut notification = Notification::new("load");

        assert!(!source.dispatch(&mut notification));
        assert_eq!(notification.target(), Some(source.id()));

        let mut handled = Notification::new("load");
        handled.prevent_default();
        assert!(source.dispatch(&mut handled));
    }

    #[test]
    fn test_dispatch_stops_propagation() {
        let source = EventSource::new();
        let log = Log::default();
        let log_a = Rc::clone(&log);
        source.register(
            "load",
            &ListenerRef::from_fn(move |n| {
                log_a.borrow_mut().push("a");
                n.stop_propagation();
            }),
            None,
        );
        source.register("load", &recorder(&log, "b"), None);

        assert!(!source.dispatch(&mut Notification::new("load")));
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn test_dispatch_already_stopped() {
        let source = EventSource::new();
        let log = Log::default();
        source.register("load", &recorder(&log, "a"), None);

        let mut notification = Notification::new("load");
        notification.stop_propagation();
        notification.prevent_default();

        assert!(source.dispatch(&mut notification));
        assert!(log.borrow().is_empty());
        assert_eq!(notification.target(), Some(source.id()));
    }

    #[test]
    fn test_dispatch_returns_default_prevented() {
        let source = EventSource::new();
        source.register("submit", &ListenerRef::from_fn(|n| n.prevent_default()), None);
        source.register("submit", &ListenerRef::from_fn(|_| {}), None);

        let mut notification = Notification::new("submit");
        assert!(source.dispatch(&mut notification));
        assert!(notification.default_prevented());
    }

    #[test]
    fn test_dispatch_binds_receiver() {
        let source = EventSource::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let panel = Rc::new(String::from("panel"));
        let receiver = Receiver::from_rc(Rc::clone(&panel));

        let seen_bound = Rc::clone(&seen);
        source.register(
            "load",
            &ListenerRef::from_fn(move |n| {
                let name = n.receiver_as::<String>().map(|s| s.to_string());
                seen_bound.borrow_mut().push(name);
            }),
            Some(&receiver),
        );
        let seen_unbound = Rc::clone(&seen);
        source.register(
            "load",
            &ListenerRef::from_fn(move |n| {
                seen_unbound.borrow_mut().push(n.receiver_as::<String>().map(|s| s.to_string()));
            }),
            None,
        );

        let mut notification = Notification::new("load");
        source.dispatch(&mut notification);

        assert_eq!(*seen.borrow(), vec![Some("panel".to_string()), None]);
        assert!(notification.receiver().is_none());
    }

    #[test]
    fn test_debug_output() {
        let source = EventSource::new();
        source.register("load", &ListenerRef::from_fn(|_| {}), None);

        let output = format!("{:?}", source);
        assert!(output.contains("EventSource"));
        assert!(output.contains("load"));
        assert!(output.contains("listener_count: 1"));
    }
}
