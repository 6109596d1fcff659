//! Listener handles and registrations
//!
//! Closures and objects are registered through the same [`Listener`] trait.
//! Registrations are compared by identity: two handles are equal only if
//! they point at the same allocation.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::notification::Notification;

/// Something that can receive a [`Notification`].
///
/// Implemented for every `Fn(&mut Notification)`, so plain closures work
/// without a wrapper type.
pub trait Listener {
    fn handle(&self, notification: &mut Notification);
}

impl<F> Listener for F
where
    F: Fn(&mut Notification),
{
    fn handle(&self, notification: &mut Notification) {
        self(notification)
    }
}

/// Shared handle to a listener.
///
/// Keep a clone around to unregister later; a freshly built handle never
/// equals an existing one.
#[derive(Clone)]
pub struct ListenerRef(Rc<dyn Listener>);

impl ListenerRef {
    pub fn new<L: Listener + 'static>(listener: L) -> Self {
        Self(Rc::new(listener))
    }

    /// Wrap a closure. Prefer this over [`ListenerRef::new`] for closures so
    /// the argument type is inferred.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&mut Notification) + 'static,
    {
        Self(Rc::new(f))
    }

    /// Share an existing listener object; handles built from the same `Rc`
    /// compare equal.
    pub fn from_rc<L: Listener + 'static>(listener: Rc<L>) -> Self {
        Self(listener)
    }

    pub(crate) fn call(&self, notification: &mut Notification) {
        self.0.handle(notification);
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ListenerRef {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ListenerRef {}

impl fmt::Debug for ListenerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerRef").field(&self.addr()).finish()
    }
}

/// Context object a listener is bound to.
///
/// Used two ways: the running listener can read it back through
/// [`Notification::receiver`], and
/// [`EventSource::unregister_receiver`](crate::EventSource::unregister_receiver)
/// removes every registration bound to it.
#[derive(Clone)]
pub struct Receiver(Rc<dyn Any>);

impl Receiver {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self(value)
    }

    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.0).downcast::<T>().ok()
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for Receiver {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Receiver {}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Receiver").field(&self.addr()).finish()
    }
}

/// A stored `(listener, receiver)` pair for one event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub listener: ListenerRef,
    pub receiver: Option<Receiver>,
}

impl Registration {
    pub fn new(listener: ListenerRef, receiver: Option<Receiver>) -> Self {
        Self { listener, receiver }
    }

    /// Whether an unregister call with these arguments removes this entry.
    ///
    /// - listener given: the pair must match exactly
    /// - only receiver given: any listener bound to that receiver
    /// - neither given: every entry
    pub fn is_removed_by(
        &self,
        listener: Option<&ListenerRef>,
        receiver: Option<&Receiver>,
    ) -> bool {
        match (listener, receiver) {
            (Some(listener), receiver) => {
                self.listener == *listener && self.receiver.as_ref() == receiver
            }
            (None, Some(receiver)) => self.receiver.as_ref() == Some(receiver),
            (None, None) => true,
        }
    }
}
