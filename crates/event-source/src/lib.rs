//! Synchronous event source for embedding in application objects
//!
//! This crate provides a listener registry keyed by event type and a
//! notification object with propagation and default-prevention flags.
//! Dispatch runs every matching listener in registration order on the
//! calling thread before returning.

mod config;
mod error;
mod listener;
mod notification;
mod source;
mod target;

pub use config::SourceConfig;
pub use error::{EventError, Result};
pub use listener::{Listener, ListenerRef, Receiver, Registration};
pub use notification::{Notification, SourceId};
pub use source::EventSource;
pub use target::EventTarget;
