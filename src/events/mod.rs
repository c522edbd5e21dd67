//! Event module
//!
//! Decouples the monitor loops from whoever listens: the local API's event
//! stream, notifiers and tests all subscribe through the dispatcher.

pub mod dispatcher;
pub mod types;

pub use dispatcher::{EventDispatcher, EventHandler, HandlerId};
pub use types::{AppEvent, EventKind};
