//! In-process publish/subscribe

use crate::events::types::{AppEvent, EventKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

/// Registered handler id, used to unregister
pub type HandlerId = Uuid;

pub type EventHandler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

const STREAM_CAPACITY: usize = 256;

#[derive(Default)]
struct Registry {
    by_kind: HashMap<EventKind, Vec<(HandlerId, EventHandler)>>,
    catch_all: Vec<(HandlerId, EventHandler)>,
}

/// Routes events to registered handlers and to stream subscribers
pub struct EventDispatcher {
    registry: RwLock<Registry>,
    stream: broadcast::Sender<AppEvent>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let (stream, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            registry: RwLock::new(Registry::default()),
            stream,
        }
    }

    /// Call `handler` for every event of `kind`
    pub fn register<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.registry
            .write()
            .by_kind
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        debug!("Registered {} handler {}", kind, id);
        id
    }

    /// Call `handler` for every event
    pub fn register_all<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.registry.write().catch_all.push((id, Arc::new(handler)));
        debug!("Registered catch-all handler {}", id);
        id
    }

    /// Returns false if no handler had that id
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut registry = self.registry.write();

        let before = registry.catch_all.len();
        registry.catch_all.retain(|(h, _)| *h != id);
        let mut removed = registry.catch_all.len() != before;

        for handlers in registry.by_kind.values_mut() {
            let before = handlers.len();
            handlers.retain(|(h, _)| *h != id);
            removed |= handlers.len() != before;
        }

        removed
    }

    /// Deliver `event` to kind handlers, then catch-all handlers, then the stream
    pub fn dispatch(&self, event: AppEvent) {
        let kind = event.kind();

        // snapshot so handlers can (un)register without deadlocking
        let handlers: Vec<EventHandler> = {
            let registry = self.registry.read();
            registry
                .by_kind
                .get(&kind)
                .into_iter()
                .flatten()
                .chain(registry.catch_all.iter())
                .map(|(_, h)| h.clone())
                .collect()
        };

        trace!("Dispatching {} to {} handlers", kind, handlers.len());
        for handler in handlers {
            handler(&event);
        }

        // no subscribers is fine
        let _ = self.stream.send(event);
    }

    /// Receive every dispatched event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.stream.subscribe()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
