//! Host event capability: subscribe / unsubscribe / emit.
//!
//! Handlers turn an event into a future; `emit` spawns one task per
//! subscribed handler and returns their join handles. Emissions are never
//! coalesced, so two events in quick succession yield two independent tasks.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

/// Names of the events the host emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// The companion has been activated.
    Ready,
    /// The watch sent a message (a refresh request).
    AppMessage,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Ready => "ready",
            EventName::AppMessage => "appmessage",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An emitted event with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CompanionEvent {
    Ready,
    AppMessage { payload: Option<serde_json::Value> },
}

impl CompanionEvent {
    pub fn name(&self) -> EventName {
        match self {
            CompanionEvent::Ready => EventName::Ready,
            CompanionEvent::AppMessage { .. } => EventName::AppMessage,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(CompanionEvent) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<EventName, Vec<(SubscriptionId, EventHandler)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, name: EventName, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.entry(name).or_default().push((id, handler));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered for `name`.
    pub fn unsubscribe(&self, name: EventName, id: SubscriptionId) -> bool {
        let mut handlers = match self.handlers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(list) = handlers.get_mut(&name) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        before != list.len()
    }

    /// Emit an event. Must be called from within a tokio runtime.
    pub fn emit(&self, event: CompanionEvent) -> Vec<JoinHandle<()>> {
        // Snapshot the handlers so none run while the registry lock is held.
        let handlers: Vec<EventHandler> = {
            let guard = match self.handlers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .get(&event.name())
                .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        if handlers.is_empty() {
            tracing::debug!("No handlers for '{}' event", event.name());
        }

        handlers
            .into_iter()
            .map(|handler| tokio::spawn(handler(event.clone())))
            .collect()
    }
}
