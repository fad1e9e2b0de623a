//! Typed publish/subscribe used by the registry.
//!
//! Handlers run synchronously in registration order. A handler that panics is
//! logged and skipped; the rest of the emission carries on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::sound::{SoundHandle, SoundId};

/// An event that can be routed by its kind.
pub trait BusEvent {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handlers are compared by `Rc` identity, so keep a clone to unsubscribe.
pub type Handler<E> = Rc<dyn Fn(&E)>;

pub struct EventBus<E: BusEvent> {
    handlers: RefCell<HashMap<E::Kind, Vec<Handler<E>>>>,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
        }
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `kind`. Registering the same handler twice
    /// makes it run twice per emission.
    pub fn on(&self, kind: E::Kind, handler: Handler<E>) {
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Remove every registration of `handler` for `kind`.
    pub fn off(&self, kind: E::Kind, handler: &Handler<E>) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !Rc::ptr_eq(h, handler));
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    /// Deliver `event` to the current subscribers of its kind and return how
    /// many completed without panicking.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();
        // Snapshot so handlers can subscribe/unsubscribe while we iterate.
        let snapshot: Vec<Handler<E>> = match self.handlers.borrow().get(&kind) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for handler in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    log::error!("{kind:?} handler panicked: {}", panic_message(&*payload));
                }
            }
        }
        completed
    }

    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoundEventKind {
    SoundRegistered,
    SoundUpdated,
    SoundStopped,
    SoundUnregistered,
}

/// Registry lifecycle notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum SoundEvent {
    Registered(SoundHandle),
    Updated(SoundHandle),
    Stopped(SoundHandle),
    Unregistered(SoundId),
}

impl SoundEvent {
    pub fn id(&self) -> SoundId {
        match self {
            SoundEvent::Registered(h) | SoundEvent::Updated(h) | SoundEvent::Stopped(h) => h.id,
            SoundEvent::Unregistered(id) => *id,
        }
    }
}

impl BusEvent for SoundEvent {
    type Kind = SoundEventKind;

    fn kind(&self) -> SoundEventKind {
        match self {
            SoundEvent::Registered(_) => SoundEventKind::SoundRegistered,
            SoundEvent::Updated(_) => SoundEventKind::SoundUpdated,
            SoundEvent::Stopped(_) => SoundEventKind::SoundStopped,
            SoundEvent::Unregistered(_) => SoundEventKind::SoundUnregistered,
        }
    }
}
