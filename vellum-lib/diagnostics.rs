//! Diagnostics context for recovered errors.
//!
//! Recovered conditions (protocol violations, paste fallbacks, cache
//! rebuilds) never surface as `Err` to callers; they are reported here so a
//! host can observe them. The context is explicitly constructed and handed
//! to the controller; subscriptions are disposed by dropping the returned
//! [`Subscription`] (or calling [`Subscription::dispose`]).
//!
//! Single-threaded by design, like the rest of the engine.

use std::{
  cell::RefCell,
  fmt,
  rc::{Rc, Weak},
};

use vellum_core::Tendril;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
  /// Overlapping or out-of-order composition signals; the session was forced
  /// back to idle.
  CompositionProtocolViolation { detail: Tendril },
  /// No usable representation was offered for a paste or drop.
  AmbiguousPasteData,
  /// An edit operation was rejected and the document left unchanged.
  EditRejected { reason: Tendril },
  /// The render cache was found inconsistent and the root was rebuilt.
  CacheRebuilt,
}

type Callback = Box<dyn FnMut(&DiagnosticEvent)>;

#[derive(Default)]
struct Registry {
  next_id:     u64,
  subscribers: Vec<(u64, Callback)>,
}

#[derive(Clone, Default)]
pub struct Diagnostics {
  registry: Rc<RefCell<Registry>>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&self, callback: impl FnMut(&DiagnosticEvent) + 'static) -> Subscription {
    let mut registry = self.registry.borrow_mut();
    let id = registry.next_id;
    registry.next_id += 1;
    registry.subscribers.push((id, Box::new(callback)));
    Subscription {
      id,
      registry: Rc::downgrade(&self.registry),
    }
  }

  pub fn emit(&self, event: DiagnosticEvent) {
    // Callbacks may subscribe or dispose reentrantly; dispatch against a
    // detached list so the registry is not borrowed while they run.
    let mut subscribers = std::mem::take(&mut self.registry.borrow_mut().subscribers);
    for (_, callback) in &mut subscribers {
      callback(&event);
    }
    let mut registry = self.registry.borrow_mut();
    subscribers.extend(std::mem::take(&mut registry.subscribers));
    registry.subscribers = subscribers;
  }

  pub fn subscriber_count(&self) -> usize {
    self.registry.borrow().subscribers.len()
  }
}

impl fmt::Debug for Diagnostics {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Diagnostics")
      .field("subscribers", &self.subscriber_count())
      .finish()
  }
}

/// Disposer for one subscription; unsubscribes on drop.
pub struct Subscription {
  id:       u64,
  registry: Weak<RefCell<Registry>>,
}

impl Subscription {
  pub fn dispose(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(registry) = self.registry.upgrade() {
      registry
        .borrow_mut()
        .subscribers
        .retain(|(id, _)| *id != self.id);
    }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription").field("id", &self.id).finish()
  }
}
