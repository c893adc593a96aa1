//! Composition session state and input strategy selection.
//!
//! An in-progress IME composition is transient state: the anchor where it
//! began, a snapshot of the text to diff against when it ends, and the last
//! composed data. Platforms fire selection-movement updates carrying the same
//! data as the previous update; those are cursor churn, not content, and must
//! not advance the session.

use vellum_core::Tendril;

/// What the platform can report about impending edits, detected once per
/// session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
  /// Structured input events arrive ahead of the default mutation.
  pub structured_input_events: bool,
}

/// The two mutually exclusive input strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategy {
  /// Reconcile after the fact by diffing surface mutations against the
  /// document.
  MutationObservation,
  /// Intercept structured input events and suppress the default mutation.
  NativeEvents,
}

impl InputStrategy {
  pub fn detect(capabilities: &Capabilities) -> Self {
    if capabilities.structured_input_events {
      Self::NativeEvents
    } else {
      Self::MutationObservation
    }
  }
}

#[derive(Debug, Clone)]
pub struct CompositionSession {
  anchor:   usize,
  snapshot: String,
  data:     Tendril,
  sequence: u64,
  canceled: bool,
}

impl CompositionSession {
  pub fn new(anchor: usize, snapshot: String) -> Self {
    Self {
      anchor,
      snapshot,
      data: Tendril::new(),
      sequence: 0,
      canceled: false,
    }
  }

  /// Selection start when the composition began.
  pub fn anchor(&self) -> usize {
    self.anchor
  }

  /// Plain text when the composition began; the final commit is the diff of
  /// this snapshot against the surface.
  pub fn snapshot(&self) -> &str {
    &self.snapshot
  }

  pub fn data(&self) -> &str {
    &self.data
  }

  /// Advanced only by updates that actually change the data.
  pub fn sequence(&self) -> u64 {
    self.sequence
  }

  /// Record composed data. Returns `false` for equal-data updates.
  pub fn update(&mut self, data: &str) -> bool {
    if self.data.as_str() == data {
      return false;
    }
    self.data = data.into();
    self.sequence += 1;
    true
  }

  /// Mark the session canceled; its buffered state must be discarded
  /// instead of committed.
  pub fn cancel(&mut self) {
    self.canceled = true;
  }

  pub fn is_canceled(&self) -> bool {
    self.canceled
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detect_prefers_native_events() {
    let caps = Capabilities {
      structured_input_events: true,
    };
    assert_eq!(InputStrategy::detect(&caps), InputStrategy::NativeEvents);
    assert_eq!(
      InputStrategy::detect(&Capabilities::default()),
      InputStrategy::MutationObservation
    );
  }

  #[test]
  fn equal_data_updates_do_not_advance() {
    let mut session = CompositionSession::new(0, String::new());
    assert!(session.update("a"));
    assert_eq!(session.sequence(), 1);
    // Cursor movement re-reports the same data.
    assert!(!session.update("a"));
    assert_eq!(session.sequence(), 1);
    assert!(session.update("ab"));
    assert_eq!(session.sequence(), 2);
    assert_eq!(session.data(), "ab");
  }

  #[test]
  fn cancellation_is_sticky() {
    let mut session = CompositionSession::new(3, "abc".to_string());
    assert!(!session.is_canceled());
    session.cancel();
    assert!(session.is_canceled());
    assert_eq!(session.anchor(), 3);
    assert_eq!(session.snapshot(), "abc");
  }
}
