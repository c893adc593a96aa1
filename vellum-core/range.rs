//! Document-relative ranges.

/// A pair of `char` offsets into the flattened document text, with
/// `start <= end` maintained by construction. Collapsed when `start == end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DocRange {
  pub start: usize,
  pub end:   usize,
}

impl DocRange {
  /// Build a range, swapping the endpoints if they arrive reversed.
  pub fn new(a: usize, b: usize) -> Self {
    if a <= b {
      Self { start: a, end: b }
    } else {
      Self { start: b, end: a }
    }
  }

  pub const fn point(at: usize) -> Self {
    Self { start: at, end: at }
  }

  pub const fn is_collapsed(&self) -> bool {
    self.start == self.end
  }

  pub const fn len(&self) -> usize {
    self.end - self.start
  }

  pub const fn is_empty(&self) -> bool {
    self.is_collapsed()
  }

  pub fn contains(&self, at: usize) -> bool {
    self.start <= at && at < self.end
  }

  #[must_use]
  pub fn clamped(&self, len: usize) -> Self {
    Self {
      start: self.start.min(len),
      end:   self.end.min(len),
    }
  }

  /// Map this range through an edit that replaced `deleted` chars at `at`
  /// with `inserted` chars. Positions inside the replaced span collapse to
  /// its end.
  #[must_use]
  pub fn mapped_through(&self, at: usize, deleted: usize, inserted: usize) -> Self {
    let map = |pos: usize| {
      if pos <= at {
        pos
      } else if pos <= at + deleted {
        at + inserted
      } else {
        pos - deleted + inserted
      }
    };
    Self::new(map(self.start), map(self.end))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_normalizes_reversed_endpoints() {
    assert_eq!(DocRange::new(7, 2), DocRange::new(2, 7));
    assert!(DocRange::point(3).is_collapsed());
  }

  #[test]
  fn mapped_through_insertion_and_deletion() {
    // Insert 3 chars at 2: caret at 5 moves to 8.
    assert_eq!(DocRange::point(5).mapped_through(2, 0, 3), DocRange::point(8));
    // Delete [2, 5): caret inside the span collapses to 2.
    assert_eq!(DocRange::point(4).mapped_through(2, 3, 0), DocRange::point(2));
    // Positions before the edit are untouched.
    assert_eq!(DocRange::point(1).mapped_through(2, 3, 1), DocRange::point(1));
  }
}
