//! Deterministic single-hunk text diffing.
//!
//! The input controller turns "snapshot vs. current surface text" into one
//! edit by trimming the longest common prefix and suffix, aligned to grapheme
//! boundaries so a composed character is never split between the deleted and
//! inserted halves. Disjoint multi-region mutations (e.g. multi-region
//! autocorrect) are out of scope and collapse into the single spanning hunk.

use unicode_segmentation::UnicodeSegmentation;

use vellum_core::Tendril;

/// One replacement: `deleted` chars at `at` replaced by `inserted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
  /// `char` offset of the replacement.
  pub at:       usize,
  /// Number of `char`s removed.
  pub deleted:  usize,
  /// Replacement text.
  pub inserted: Tendril,
}

impl TextDelta {
  pub fn is_pure_insert(&self) -> bool {
    self.deleted == 0
  }

  pub fn is_pure_delete(&self) -> bool {
    self.inserted.is_empty()
  }

  pub fn inserted_chars(&self) -> usize {
    self.inserted.chars().count()
  }
}

/// Diff `old` against `new`; `None` when they are equal.
pub fn text_delta(old: &str, new: &str) -> Option<TextDelta> {
  if old == new {
    return None;
  }

  let mut prefix_bytes = 0;
  let mut prefix_chars = 0;
  for (a, b) in old.graphemes(true).zip(new.graphemes(true)) {
    if a != b {
      break;
    }
    prefix_bytes += a.len();
    prefix_chars += a.chars().count();
  }

  let old_rest = &old[prefix_bytes..];
  let new_rest = &new[prefix_bytes..];
  let mut suffix_bytes = 0;
  for (a, b) in old_rest.graphemes(true).rev().zip(new_rest.graphemes(true).rev()) {
    if a != b {
      break;
    }
    suffix_bytes += a.len();
  }

  let deleted_mid = &old_rest[..old_rest.len() - suffix_bytes];
  let inserted_mid = &new_rest[..new_rest.len() - suffix_bytes];
  Some(TextDelta {
    at:       prefix_chars,
    deleted:  deleted_mid.chars().count(),
    inserted: inserted_mid.into(),
  })
}
