//! Content-derived cache keys.
//!
//! A [`CacheKey`] is equal between two objects exactly when they would render
//! identically. Keys are derived by hashing content and attributes with a
//! fixed-seed hasher, so they are stable for the lifetime of a process but
//! must not be persisted.

use std::hash::{BuildHasher, Hash};

use foldhash::fast::FixedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u64);

impl CacheKey {
  /// Derive a key from anything hashable.
  pub fn of(value: &impl Hash) -> Self {
    Self(FixedState::default().hash_one(value))
  }

  /// Combine an ordered sequence of member keys into one group key.
  ///
  /// Order matters: the same members in a different order produce a
  /// different key.
  pub fn combine(keys: impl IntoIterator<Item = Self>) -> Self {
    let members: Vec<u64> = keys.into_iter().map(|k| k.0).collect();
    Self(FixedState::default().hash_one(&members))
  }

  pub const fn get(self) -> u64 {
    self.0
  }
}
