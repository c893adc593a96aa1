//! Inline and block attribute sets.
//!
//! An [`AttrSet`] maps attribute names to values. Order is irrelevant and
//! equality is set equality; entries are kept sorted by name so the derived
//! `PartialEq` and `Hash` behave as set operations.

use smallvec::SmallVec;

use crate::Tendril;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrValue {
  Bool(bool),
  Int(i64),
  Str(Tendril),
}

impl AttrValue {
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Self::Int(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Str(s) => Some(s.as_str()),
      _ => None,
    }
  }
}

impl From<bool> for AttrValue {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl From<i64> for AttrValue {
  fn from(value: i64) -> Self {
    Self::Int(value)
  }
}

impl From<&str> for AttrValue {
  fn from(value: &str) -> Self {
    Self::Str(value.into())
  }
}

/// A set of named attributes, e.g. `bold`, `href`, `quote`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttrSet {
  // Sorted by name.
  entries: SmallVec<[(Tendril, AttrValue); 2]>,
}

impl AttrSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn get(&self, name: &str) -> Option<&AttrValue> {
    self
      .entries
      .binary_search_by(|(n, _)| n.as_str().cmp(name))
      .ok()
      .map(|idx| &self.entries[idx].1)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  /// `true` when the attribute is present as `Bool(true)`.
  pub fn bool(&self, name: &str) -> bool {
    self.get(name).and_then(AttrValue::as_bool).unwrap_or(false)
  }

  pub fn set(&mut self, name: impl Into<Tendril>, value: impl Into<AttrValue>) {
    let name = name.into();
    let value = value.into();
    match self.entries.binary_search_by(|(n, _)| n.cmp(&name)) {
      Ok(idx) => self.entries[idx].1 = value,
      Err(idx) => self.entries.insert(idx, (name, value)),
    }
  }

  pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
    self
      .entries
      .binary_search_by(|(n, _)| n.as_str().cmp(name))
      .ok()
      .map(|idx| self.entries.remove(idx).1)
  }

  #[must_use]
  pub fn with(mut self, name: impl Into<Tendril>, value: impl Into<AttrValue>) -> Self {
    self.set(name, value);
    self
  }

  #[must_use]
  pub fn without(mut self, name: &str) -> Self {
    self.remove(name);
    self
  }

  /// Flip a boolean attribute: absent becomes `true`, present is removed.
  #[must_use]
  pub fn toggled(mut self, name: &str) -> Self {
    if self.contains(name) {
      self.remove(name);
    } else {
      self.set(name, true);
    }
    self
  }

  /// Union of two sets; entries from `other` win on name collisions.
  #[must_use]
  pub fn merged(&self, other: &Self) -> Self {
    let mut out = self.clone();
    for (name, value) in other.iter() {
      out.set(name.clone(), value.clone());
    }
    out
  }

  pub fn iter(&self) -> impl ExactSizeIterator<Item = &(Tendril, AttrValue)> {
    self.entries.iter()
  }
}

impl FromIterator<(Tendril, AttrValue)> for AttrSet {
  fn from_iter<I: IntoIterator<Item = (Tendril, AttrValue)>>(iter: I) -> Self {
    let mut set = Self::new();
    for (name, value) in iter {
      set.set(name, value);
    }
    set
  }
}
