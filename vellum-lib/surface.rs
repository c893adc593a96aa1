//! The surface abstraction.
//!
//! The live editable region is an external collaborator: a source of signals
//! and a sink for rendered node trees. The engine only defines the seam;
//! hosts provide concrete adapters. [`InMemorySurface`] is a reference
//! implementation used by the scenario tests to script platform behavior.

use crate::render::node::Node;
use vellum_core::range::DocRange;

pub trait Surface {
  /// Current flattened text of the editable region.
  fn text(&self) -> String;

  /// Current selection, in document-relative offsets.
  fn selection(&self) -> DocRange;

  /// Ask the platform to skip its default action for the event currently
  /// being handled.
  fn suppress_default(&mut self);

  /// Accept freshly rendered node trees. The trees are owned clones; the
  /// engine retains no reference into the surface.
  fn present(&mut self, nodes: Vec<Node>);
}

/// Scriptable surface for tests and headless hosts.
#[derive(Debug, Default)]
pub struct InMemorySurface {
  text:       String,
  selection:  DocRange,
  suppressed: bool,
  presented:  Vec<Node>,
  presents:   usize,
}

impl InMemorySurface {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_text(&mut self, text: impl Into<String>) {
    self.text = text.into();
  }

  pub fn set_selection(&mut self, selection: DocRange) {
    self.selection = selection;
  }

  /// Replace the current selection with `text` and leave a collapsed caret
  /// after it, the way a platform default action would.
  pub fn type_text(&mut self, text: &str) {
    let chars: Vec<char> = self.text.chars().collect();
    let range = self.selection.clamped(chars.len());
    let mut out: String = chars[..range.start].iter().collect();
    out.push_str(text);
    out.extend(&chars[range.end..]);
    self.text = out;
    self.selection = DocRange::point(range.start + text.chars().count());
  }

  /// Delete one char before a collapsed caret (platform backspace).
  pub fn backspace(&mut self) {
    let chars: Vec<char> = self.text.chars().collect();
    let range = self.selection.clamped(chars.len());
    if range.is_collapsed() && range.start > 0 {
      let mut out: String = chars[..range.start - 1].iter().collect();
      out.extend(&chars[range.end..]);
      self.text = out;
      self.selection = DocRange::point(range.start - 1);
    } else if !range.is_collapsed() {
      self.type_text("");
    }
  }

  /// `true` if the default action was suppressed since the last call.
  pub fn take_suppressed(&mut self) -> bool {
    std::mem::take(&mut self.suppressed)
  }

  pub fn presented(&self) -> &[Node] {
    &self.presented
  }

  pub fn present_count(&self) -> usize {
    self.presents
  }
}

impl Surface for InMemorySurface {
  fn text(&self) -> String {
    self.text.clone()
  }

  fn selection(&self) -> DocRange {
    self.selection
  }

  fn suppress_default(&mut self) {
    self.suppressed = true;
  }

  fn present(&mut self, nodes: Vec<Node>) {
    self.presented = nodes;
    self.presents += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn type_text_replaces_selection() {
    let mut surface = InMemorySurface::new();
    surface.set_text("hello world");
    surface.set_selection(DocRange::new(6, 11));
    surface.type_text("rust");
    assert_eq!(surface.text(), "hello rust");
    assert_eq!(surface.selection(), DocRange::point(10));
  }

  #[test]
  fn backspace_at_caret() {
    let mut surface = InMemorySurface::new();
    surface.set_text("ab");
    surface.set_selection(DocRange::point(2));
    surface.backspace();
    assert_eq!(surface.text(), "a");
    assert_eq!(surface.selection(), DocRange::point(1));
  }
}
