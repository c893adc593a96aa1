//! Abstract surface nodes.
//!
//! The concrete element/attribute naming scheme belongs to the surface
//! adapter; the engine emits semantic tags only.

use vellum_core::{Tendril, attributes::AttrSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
  /// A plain paragraph container.
  Block,
  Quote,
  List,
  ListItem,
  /// An inline container carrying inline attributes (bold, links, ...).
  Run,
  AttachmentBox,
}

/// An owned node tree. `PartialEq` is deep structural equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Element {
    tag:      Tag,
    attrs:    AttrSet,
    children: Vec<Node>,
  },
  Text(Tendril),
}

impl Node {
  pub fn element(tag: Tag) -> Self {
    Self::Element {
      tag,
      attrs: AttrSet::new(),
      children: Vec::new(),
    }
  }

  pub fn text(text: impl Into<Tendril>) -> Self {
    Self::Text(text.into())
  }

  #[must_use]
  pub fn with_attrs(mut self, attrs: AttrSet) -> Self {
    if let Self::Element { attrs: slot, .. } = &mut self {
      *slot = attrs;
    }
    self
  }

  #[must_use]
  pub fn with_children(mut self, children: Vec<Node>) -> Self {
    if let Self::Element { children: slot, .. } = &mut self {
      *slot = children;
    }
    self
  }

  pub fn tag(&self) -> Option<Tag> {
    match self {
      Self::Element { tag, .. } => Some(*tag),
      Self::Text(_) => None,
    }
  }

  pub fn children(&self) -> &[Node] {
    match self {
      Self::Element { children, .. } => children,
      Self::Text(_) => &[],
    }
  }

  pub fn attrs(&self) -> Option<&AttrSet> {
    match self {
      Self::Element { attrs, .. } => Some(attrs),
      Self::Text(_) => None,
    }
  }

  /// Concatenated text of all descendant text nodes.
  pub fn text_content(&self) -> String {
    match self {
      Self::Text(text) => text.to_string(),
      Self::Element { children, .. } => children.iter().map(Node::text_content).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deep_equality_is_structural() {
    let a = Node::element(Tag::Run)
      .with_attrs(AttrSet::new().with("bold", true))
      .with_children(vec![Node::text("hi")]);
    let b = Node::element(Tag::Run)
      .with_attrs(AttrSet::new().with("bold", true))
      .with_children(vec![Node::text("hi")]);
    assert_eq!(a, b);
    assert_ne!(a, Node::element(Tag::Run));
  }

  #[test]
  fn text_content_concatenates() {
    let node = Node::element(Tag::Block).with_children(vec![
      Node::text("a"),
      Node::element(Tag::Run).with_children(vec![Node::text("b")]),
    ]);
    assert_eq!(node.text_content(), "ab");
  }
}
