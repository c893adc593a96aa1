//! Blocks: paragraph-like units holding an ordered list of pieces.
//!
//! A block's pieces concatenate to its plain-text content; block separators
//! never appear inside a block. Blocks carry block-level attributes (quote,
//! list markers, ...) and a nesting depth, plus a stable [`BlockId`] that is
//! distinct from content and survives edits. All edit operations are pure:
//! they take `&self` and return a new `Block`.

use std::{
  num::NonZeroU64,
  ops::Range,
  sync::atomic::{AtomicU64, Ordering},
};

use smallvec::SmallVec;

use crate::{
  attributes::{AttrSet, AttrValue},
  key::CacheKey,
  piece::Piece,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(NonZeroU64);

impl BlockId {
  pub fn new(id: NonZeroU64) -> Self {
    Self(id)
  }

  pub fn fresh() -> Self {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed).max(1);
    Self(NonZeroU64::new(id).expect("block id must be non-zero"))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

pub type Pieces = SmallVec<[Piece; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
  id:     BlockId,
  pieces: Pieces,
  attrs:  AttrSet,
  depth:  u16,
}

impl Default for Block {
  fn default() -> Self {
    Self::new()
  }
}

impl Block {
  pub fn new() -> Self {
    Self {
      id:     BlockId::fresh(),
      pieces: Pieces::new(),
      attrs:  AttrSet::new(),
      depth:  0,
    }
  }

  pub fn from_text(text: &str, attrs: AttrSet) -> Self {
    let mut block = Self::new();
    if !text.is_empty() {
      block.pieces.push(Piece::text(text, attrs));
    }
    block
  }

  pub fn with_pieces(pieces: impl IntoIterator<Item = Piece>) -> Self {
    let mut block = Self::new();
    block.pieces = pieces.into_iter().filter(|p| !p.is_empty()).collect();
    block
  }

  pub fn id(&self) -> BlockId {
    self.id
  }

  pub fn pieces(&self) -> &[Piece] {
    &self.pieces
  }

  pub fn attrs(&self) -> &AttrSet {
    &self.attrs
  }

  pub fn depth(&self) -> u16 {
    self.depth
  }

  #[must_use]
  pub fn with_attrs(mut self, attrs: AttrSet) -> Self {
    self.attrs = attrs;
    self
  }

  #[must_use]
  pub fn with_depth(mut self, depth: u16) -> Self {
    self.depth = depth;
    self
  }

  pub fn len_chars(&self) -> usize {
    self.pieces.iter().map(Piece::len_chars).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.pieces.iter().all(Piece::is_empty)
  }

  pub fn text(&self) -> String {
    let mut out = String::new();
    for piece in &self.pieces {
      piece.push_plain_text(&mut out);
    }
    out
  }

  /// Split the piece list at a local `char` offset, splitting a piece in two
  /// when the offset falls inside it.
  fn split_pieces_at(&self, at: usize) -> (Pieces, Pieces) {
    let mut left = Pieces::new();
    let mut right = Pieces::new();
    let mut offset = 0;
    for piece in &self.pieces {
      let len = piece.len_chars();
      if offset + len <= at {
        left.push(piece.clone());
      } else if offset >= at {
        right.push(piece.clone());
      } else {
        let (a, b) = piece.split_at(at - offset);
        left.push(a);
        right.push(b);
      }
      offset += len;
    }
    (left, right)
  }

  /// Split into two sibling blocks at a local offset. The left half keeps
  /// this block's identity; the right half gets a fresh one but inherits
  /// attributes and depth.
  pub fn split_at(&self, at: usize) -> (Self, Self) {
    let (left, right) = self.split_pieces_at(at);
    (
      Self {
        id:     self.id,
        pieces: normalized(left),
        attrs:  self.attrs.clone(),
        depth:  self.depth,
      },
      Self {
        id:     BlockId::fresh(),
        pieces: normalized(right),
        attrs:  self.attrs.clone(),
        depth:  self.depth,
      },
    )
  }

  /// Concatenate another block's pieces onto this one, keeping this block's
  /// identity and attributes (the earlier block wins).
  #[must_use]
  pub fn merged(&self, other: &Self) -> Self {
    let mut pieces = self.pieces.clone();
    pieces.extend(other.pieces.iter().cloned());
    Self {
      id:     self.id,
      pieces: normalized(pieces),
      attrs:  self.attrs.clone(),
      depth:  self.depth,
    }
  }

  #[must_use]
  pub fn insert_piece_at(&self, at: usize, piece: Piece) -> Self {
    let (mut pieces, right) = self.split_pieces_at(at);
    pieces.push(piece);
    pieces.extend(right);
    Self {
      id:     self.id,
      pieces: normalized(pieces),
      attrs:  self.attrs.clone(),
      depth:  self.depth,
    }
  }

  #[must_use]
  pub fn delete_local_range(&self, range: Range<usize>) -> Self {
    let (left, _) = self.split_pieces_at(range.start);
    let (_, right) = self.split_pieces_at(range.end);
    let mut pieces = left;
    pieces.extend(right);
    Self {
      id:     self.id,
      pieces: normalized(pieces),
      attrs:  self.attrs.clone(),
      depth:  self.depth,
    }
  }

  /// Set (`Some`) or clear (`None`) an inline attribute over a local range,
  /// splitting pieces at the range boundaries.
  #[must_use]
  pub fn apply_text_attr(&self, range: Range<usize>, name: &str, value: Option<&AttrValue>) -> Self {
    let mut pieces = Pieces::new();
    let mut offset = 0;
    for piece in &self.pieces {
      let len = piece.len_chars();
      let start = range.start.clamp(offset, offset + len) - offset;
      let end = range.end.clamp(offset, offset + len) - offset;
      offset += len;

      if start >= end {
        pieces.push(piece.clone());
        continue;
      }

      let (head, rest) = piece.split_at_checked(start);
      let (mid, tail) = rest.split_at_checked(end - start);
      if let Some(head) = head {
        pieces.push(head);
      }
      if let Some(mid) = mid {
        let mut attrs = mid.attrs().clone();
        match value {
          Some(value) => attrs.set(name, value.clone()),
          None => {
            attrs.remove(name);
          },
        }
        pieces.push(mid.with_attrs(attrs));
      }
      pieces.push(tail);
    }
    Self {
      id:     self.id,
      pieces: normalized(pieces),
      attrs:  self.attrs.clone(),
      depth:  self.depth,
    }
  }

  #[must_use]
  pub fn apply_block_attr(&self, name: &str, value: Option<&AttrValue>) -> Self {
    let mut attrs = self.attrs.clone();
    match value {
      Some(value) => attrs.set(name, value.clone()),
      None => {
        attrs.remove(name);
      },
    }
    Self {
      id:     self.id,
      pieces: self.pieces.clone(),
      attrs,
      depth: self.depth,
    }
  }

  /// Attributes in effect at a caret: the piece to the left of the offset
  /// wins; a caret at the block start adopts the first piece's attributes.
  pub fn attrs_at_caret(&self, at: usize) -> AttrSet {
    if self.pieces.is_empty() {
      return AttrSet::new();
    }
    if at == 0 {
      return self.pieces[0].attrs().clone();
    }
    let mut offset = 0;
    for piece in &self.pieces {
      offset += piece.len_chars();
      if at <= offset {
        return piece.attrs().clone();
      }
    }
    self
      .pieces
      .last()
      .map(|p| p.attrs().clone())
      .unwrap_or_default()
  }

  /// Content-derived key: equal blocks render identically regardless of id.
  pub fn cache_key(&self) -> CacheKey {
    CacheKey::of(&(
      &self.attrs,
      self.depth,
      self
        .pieces
        .iter()
        .map(|p| p.cache_key().get())
        .collect::<Vec<_>>(),
    ))
  }
}

impl Piece {
  /// Split that tolerates boundary offsets: the left side is `None` when the
  /// offset is 0, and the right side is an empty run when the offset equals
  /// the piece length. Attachments are only ever asked for boundary splits.
  fn split_at_checked(&self, at: usize) -> (Option<Self>, Self) {
    if at == 0 {
      return (None, self.clone());
    }
    if at >= self.len_chars() {
      return (Some(self.clone()), Self::text("", self.attrs().clone()));
    }
    let (left, right) = self.split_at(at);
    (Some(left), right)
  }
}

fn normalized(pieces: Pieces) -> Pieces {
  pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::piece::Attachment;

  fn plain(text: &str) -> Block {
    Block::from_text(text, AttrSet::new())
  }

  #[test]
  fn split_keeps_left_identity() {
    let block = plain("hello world");
    let (left, right) = block.split_at(5);
    assert_eq!(left.id(), block.id());
    assert_ne!(right.id(), block.id());
    assert_eq!(left.text(), "hello");
    assert_eq!(right.text(), " world");
  }

  #[test]
  fn merged_keeps_earlier_attrs() {
    let quote = plain("a").with_attrs(AttrSet::new().with("quote", true));
    let other = plain("b").with_attrs(AttrSet::new().with("bullet", true));
    let merged = quote.merged(&other);
    assert_eq!(merged.text(), "ab");
    assert!(merged.attrs().bool("quote"));
    assert!(!merged.attrs().bool("bullet"));
    assert_eq!(merged.id(), quote.id());
  }

  #[test]
  fn apply_text_attr_splits_at_boundaries() {
    let block = plain("abcdef");
    let bold = AttrValue::Bool(true);
    let styled = block.apply_text_attr(2..4, "bold", Some(&bold));
    assert_eq!(styled.pieces().len(), 3);
    assert_eq!(styled.pieces()[0].as_text(), Some("ab"));
    assert_eq!(styled.pieces()[1].as_text(), Some("cd"));
    assert!(styled.pieces()[1].attrs().bool("bold"));
    assert_eq!(styled.pieces()[2].as_text(), Some("ef"));
    assert_eq!(styled.text(), "abcdef");
  }

  #[test]
  fn clearing_attr_restores_equal_attribute_sets() {
    let block = plain("abcdef");
    let bold = AttrValue::Bool(true);
    let styled = block.apply_text_attr(1..5, "bold", Some(&bold));
    let cleared = styled.apply_text_attr(1..5, "bold", None);
    assert_eq!(cleared.text(), block.text());
    for piece in cleared.pieces() {
      assert!(!piece.attrs().bool("bold"));
    }
  }

  #[test]
  fn delete_local_range_spanning_pieces() {
    let block = Block::with_pieces([
      Piece::text("abc", AttrSet::new()),
      Piece::text("def", AttrSet::new().with("bold", true)),
    ]);
    let deleted = block.delete_local_range(2..4);
    assert_eq!(deleted.text(), "abef");
  }

  #[test]
  fn attachment_is_not_split_by_attr_application() {
    let block = Block::with_pieces([
      Piece::text("ab", AttrSet::new()),
      Piece::attachment(Attachment::new("image/png", "cat.png"), AttrSet::new()),
      Piece::text("cd", AttrSet::new()),
    ]);
    let bold = AttrValue::Bool(true);
    // Range covers the attachment entirely; it is restyled, never split.
    let styled = block.apply_text_attr(1..4, "bold", Some(&bold));
    assert_eq!(styled.len_chars(), 5);
    let attachment = styled
      .pieces()
      .iter()
      .find(|p| p.is_attachment())
      .expect("attachment survives");
    assert!(attachment.attrs().bool("bold"));
  }

  #[test]
  fn caret_attrs_prefer_left_piece() {
    let block = Block::with_pieces([
      Piece::text("ab", AttrSet::new().with("bold", true)),
      Piece::text("cd", AttrSet::new()),
    ]);
    assert!(block.attrs_at_caret(2).bool("bold"));
    assert!(!block.attrs_at_caret(3).bool("bold"));
    assert!(block.attrs_at_caret(0).bool("bold"));
  }

  #[test]
  fn cache_key_ignores_identity_but_not_content() {
    let a = plain("same");
    let b = plain("same");
    assert_ne!(a.id(), b.id());
    assert_eq!(a.cache_key(), b.cache_key());
    assert_ne!(a.cache_key(), plain("other").cache_key());
  }
}
