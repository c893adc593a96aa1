//! Pieces: indivisible attributed runs of text or attachment references.

use std::{
  num::NonZeroU64,
  sync::atomic::{AtomicU64, Ordering},
};

use crate::{
  Tendril,
  attributes::AttrSet,
  key::CacheKey,
};

/// Stand-in character for an attachment in the plain-text projection.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId(NonZeroU64);

impl AttachmentId {
  pub fn new(id: NonZeroU64) -> Self {
    Self(id)
  }

  pub fn fresh() -> Self {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed).max(1);
    Self(NonZeroU64::new(id).expect("attachment id must be non-zero"))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

/// An opaque reference to an external object (image, file, ...).
///
/// The core never interprets the payload; presentation widgets do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attachment {
  id:           AttachmentId,
  content_type: Tendril,
  payload:      Tendril,
}

impl Attachment {
  pub fn new(content_type: impl Into<Tendril>, payload: impl Into<Tendril>) -> Self {
    Self {
      id:           AttachmentId::fresh(),
      content_type: content_type.into(),
      payload:      payload.into(),
    }
  }

  pub fn id(&self) -> AttachmentId {
    self.id
  }

  pub fn content_type(&self) -> &str {
    &self.content_type
  }

  pub fn payload(&self) -> &str {
    &self.payload
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PieceContent {
  Text(Tendril),
  Attachment(Attachment),
}

/// A text run or a single attachment, plus its inline attributes.
///
/// Adjacent pieces with identical attributes are never merged in storage;
/// they are only grouped at render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Piece {
  content: PieceContent,
  attrs:   AttrSet,
}

impl Piece {
  pub fn text(text: impl Into<Tendril>, attrs: AttrSet) -> Self {
    Self {
      content: PieceContent::Text(text.into()),
      attrs,
    }
  }

  pub fn attachment(attachment: Attachment, attrs: AttrSet) -> Self {
    Self {
      content: PieceContent::Attachment(attachment),
      attrs,
    }
  }

  pub fn content(&self) -> &PieceContent {
    &self.content
  }

  pub fn attrs(&self) -> &AttrSet {
    &self.attrs
  }

  pub fn is_text(&self) -> bool {
    matches!(self.content, PieceContent::Text(_))
  }

  pub fn is_attachment(&self) -> bool {
    matches!(self.content, PieceContent::Attachment(_))
  }

  pub fn as_text(&self) -> Option<&str> {
    match &self.content {
      PieceContent::Text(text) => Some(text.as_str()),
      PieceContent::Attachment(_) => None,
    }
  }

  pub fn as_attachment(&self) -> Option<&Attachment> {
    match &self.content {
      PieceContent::Text(_) => None,
      PieceContent::Attachment(attachment) => Some(attachment),
    }
  }

  /// Length in `char`s. An attachment occupies exactly one position.
  pub fn len_chars(&self) -> usize {
    match &self.content {
      PieceContent::Text(text) => text.chars().count(),
      PieceContent::Attachment(_) => 1,
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(&self.content, PieceContent::Text(text) if text.is_empty())
  }

  #[must_use]
  pub fn with_attrs(mut self, attrs: AttrSet) -> Self {
    self.attrs = attrs;
    self
  }

  /// Split a text piece at a `char` offset. Attachments are indivisible;
  /// callers must only split text pieces at interior offsets.
  pub fn split_at(&self, at: usize) -> (Self, Self) {
    let PieceContent::Text(text) = &self.content else {
      unreachable!("attachments have length 1 and are never split at an interior offset");
    };
    let byte = text
      .char_indices()
      .nth(at)
      .map(|(idx, _)| idx)
      .unwrap_or(text.len());
    (
      Self::text(&text[..byte], self.attrs.clone()),
      Self::text(&text[byte..], self.attrs.clone()),
    )
  }

  pub fn push_plain_text(&self, out: &mut String) {
    match &self.content {
      PieceContent::Text(text) => out.push_str(text),
      PieceContent::Attachment(_) => out.push(OBJECT_REPLACEMENT),
    }
  }

  /// Equal between two pieces exactly when they render identically:
  /// content, attributes, and (for attachments) identity.
  pub fn cache_key(&self) -> CacheKey {
    CacheKey::of(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_respects_char_boundaries() {
    let piece = Piece::text("héllo", AttrSet::new().with("bold", true));
    let (left, right) = piece.split_at(2);
    assert_eq!(left.as_text(), Some("hé"));
    assert_eq!(right.as_text(), Some("llo"));
    assert!(left.attrs().bool("bold"));
    assert!(right.attrs().bool("bold"));
  }

  #[test]
  fn attachment_occupies_one_position() {
    let piece = Piece::attachment(Attachment::new("image/png", "cat.png"), AttrSet::new());
    assert_eq!(piece.len_chars(), 1);
    let mut out = String::new();
    piece.push_plain_text(&mut out);
    assert_eq!(out, OBJECT_REPLACEMENT.to_string());
  }

  #[test]
  fn cache_key_tracks_content_and_attrs() {
    let a = Piece::text("run", AttrSet::new());
    let b = Piece::text("run", AttrSet::new());
    assert_eq!(a.cache_key(), b.cache_key());

    let bold = Piece::text("run", AttrSet::new().with("bold", true));
    assert_ne!(a.cache_key(), bold.cache_key());

    // Distinct attachments never share a key, even with equal payloads.
    let x = Piece::attachment(Attachment::new("image/png", "cat.png"), AttrSet::new());
    let y = Piece::attachment(Attachment::new("image/png", "cat.png"), AttrSet::new());
    assert_ne!(x.cache_key(), y.cache_key());
  }
}
