//! The attributed document model.
//!
//! A [`Document`] is an ordered sequence of [`Block`]s and is never empty: at
//! least one block always exists. Every edit operation is pure; it takes
//! `&self` and returns a new `Document` value, sharing untouched blocks via
//! [`Arc`]. Failed operations return an error and produce no new value, so
//! the original document is trivially unchanged.
//!
//! # Offsets
//!
//! All offsets are `char` offsets into the flattened text: each block
//! contributes its own length plus one separator position between blocks.
//! An attachment occupies exactly one position. An offset landing exactly on
//! a block boundary belongs to the end of the earlier block (left bias), and
//! the same tie-break applies at piece boundaries.
//!
//! # Example
//!
//! ```
//! use vellum_core::document::Document;
//!
//! let doc = Document::new();
//! let doc = doc.insert_text(0, "hello", None).unwrap();
//! let doc = doc.insert_block_break(5).unwrap();
//! let doc = doc.insert_text(6, "world", None).unwrap();
//! assert_eq!(doc.plain_text(), "hello\nworld");
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, DocumentError>`]:
//!
//! - **OutOfRange** - an offset or block index beyond the document bounds
//! - **InvalidRange** - a range with `start > end` or bounds exceeded

use std::sync::Arc;

use thiserror::Error;

use crate::{
  attributes::{AttrSet, AttrValue},
  block::Block,
  key::CacheKey,
  piece::{Attachment, Piece},
};

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
  #[error("offset {offset} is out of bounds for length {len}")]
  OutOfRange { offset: usize, len: usize },
  #[error("invalid range {start}..{end} for document length {len}")]
  InvalidRange {
    start: usize,
    end:   usize,
    len:   usize,
  },
}

/// A document offset resolved to a block and a block-local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
  pub block_index: usize,
  pub offset:      usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  blocks: Vec<Arc<Block>>,
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}

impl Document {
  pub fn new() -> Self {
    Self {
      blocks: vec![Arc::new(Block::new())],
    }
  }

  /// Build a document from blocks; an empty iterator still yields a
  /// one-block document.
  pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
    let blocks: Vec<Arc<Block>> = blocks.into_iter().map(Arc::new).collect();
    if blocks.is_empty() {
      return Self::new();
    }
    Self { blocks }
  }

  pub fn from_plain_text(text: &str) -> Self {
    Self::from_blocks(
      text
        .split('\n')
        .map(|line| Block::from_text(line, AttrSet::new())),
    )
  }

  pub fn blocks(&self) -> impl ExactSizeIterator<Item = &Arc<Block>> {
    self.blocks.iter()
  }

  pub fn block_count(&self) -> usize {
    self.blocks.len()
  }

  pub fn block_at(&self, index: usize) -> Option<&Block> {
    self.blocks.get(index).map(Arc::as_ref)
  }

  /// Total length in `char`s of the flattened text, separators included.
  pub fn len_chars(&self) -> usize {
    let content: usize = self.blocks.iter().map(|b| b.len_chars()).sum();
    content + self.blocks.len() - 1
  }

  /// Flattened, lazy, restartable view of every piece in document order.
  pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
    self.blocks.iter().flat_map(|b| b.pieces().iter())
  }

  /// Plain-text projection: blocks joined by `'\n'`, attachments projected
  /// as U+FFFC. Stable; together with [`Self::blocks`] this is sufficient
  /// for an external serializer to round-trip.
  pub fn plain_text(&self) -> String {
    let mut out = String::new();
    for (index, block) in self.blocks.iter().enumerate() {
      if index > 0 {
        out.push('\n');
      }
      out.push_str(&block.text());
    }
    out
  }

  /// Character at a flattened offset; separator positions read as `'\n'`.
  pub fn char_at(&self, at: usize) -> Option<char> {
    let mut rem = at;
    for (index, block) in self.blocks.iter().enumerate() {
      let len = block.len_chars();
      if rem < len {
        return block.text().chars().nth(rem);
      }
      if rem == len {
        return (index + 1 < self.blocks.len()).then_some('\n');
      }
      rem -= len + 1;
    }
    None
  }

  /// Resolve a document offset to a block and local offset. Offsets landing
  /// on a separator resolve to the end of the earlier block.
  pub fn locate(&self, at: usize) -> Result<Location> {
    let mut rem = at;
    for (block_index, block) in self.blocks.iter().enumerate() {
      let len = block.len_chars();
      if rem <= len {
        return Ok(Location {
          block_index,
          offset: rem,
        });
      }
      rem -= len + 1;
    }
    Err(DocumentError::OutOfRange {
      offset: at,
      len:    self.len_chars(),
    })
  }

  /// Inverse of [`Self::locate`].
  pub fn offset_of(&self, location: Location) -> usize {
    let prefix: usize = self.blocks[..location.block_index]
      .iter()
      .map(|b| b.len_chars() + 1)
      .sum();
    prefix + location.offset
  }

  /// Attributes in effect immediately left of a caret, used for insertion
  /// inheritance.
  pub fn attrs_at_caret(&self, at: usize) -> AttrSet {
    match self.locate(at) {
      Ok(location) => self.blocks[location.block_index].attrs_at_caret(location.offset),
      Err(_) => AttrSet::new(),
    }
  }

  /// Insert text at an offset. `None` attributes inherit whatever is in
  /// effect immediately left of the caret. Embedded `'\n'` produce block
  /// breaks.
  pub fn insert_text(&self, at: usize, text: &str, attrs: Option<&AttrSet>) -> Result<Self> {
    let len = self.len_chars();
    if at > len {
      return Err(DocumentError::OutOfRange { offset: at, len });
    }
    if text.is_empty() {
      return Ok(self.clone());
    }
    let attrs = attrs.cloned().unwrap_or_else(|| self.attrs_at_caret(at));
    let location = self.locate(at)?;
    let block = &self.blocks[location.block_index];

    let mut segments = text.split('\n');
    let first = segments.next().unwrap_or("");
    let rest: Vec<&str> = segments.collect();

    let mut blocks = self.blocks.clone();
    if rest.is_empty() {
      let updated = block.insert_piece_at(location.offset, Piece::text(first, attrs));
      blocks[location.block_index] = Arc::new(updated);
      return Ok(Self { blocks });
    }

    // The text spans block breaks: split the target block and thread the
    // segments through fresh sibling blocks carrying its block attributes.
    let (left, right) = block.split_at(location.offset);
    let (last, middles) = rest
      .split_last()
      .expect("rest is non-empty in the multi-segment branch");

    let mut assembled = Vec::with_capacity(rest.len() + 1);
    let mut head = left;
    if !first.is_empty() {
      head = head.insert_piece_at(head.len_chars(), Piece::text(first, attrs.clone()));
    }
    assembled.push(head);
    for segment in middles {
      let mut middle = Block::new()
        .with_attrs(block.attrs().clone())
        .with_depth(block.depth());
      if !segment.is_empty() {
        middle = middle.insert_piece_at(0, Piece::text(*segment, attrs.clone()));
      }
      assembled.push(middle);
    }
    let mut tail = right;
    if !last.is_empty() {
      tail = tail.insert_piece_at(0, Piece::text(*last, attrs.clone()));
    }
    assembled.push(tail);

    let mut blocks = Vec::with_capacity(self.blocks.len() + assembled.len());
    blocks.extend(self.blocks[..location.block_index].iter().cloned());
    blocks.extend(assembled.into_iter().map(Arc::new));
    blocks.extend(self.blocks[location.block_index + 1..].iter().cloned());
    Ok(Self { blocks })
  }

  /// Insert a single indivisible attachment piece.
  pub fn insert_attachment(&self, at: usize, attachment: Attachment, attrs: AttrSet) -> Result<Self> {
    let len = self.len_chars();
    if at > len {
      return Err(DocumentError::OutOfRange { offset: at, len });
    }
    let location = self.locate(at)?;
    let updated =
      self.blocks[location.block_index].insert_piece_at(location.offset, Piece::attachment(attachment, attrs));
    let mut blocks = self.blocks.clone();
    blocks[location.block_index] = Arc::new(updated);
    Ok(Self { blocks })
  }

  /// Remove `[start, end)`. A range spanning a block boundary merges the
  /// surrounding blocks, keeping the attributes of the earlier block.
  pub fn delete_range(&self, start: usize, end: usize) -> Result<Self> {
    let len = self.len_chars();
    if start > end || end > len {
      return Err(DocumentError::InvalidRange { start, end, len });
    }
    if start == end {
      return Ok(self.clone());
    }
    let a = self.locate(start)?;
    let b = self.locate(end)?;

    let mut blocks = Vec::with_capacity(self.blocks.len());
    blocks.extend(self.blocks[..a.block_index].iter().cloned());
    if a.block_index == b.block_index {
      let updated = self.blocks[a.block_index].delete_local_range(a.offset..b.offset);
      blocks.push(Arc::new(updated));
    } else {
      let left_len = self.blocks[a.block_index].len_chars();
      let left = self.blocks[a.block_index].delete_local_range(a.offset..left_len);
      let right = self.blocks[b.block_index].delete_local_range(0..b.offset);
      blocks.push(Arc::new(left.merged(&right)));
    }
    blocks.extend(self.blocks[b.block_index + 1..].iter().cloned());
    Ok(Self { blocks })
  }

  /// Set (`Some`) or clear (`None`) an inline attribute over `[start, end)`,
  /// splitting pieces at the boundaries. A collapsed range leaves the
  /// document unchanged; the caller records it as a pending attribute for
  /// the next insertion instead.
  pub fn apply_text_attribute(
    &self,
    start: usize,
    end: usize,
    name: &str,
    value: Option<AttrValue>,
  ) -> Result<Self> {
    let len = self.len_chars();
    if start > end || end > len {
      return Err(DocumentError::InvalidRange { start, end, len });
    }
    if start == end {
      return Ok(self.clone());
    }
    let a = self.locate(start)?;
    let b = self.locate(end)?;

    let mut blocks = self.blocks.clone();
    for index in a.block_index..=b.block_index {
      let block = &self.blocks[index];
      let local_start = if index == a.block_index { a.offset } else { 0 };
      let local_end = if index == b.block_index {
        b.offset
      } else {
        block.len_chars()
      };
      if local_start < local_end {
        blocks[index] = Arc::new(block.apply_text_attr(local_start..local_end, name, value.as_ref()));
      }
    }
    Ok(Self { blocks })
  }

  /// `true` when every text piece overlapping `[start, end)` carries the
  /// attribute. Attachments are ignored; an empty overlap yields `false`.
  pub fn range_has_text_attribute(&self, start: usize, end: usize, name: &str) -> Result<bool> {
    let len = self.len_chars();
    if start > end || end > len {
      return Err(DocumentError::InvalidRange { start, end, len });
    }
    let mut offset = 0;
    let mut seen = false;
    for block in &self.blocks {
      for piece in block.pieces() {
        let piece_start = offset;
        let piece_end = offset + piece.len_chars();
        offset = piece_end;
        if piece_start >= end || piece_end <= start || !piece.is_text() {
          continue;
        }
        seen = true;
        if !piece.attrs().contains(name) {
          return Ok(false);
        }
      }
      offset += 1; // separator
    }
    Ok(seen)
  }

  pub fn apply_block_attribute(&self, block_index: usize, name: &str, value: Option<AttrValue>) -> Result<Self> {
    let block = self
      .blocks
      .get(block_index)
      .ok_or(DocumentError::OutOfRange {
        offset: block_index,
        len:    self.blocks.len(),
      })?;
    let mut blocks = self.blocks.clone();
    blocks[block_index] = Arc::new(block.apply_block_attr(name, value.as_ref()));
    Ok(Self { blocks })
  }

  pub fn set_block_depth(&self, block_index: usize, depth: u16) -> Result<Self> {
    let block = self
      .blocks
      .get(block_index)
      .ok_or(DocumentError::OutOfRange {
        offset: block_index,
        len:    self.blocks.len(),
      })?;
    let mut blocks = self.blocks.clone();
    blocks[block_index] = Arc::new((**block).clone().with_depth(depth));
    Ok(Self { blocks })
  }

  /// Split the block at `at` into two sibling blocks.
  pub fn insert_block_break(&self, at: usize) -> Result<Self> {
    let len = self.len_chars();
    if at > len {
      return Err(DocumentError::OutOfRange { offset: at, len });
    }
    let location = self.locate(at)?;
    let (left, right) = self.blocks[location.block_index].split_at(location.offset);
    let mut blocks = Vec::with_capacity(self.blocks.len() + 1);
    blocks.extend(self.blocks[..location.block_index].iter().cloned());
    blocks.push(Arc::new(left));
    blocks.push(Arc::new(right));
    blocks.extend(self.blocks[location.block_index + 1..].iter().cloned());
    Ok(Self { blocks })
  }

  /// Root cache key: combines the block keys in order.
  pub fn cache_key(&self) -> CacheKey {
    CacheKey::combine(self.blocks.iter().map(|b| b.cache_key()))
  }
}
