//! Render-time grouping of adjacent, render-compatible objects.
//!
//! Grouping is a pure function over slices: it finds maximal runs of adjacent
//! items a predicate considers compatible, so the render engine can emit one
//! shared container node per run (one list element for consecutive list
//! items, one styled container for consecutive same-attribute runs) instead
//! of duplicating container markup per child.

use std::ops::Range;

use crate::{block::Block, piece::Piece};

/// Block attributes that pull adjacent blocks into a shared container.
pub const GROUPABLE_BLOCK_ATTRS: &[&str] = &["bullet", "number", "quote"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouped {
  /// A lone item at this index.
  Single(usize),
  /// A maximal run of two or more compatible items.
  Run(Range<usize>),
}

/// Walk `items` and partition them into singles and maximal compatible runs.
pub fn group_adjacent<T>(items: &[T], together: impl Fn(&T, &T) -> bool) -> Vec<Grouped> {
  let mut out = Vec::new();
  let mut start = 0;
  while start < items.len() {
    let mut end = start + 1;
    while end < items.len() && together(&items[end - 1], &items[end]) {
      end += 1;
    }
    if end - start == 1 {
      out.push(Grouped::Single(start));
    } else {
      out.push(Grouped::Run(start..end));
    }
    start = end;
  }
  out
}

/// The groupable block attribute carried by this block, if any.
pub fn groupable_attr(block: &Block) -> Option<&'static str> {
  GROUPABLE_BLOCK_ATTRS
    .iter()
    .copied()
    .find(|name| block.attrs().bool(name))
}

/// Adjacent blocks share a container when they carry the same groupable
/// attribute at the same depth.
pub fn blocks_group_together(a: &Block, b: &Block) -> bool {
  match (groupable_attr(a), groupable_attr(b)) {
    (Some(x), Some(y)) => x == y && a.depth() == b.depth(),
    _ => false,
  }
}

/// Adjacent text pieces share a container when their attribute sets are
/// equal. Attachments never group.
pub fn pieces_group_together(a: &Piece, b: &Piece) -> bool {
  a.is_text() && b.is_text() && a.attrs() == b.attrs()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::attributes::AttrSet;

  fn bullet(text: &str) -> Block {
    Block::from_text(text, AttrSet::new()).with_attrs(AttrSet::new().with("bullet", true))
  }

  fn para(text: &str) -> Block {
    Block::from_text(text, AttrSet::new())
  }

  #[test]
  fn consecutive_list_items_form_one_run() {
    let blocks = vec![para("a"), bullet("b"), bullet("c"), para("d")];
    let grouped = group_adjacent(&blocks, blocks_group_together);
    assert_eq!(grouped, vec![
      Grouped::Single(0),
      Grouped::Run(1..3),
      Grouped::Single(3),
    ]);
  }

  #[test]
  fn depth_breaks_block_runs() {
    let blocks = vec![bullet("a"), bullet("b").with_depth(1)];
    let grouped = group_adjacent(&blocks, blocks_group_together);
    assert_eq!(grouped, vec![Grouped::Single(0), Grouped::Single(1)]);
  }

  #[test]
  fn same_attr_pieces_group() {
    let bold = AttrSet::new().with("bold", true);
    let pieces = vec![
      Piece::text("a", bold.clone()),
      Piece::text("b", bold.clone()),
      Piece::text("c", AttrSet::new()),
    ];
    let grouped = group_adjacent(&pieces, pieces_group_together);
    assert_eq!(grouped, vec![Grouped::Run(0..2), Grouped::Single(2)]);
  }

  #[test]
  fn attachments_never_group() {
    use crate::piece::Attachment;
    let pieces = vec![
      Piece::attachment(Attachment::new("image/png", "a.png"), AttrSet::new()),
      Piece::attachment(Attachment::new("image/png", "b.png"), AttrSet::new()),
    ];
    let grouped = group_adjacent(&pieces, pieces_group_together);
    assert_eq!(grouped, vec![Grouped::Single(0), Grouped::Single(1)]);
  }
}
