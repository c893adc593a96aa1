//! The view arena and cache.
//!
//! Views are arena-allocated ([`slotmap`]) with non-owning parent handles,
//! so invalidation can walk up to the root without ownership cycles. Each
//! view lazily computes and caches the node tree for one render object; a
//! per-root map keyed by [`CacheKey`] lets structurally identical objects
//! reuse an existing view verbatim. Garbage collection evicts every cache
//! entry not reachable from the current root, bounding the cache to live
//! content.
//!
//! Returned node trees are always clones of the cached templates: callers
//! may mutate or insert them without corrupting the cache.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::render::node::{Node, Tag};
use vellum_core::{
  attributes::AttrSet,
  block::Block,
  document::Document,
  grouping::{self, Grouped},
  key::CacheKey,
  piece::Piece,
};

new_key_type! {
  pub struct ViewKey;
}

/// The closed set of renderable objects.
#[derive(Debug, Clone)]
pub enum RenderObject {
  TextRun(Piece),
  Attachment(Piece),
  Block(Arc<Block>),
  /// Adjacent blocks sharing one container (consecutive list items, ...).
  BlockGroup(Vec<Arc<Block>>),
  /// Adjacent same-attribute text pieces sharing one styled container.
  PieceGroup(Vec<Piece>),
}

impl RenderObject {
  pub fn cache_key(&self) -> CacheKey {
    match self {
      Self::TextRun(piece) | Self::Attachment(piece) => piece.cache_key(),
      Self::Block(block) => block.cache_key(),
      Self::BlockGroup(members) => CacheKey::combine(members.iter().map(|b| b.cache_key())),
      Self::PieceGroup(members) => CacheKey::combine(members.iter().map(|p| p.cache_key())),
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
enum RenderError {
  #[error("render cache entry refers to an evicted view")]
  CacheInconsistency,
}

#[derive(Debug)]
struct View {
  object:   RenderObject,
  parent:   Option<ViewKey>,
  children: Vec<ViewKey>,
  nodes:    Option<Vec<Node>>,
}

#[derive(Debug, Default)]
pub struct RenderEngine {
  views:         SlotMap<ViewKey, View>,
  cache:         HashMap<CacheKey, ViewKey>,
  root_children: Vec<ViewKey>,
  root_nodes:    Option<Vec<Node>>,
  root_key:      Option<CacheKey>,
  rebuilds:      u64,
}

impl RenderEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Render the document, reusing cached views for unchanged objects. Two
  /// renders of an unchanged document return deep-equal trees.
  pub fn render(&mut self, document: &Document) -> Vec<Node> {
    match self.try_render(document) {
      Ok(nodes) => nodes,
      Err(RenderError::CacheInconsistency) => {
        // Fatal to the cache: rebuild the whole root rather than patch.
        tracing::warn!("render cache inconsistent; rebuilding root");
        self.reset();
        self.rebuilds += 1;
        self.try_render(document).unwrap_or_default()
      },
    }
  }

  fn try_render(&mut self, document: &Document) -> Result<Vec<Node>, RenderError> {
    let key = document.cache_key();
    if self.root_key == Some(key) {
      if let Some(nodes) = &self.root_nodes {
        return Ok(nodes.clone());
      }
    }

    self.root_children.clear();
    let blocks: Vec<Arc<Block>> = document.blocks().cloned().collect();
    let grouped = grouping::group_adjacent(&blocks, |a, b| {
      grouping::blocks_group_together(a.as_ref(), b.as_ref())
    });

    let mut nodes = Vec::new();
    for entry in grouped {
      let object = match entry {
        Grouped::Single(index) => RenderObject::Block(blocks[index].clone()),
        Grouped::Run(range) => RenderObject::BlockGroup(blocks[range].to_vec()),
      };
      let (view, view_nodes) = self.find_or_create_child(None, object)?;
      self.root_children.push(view);
      nodes.extend(view_nodes);
    }

    self.root_nodes = Some(nodes.clone());
    self.root_key = Some(key);
    Ok(nodes)
  }

  /// Clear the cached nodes of the view for `key` and of every ancestor up
  /// to the root, so the next root render reflects the change.
  pub fn invalidate(&mut self, key: CacheKey) {
    let Some(&view) = self.cache.get(&key) else {
      return;
    };
    let mut current = Some(view);
    while let Some(handle) = current {
      let Some(view) = self.views.get_mut(handle) else {
        break;
      };
      view.nodes = None;
      view.children.clear();
      current = view.parent;
    }
    self.root_nodes = None;
    self.root_key = None;
  }

  /// Evict every cache entry not reachable from the current root. Returns
  /// the number of evicted entries; a second pass with an unchanged root is
  /// a no-op.
  pub fn garbage_collect(&mut self) -> usize {
    let mut live: HashSet<ViewKey> = HashSet::new();
    let mut stack = self.root_children.clone();
    while let Some(handle) = stack.pop() {
      if live.insert(handle) {
        if let Some(view) = self.views.get(handle) {
          stack.extend(view.children.iter().copied());
        }
      }
    }

    let before = self.cache.len();
    self.cache.retain(|_, handle| live.contains(handle));
    let dead: Vec<ViewKey> = self.views.keys().filter(|k| !live.contains(k)).collect();
    for handle in dead {
      self.views.remove(handle);
    }
    before - self.cache.len()
  }

  /// External-interface variant: evict entries whose key is absent from an
  /// explicitly supplied live set.
  pub fn garbage_collect_with(&mut self, live: &HashSet<CacheKey>) -> usize {
    let before = self.cache.len();
    let dead_views: Vec<ViewKey> = self
      .cache
      .iter()
      .filter(|(key, _)| !live.contains(*key))
      .map(|(_, handle)| *handle)
      .collect();
    self.cache.retain(|key, _| live.contains(key));
    for handle in dead_views {
      self.views.remove(handle);
    }
    before - self.cache.len()
  }

  pub fn cache_len(&self) -> usize {
    self.cache.len()
  }

  pub fn contains(&self, key: CacheKey) -> bool {
    self.cache.contains_key(&key)
  }

  /// Times the root was rebuilt after a detected cache inconsistency.
  pub fn rebuilds(&self) -> u64 {
    self.rebuilds
  }

  fn reset(&mut self) {
    self.views.clear();
    self.cache.clear();
    self.root_children.clear();
    self.root_nodes = None;
    self.root_key = None;
  }

  /// Return an existing view verbatim when a semantically identical object
  /// is cached; otherwise create, register and compute one.
  fn find_or_create_child(
    &mut self,
    parent: Option<ViewKey>,
    object: RenderObject,
  ) -> Result<(ViewKey, Vec<Node>), RenderError> {
    let key = object.cache_key();
    if let Some(&existing) = self.cache.get(&key) {
      if !self.views.contains_key(existing) {
        return Err(RenderError::CacheInconsistency);
      }
      self.views[existing].parent = parent;
      if let Some(nodes) = self.views[existing].nodes.clone() {
        return Ok((existing, nodes));
      }
      let nodes = self.compute_nodes(existing)?;
      self.views[existing].nodes = Some(nodes.clone());
      return Ok((existing, nodes));
    }

    let view = self.views.insert(View {
      object,
      parent,
      children: Vec::new(),
      nodes: None,
    });
    self.cache.insert(key, view);
    let nodes = self.compute_nodes(view)?;
    self.views[view].nodes = Some(nodes.clone());
    Ok((view, nodes))
  }

  fn compute_nodes(&mut self, view: ViewKey) -> Result<Vec<Node>, RenderError> {
    self.views[view].children.clear();
    let object = self.views[view].object.clone();
    match object {
      RenderObject::TextRun(piece) => {
        let text = piece.as_text().unwrap_or_default();
        Ok(vec![Node::text(text)])
      },
      RenderObject::Attachment(piece) => {
        let payload = piece
          .as_attachment()
          .map(|a| a.payload().to_string())
          .unwrap_or_default();
        Ok(vec![
          Node::element(Tag::AttachmentBox)
            .with_attrs(piece.attrs().clone())
            .with_children(vec![Node::text(payload)]),
        ])
      },
      RenderObject::Block(block) => {
        let children = self.block_children(view, &block)?;
        Ok(vec![
          Node::element(block_tag(&block))
            .with_attrs(container_attrs(block.attrs().clone(), block.depth()))
            .with_children(children),
        ])
      },
      RenderObject::BlockGroup(members) => {
        let first = members.first().expect("groups are never empty");
        let tag = match grouping::groupable_attr(first) {
          Some("quote") => Tag::Quote,
          _ => Tag::List,
        };
        let depth = first.depth();
        let mut children = Vec::new();
        for member in members {
          let (child, nodes) = self.find_or_create_child(Some(view), RenderObject::Block(member))?;
          self.views[view].children.push(child);
          children.extend(nodes);
        }
        Ok(vec![
          Node::element(tag)
            .with_attrs(container_attrs(AttrSet::new(), depth))
            .with_children(children),
        ])
      },
      RenderObject::PieceGroup(members) => {
        let attrs = members
          .first()
          .map(|p| p.attrs().clone())
          .unwrap_or_default();
        let mut children = Vec::new();
        for member in members {
          let (child, nodes) = self.find_or_create_child(Some(view), RenderObject::TextRun(member))?;
          self.views[view].children.push(child);
          children.extend(nodes);
        }
        Ok(vec![
          Node::element(Tag::Run)
            .with_attrs(attrs)
            .with_children(children),
        ])
      },
    }
  }

  fn block_children(&mut self, view: ViewKey, block: &Block) -> Result<Vec<Node>, RenderError> {
    let pieces = block.pieces();
    let grouped = grouping::group_adjacent(pieces, |a, b| grouping::pieces_group_together(a, b));
    let mut nodes = Vec::new();
    for entry in grouped {
      let object = match entry {
        Grouped::Single(index) if pieces[index].is_attachment() => {
          RenderObject::Attachment(pieces[index].clone())
        },
        Grouped::Single(index) if pieces[index].attrs().is_empty() => {
          RenderObject::TextRun(pieces[index].clone())
        },
        Grouped::Single(index) => RenderObject::PieceGroup(vec![pieces[index].clone()]),
        Grouped::Run(range) => RenderObject::PieceGroup(pieces[range].to_vec()),
      };
      let (child, child_nodes) = self.find_or_create_child(Some(view), object)?;
      self.views[view].children.push(child);
      nodes.extend(child_nodes);
    }
    Ok(nodes)
  }

  #[cfg(test)]
  fn corrupt_entry(&mut self, key: CacheKey) {
    if let Some(&handle) = self.cache.get(&key) {
      self.views.remove(handle);
    }
  }
}

fn block_tag(block: &Block) -> Tag {
  match grouping::groupable_attr(block) {
    Some("quote") => Tag::Quote,
    Some(_) => Tag::ListItem,
    None => Tag::Block,
  }
}

fn container_attrs(mut attrs: AttrSet, depth: u16) -> AttrSet {
  if depth > 0 {
    attrs.set("depth", i64::from(depth));
  }
  attrs
}
