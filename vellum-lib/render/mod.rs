//! Rendering the document model back into surface node trees.
//!
//! The engine maps document objects to node trees, memoized per object by
//! content-derived cache key, with invalidation propagating from a changed
//! object up to the root.

pub mod node;
pub mod view;

pub use node::{Node, Tag};
pub use view::{RenderEngine, RenderObject, ViewKey};
