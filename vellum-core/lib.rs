//! The attributed document model.
//!
//! Documents are ordered sequences of blocks holding attributed pieces; all
//! edit operations are pure and return new values sharing untouched
//! substructure. Content-derived [`key::CacheKey`]s and the render-time
//! [`grouping`] predicates are defined here so every layer agrees on what
//! "renders identically" means.

use smartstring::{LazyCompact, SmartString};

pub mod attributes;
pub mod block;
pub mod document;
pub mod grouping;
pub mod key;
pub mod piece;
pub mod range;

pub type Tendril = SmartString<LazyCompact>;
