//! The editing engine: input handling and rendering on top of the
//! [`vellum_core`] document model.
//!
//! The [`controller::InputController`] consumes surface signals (structured
//! input, composition events, raw mutations, pastes) and is the single
//! writer of the document; the [`render::RenderEngine`] turns documents back
//! into node trees with per-object caching. Hosts connect both through the
//! [`surface::Surface`] seam.

pub mod composition;
pub mod controller;
pub mod diagnostics;
pub mod diff;
pub mod events;
pub mod paste;
pub mod render;
pub mod surface;

pub use composition::{Capabilities, InputStrategy};
pub use controller::InputController;
pub use diagnostics::{DiagnosticEvent, Diagnostics, Subscription};
pub use events::{InputKind, PasteRepresentation, RawMutation, StructuredInput};
pub use render::{Node, RenderEngine, Tag};
pub use surface::{InMemorySurface, Surface};
pub use vellum_core::Tendril;
