//! Signals delivered by the surface adapter.

use vellum_core::{Tendril, block::Block, piece::Attachment, range::DocRange};

/// Typed description of an impending edit, as reported by platforms with
/// structured input events (before the default mutation is applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
  InsertText,
  InsertParagraph,
  InsertLineBreak,
  InsertReplacementText,
  InsertCompositionText,
  DeleteCompositionText,
  InsertFromPaste,
  InsertFromDrop,
  DeleteContentBackward,
  DeleteContentForward,
  /// Formatting toggles (`formatBold`, ...) carry the attribute name.
  Format(Tendril),
  /// Anything the controller has no direct mapping for; handled by letting
  /// the default action proceed and reconciling afterwards.
  Unsupported(Tendril),
}

impl InputKind {
  /// Map a platform input-type name onto a kind.
  pub fn parse(name: &str) -> Self {
    match name {
      "insertText" => Self::InsertText,
      "insertParagraph" => Self::InsertParagraph,
      "insertLineBreak" => Self::InsertLineBreak,
      "insertReplacementText" => Self::InsertReplacementText,
      "insertCompositionText" => Self::InsertCompositionText,
      "deleteCompositionText" => Self::DeleteCompositionText,
      "insertFromPaste" => Self::InsertFromPaste,
      "insertFromDrop" => Self::InsertFromDrop,
      "deleteContentBackward" => Self::DeleteContentBackward,
      "deleteContentForward" => Self::DeleteContentForward,
      "formatBold" => Self::Format("bold".into()),
      "formatItalic" => Self::Format("italic".into()),
      "formatStrikeThrough" => Self::Format("strike".into()),
      other => Self::Unsupported(other.into()),
    }
  }
}

/// A structured input event, intercepted ahead of the platform's default
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredInput {
  pub kind:         InputKind,
  pub data:         Option<Tendril>,
  /// Target-range hint for precise offset mapping; falls back to the live
  /// selection when absent.
  pub target_range: Option<DocRange>,
}

impl StructuredInput {
  pub fn new(kind: InputKind) -> Self {
    Self {
      kind,
      data: None,
      target_range: None,
    }
  }

  #[must_use]
  pub fn with_data(mut self, data: impl Into<Tendril>) -> Self {
    self.data = Some(data.into());
    self
  }

  #[must_use]
  pub fn with_target_range(mut self, range: DocRange) -> Self {
    self.target_range = Some(range);
    self
  }
}

/// Notification that the surface changed underneath us. Content is re-read
/// from the surface rather than carried in the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMutation {
  /// `true` when an existing text node's data changed (as opposed to nodes
  /// being added or removed).
  pub character_data: bool,
}

/// One representation offered by a paste or drop.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteRepresentation {
  /// An already-parsed document fragment (the custom exchange format).
  Fragment(Vec<Block>),
  /// Raw HTML markup; conversion is an external collaborator's concern.
  Html(Tendril),
  /// A file payload, offered as an attachment.
  File(Attachment),
  /// A URI with display text.
  Link { href: Tendril, text: Tendril },
  /// Plain text.
  Text(Tendril),
}
