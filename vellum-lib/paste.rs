//! Paste and drop payload resolution.
//!
//! A paste or drop offers several representations of the same content. The
//! controller commits exactly one atomic edit, chosen by priority:
//! custom fragment > HTML > files > URI > plain text. The core carries no
//! HTML parser, so an HTML representation is only consumed directly when it
//! merely describes an image matching an offered file; otherwise resolution
//! falls through to the next usable representation.

use crate::events::PasteRepresentation;
use vellum_core::{Tendril, block::Block, piece::Attachment};

/// The single payload a paste or drop resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum PastePayload {
  Fragment(Vec<Block>),
  Attachment(Attachment),
  Link { href: Tendril, text: Tendril },
  Text(Tendril),
}

/// Pick the best usable representation; `None` means the paste is ambiguous
/// and, absent a plain-text fallback, a no-op.
pub fn resolve(representations: &[PasteRepresentation]) -> Option<PastePayload> {
  let mut html = None;
  let mut file = None;
  let mut link = None;
  let mut text = None;
  for representation in representations {
    match representation {
      PasteRepresentation::Fragment(blocks) => {
        return Some(PastePayload::Fragment(blocks.clone()));
      },
      PasteRepresentation::Html(markup) => html = html.or(Some(markup)),
      PasteRepresentation::File(attachment) => file = file.or(Some(attachment)),
      PasteRepresentation::Link { href, text: display } => {
        link = link.or(Some((href, display)));
      },
      PasteRepresentation::Text(plain) => text = text.or(Some(plain)),
    }
  }

  if let Some(markup) = html {
    // An image-only fragment duplicating an offered file commits the
    // attachment once, never text plus attachment.
    if let Some(attachment) = file {
      if html_is_image_reference(markup) {
        return Some(PastePayload::Attachment(attachment.clone()));
      }
    }
    // No local HTML conversion; fall through to the next representation.
  }
  if let Some(attachment) = file {
    return Some(PastePayload::Attachment(attachment.clone()));
  }
  if let Some((href, display)) = link {
    return Some(PastePayload::Link {
      href: href.clone(),
      text: display.clone(),
    });
  }
  text.map(|plain| PastePayload::Text(plain.clone()))
}

/// `true` when the markup is a single image tag and nothing else.
fn html_is_image_reference(markup: &str) -> bool {
  let trimmed = markup.trim();
  let lower = trimmed.to_ascii_lowercase();
  lower.starts_with("<img")
    && trimmed.ends_with('>')
    && !trimmed[1..].contains('<')
}

#[cfg(test)]
mod tests {
  use super::*;
  use vellum_core::attributes::AttrSet;

  #[test]
  fn fragment_wins_over_everything() {
    let reps = vec![
      PasteRepresentation::Text("plain".into()),
      PasteRepresentation::Fragment(vec![Block::from_text("rich", AttrSet::new())]),
      PasteRepresentation::File(Attachment::new("image/png", "cat.png")),
    ];
    assert!(matches!(resolve(&reps), Some(PastePayload::Fragment(_))));
  }

  #[test]
  fn image_html_matching_file_yields_one_attachment() {
    let reps = vec![
      PasteRepresentation::Html("<img src=\"cat.png\">".into()),
      PasteRepresentation::File(Attachment::new("image/png", "cat.png")),
    ];
    assert!(matches!(resolve(&reps), Some(PastePayload::Attachment(_))));
  }

  #[test]
  fn rich_html_without_converter_falls_back_to_text() {
    let reps = vec![
      PasteRepresentation::Html("<p>hello <b>world</b></p>".into()),
      PasteRepresentation::Text("hello world".into()),
    ];
    assert_eq!(
      resolve(&reps),
      Some(PastePayload::Text("hello world".into()))
    );
  }

  #[test]
  fn file_beats_link_and_text() {
    let reps = vec![
      PasteRepresentation::Text("cat.png".into()),
      PasteRepresentation::Link {
        href: "https://example.com/cat.png".into(),
        text: "cat.png".into(),
      },
      PasteRepresentation::File(Attachment::new("image/png", "cat.png")),
    ];
    assert!(matches!(resolve(&reps), Some(PastePayload::Attachment(_))));
  }

  #[test]
  fn nothing_usable_is_none() {
    assert_eq!(resolve(&[]), None);
    let reps = vec![PasteRepresentation::Html("<video></video>".into())];
    assert_eq!(resolve(&reps), None);
  }
}
