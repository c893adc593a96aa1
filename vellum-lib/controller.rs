//! The composition/input controller.
//!
//! Turns ambiguous, asynchronous platform signals into well-ordered document
//! edits. The controller is the single writer of the document: every signal
//! is handled to completion, and every handler leaves the document, the
//! render cache and the surface mutually consistent before returning.
//!
//! Two mutually exclusive strategies are selected once per session:
//!
//! - **Mutation observation** - the platform applies its default action
//!   first and the controller reconciles afterwards, diffing a snapshot
//!   against the current surface text into a single replacement.
//! - **Native events** - structured input events arrive ahead of the default
//!   mutation; the controller applies the equivalent edit directly and
//!   suppresses the default. Unsupported event types fall back to the
//!   mutation-observation diff for that one event.
//!
//! An active composition buffers everything: surface mutations, typed text
//! and backspaces act on the composed surface buffer only, and the session
//! commits as one replacement when the composition ends. A canceled or
//! mismatched composition discards the buffer and re-presents the unchanged
//! document to restore surface fidelity.

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::{
  composition::{Capabilities, CompositionSession, InputStrategy},
  diagnostics::{DiagnosticEvent, Diagnostics},
  diff::{self, TextDelta},
  events::{InputKind, PasteRepresentation, RawMutation, StructuredInput},
  paste::{self, PastePayload},
  render::RenderEngine,
  surface::Surface,
};
use vellum_core::{
  Tendril,
  attributes::{AttrSet, AttrValue},
  block::Block,
  document::{self, Document},
  piece::PieceContent,
  range::DocRange,
};

/// Frames to wait before reading surface state back after a default action
/// was allowed to proceed, so the platform has applied it.
const RECONCILE_DELAY_FRAMES: u8 = 2;

enum State {
  Idle,
  Composing(CompositionSession),
}

pub struct InputController<S: Surface> {
  surface:           S,
  document:          Document,
  selection:         DocRange,
  strategy:          InputStrategy,
  state:             State,
  /// Attributes toggled at a collapsed caret, applied to the next insertion
  /// instead of mutating existing content. Cleared when the caret moves.
  pending_attrs:     SmallVec<[(Tendril, Option<AttrValue>); 2]>,
  /// Countdown to a deferred diff-and-commit; at most one outstanding.
  pending_reconcile: Option<u8>,
  renderer:          RenderEngine,
  diagnostics:       Diagnostics,
  last_rebuilds:     u64,
}

impl<S: Surface> InputController<S> {
  pub fn new(surface: S, capabilities: Capabilities) -> Self {
    Self::with_diagnostics(surface, capabilities, Diagnostics::new())
  }

  pub fn with_diagnostics(surface: S, capabilities: Capabilities, diagnostics: Diagnostics) -> Self {
    let selection = surface.selection();
    Self {
      surface,
      document: Document::new(),
      selection,
      strategy: InputStrategy::detect(&capabilities),
      state: State::Idle,
      pending_attrs: SmallVec::new(),
      pending_reconcile: None,
      renderer: RenderEngine::new(),
      diagnostics,
      last_rebuilds: 0,
    }
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  pub fn plain_text(&self) -> String {
    self.document.plain_text()
  }

  pub fn selection(&self) -> DocRange {
    self.selection
  }

  pub fn strategy(&self) -> InputStrategy {
    self.strategy
  }

  pub fn surface(&self) -> &S {
    &self.surface
  }

  pub fn surface_mut(&mut self) -> &mut S {
    &mut self.surface
  }

  pub fn diagnostics(&self) -> &Diagnostics {
    &self.diagnostics
  }

  /// Replace the document wholesale (programmatic load). Abandons any active
  /// composition.
  pub fn load_document(&mut self, document: Document) {
    if matches!(self.state, State::Composing(_)) {
      self.protocol_violation("document replaced during an active composition");
      self.state = State::Idle;
    }
    self.document = document;
    self.selection = DocRange::point(0);
    self.pending_attrs.clear();
    self.refresh();
  }

  pub fn selection_changed(&mut self, range: DocRange) {
    let range = range.clamped(self.document.len_chars());
    if range != self.selection {
      self.pending_attrs.clear();
    }
    self.selection = range;
  }

  pub fn composition_start(&mut self) {
    if matches!(self.state, State::Composing(_)) {
      // Implicit forced end-then-restart.
      self.protocol_violation("composition started while one is active");
      self.finish_composition(None);
    }
    let anchor = self.selection.start;
    trace!(anchor, "composition started");
    let snapshot = self.document.plain_text();
    self.state = State::Composing(CompositionSession::new(anchor, snapshot));
  }

  pub fn composition_update(&mut self, data: &str) {
    match &mut self.state {
      State::Composing(session) => {
        if !session.update(data) {
          trace!("equal-data composition update ignored");
        }
      },
      State::Idle => {
        self.protocol_violation("composition update without a session");
        self.composition_start();
        if let State::Composing(session) = &mut self.state {
          session.update(data);
        }
      },
    }
  }

  pub fn composition_end(&mut self, data: &str) {
    if matches!(self.state, State::Idle) {
      // A spurious end with no matching start: discard and re-present the
      // unmodified document so the surface stays faithful.
      self.protocol_violation("composition end without a matching start");
      self.refresh();
      return;
    }
    self.finish_composition(Some(data));
  }

  /// A structured input event, intercepted ahead of the platform's default
  /// mutation.
  pub fn structured_input(&mut self, input: StructuredInput) {
    if self.strategy == InputStrategy::MutationObservation {
      trace!("structured input ignored under mutation observation");
      return;
    }
    if matches!(self.state, State::Composing(_)) {
      self.composing_input(input);
      return;
    }

    match input.kind {
      InputKind::InsertText | InputKind::InsertReplacementText | InputKind::InsertCompositionText => {
        let Some(data) = input.data else {
          trace!("insert event without data");
          return;
        };
        let target = input.target_range.unwrap_or(self.selection);
        self.surface.suppress_default();
        if let Err(err) = self.try_replace_range(target, &data) {
          self.reject(err);
        }
      },
      InputKind::InsertParagraph | InputKind::InsertLineBreak => {
        self.surface.suppress_default();
        if let Err(err) = self.try_structural_break() {
          self.reject(err);
        }
      },
      InputKind::DeleteContentBackward => {
        let target = input.target_range.unwrap_or_else(|| {
          if self.selection.is_collapsed() {
            DocRange::new(self.selection.start.saturating_sub(1), self.selection.start)
          } else {
            self.selection
          }
        });
        self.surface.suppress_default();
        if let Err(err) = self.try_delete(target) {
          self.reject(err);
        }
      },
      InputKind::DeleteContentForward => {
        let len = self.document.len_chars();
        let target = input.target_range.unwrap_or_else(|| {
          if self.selection.is_collapsed() {
            DocRange::new(self.selection.start, (self.selection.start + 1).min(len))
          } else {
            self.selection
          }
        });
        self.surface.suppress_default();
        if let Err(err) = self.try_delete(target) {
          self.reject(err);
        }
      },
      InputKind::InsertFromPaste | InputKind::InsertFromDrop => {
        // The representations arrive through the paste/drop signal; here we
        // only claim the event so the platform does not insert on its own.
        self.surface.suppress_default();
      },
      InputKind::Format(name) => {
        self.surface.suppress_default();
        self.toggle_format(&name);
      },
      InputKind::DeleteCompositionText => {
        trace!("composition delete outside a session ignored");
      },
      InputKind::Unsupported(name) => {
        debug!(%name, "unsupported input type; reconciling after the default action");
        self.pending_reconcile = Some(RECONCILE_DELAY_FRAMES);
      },
    }
  }

  /// Advance one rendering frame. Deferred reconciliation (scheduled when a
  /// default action was allowed to proceed) fires after the delay elapses.
  pub fn frame(&mut self) {
    let Some(frames) = self.pending_reconcile else {
      return;
    };
    if frames > 1 {
      self.pending_reconcile = Some(frames - 1);
      return;
    }
    self.pending_reconcile = None;
    self.reconcile();
  }

  /// Surface changed underneath us. Buffered while composing; otherwise the
  /// net change is diffed into a single replacement and committed.
  pub fn raw_mutation(&mut self, mutation: RawMutation) {
    if matches!(self.state, State::Composing(_)) {
      trace!(
        character_data = mutation.character_data,
        "mutation buffered during composition"
      );
      return;
    }
    self.pending_reconcile = None;
    self.reconcile();
  }

  /// Diff the surface text against the document and commit the net change
  /// as a single replacement.
  fn reconcile(&mut self) {
    let current = self.surface.text();
    match diff::text_delta(&self.document.plain_text(), &current) {
      Some(delta) => {
        if let Err(err) = self.try_commit_delta(delta) {
          self.reject(err);
        }
      },
      None => trace!("no net change to reconcile"),
    }
  }

  /// Resolve one payload from the offered representations and commit it as a
  /// single atomic edit at the selection.
  pub fn paste_or_drop(&mut self, representations: &[PasteRepresentation]) {
    let Some(payload) = paste::resolve(representations) else {
      debug!("no usable paste representation");
      self.diagnostics.emit(DiagnosticEvent::AmbiguousPasteData);
      return;
    };
    self.surface.suppress_default();
    if let Err(err) = self.try_commit_paste(payload) {
      self.reject(err);
    }
  }

  fn composing_input(&mut self, input: StructuredInput) {
    // The session extends rather than forking: typed text and backspaces act
    // on the composed surface buffer, committed as one diff at the end.
    match input.kind {
      InputKind::InsertText | InputKind::InsertCompositionText => {
        if let (State::Composing(session), Some(data)) = (&mut self.state, input.data.as_deref()) {
          session.update(data);
        }
      },
      InputKind::DeleteContentBackward
      | InputKind::DeleteContentForward
      | InputKind::DeleteCompositionText => {
        trace!("delete buffered during composition");
      },
      InputKind::Format(name) => {
        self.surface.suppress_default();
        self.toggle_format(&name);
      },
      other => {
        trace!(?other, "input deferred during composition");
      },
    }
  }

  fn finish_composition(&mut self, data: Option<&str>) {
    let State::Composing(mut session) = std::mem::replace(&mut self.state, State::Idle) else {
      return;
    };
    if data.is_some_and(str::is_empty) {
      session.cancel();
    }
    if session.is_canceled() {
      debug!("composition canceled; discarding buffered state");
      self.refresh();
      return;
    }
    let current = self.surface.text();
    match diff::text_delta(session.snapshot(), &current) {
      Some(delta) => {
        trace!(
          anchor = session.anchor(),
          sequence = session.sequence(),
          "committing composition"
        );
        if let Err(err) = self.try_commit_delta(delta) {
          self.reject(err);
        }
      },
      None => trace!("composition ended without a net change"),
    }
  }

  fn try_replace_range(&mut self, target: DocRange, text: &str) -> document::Result<()> {
    let mut doc = self.document.clone();
    if !target.is_collapsed() {
      doc = doc.delete_range(target.start, target.end)?;
    }
    let attrs = self.insertion_attrs(&doc, target.start);
    doc = doc.insert_text(target.start, text, attrs.as_ref())?;
    self.document = doc;
    self.selection = DocRange::point(target.start + text.chars().count());
    self.refresh();
    Ok(())
  }

  fn try_commit_delta(&mut self, delta: TextDelta) -> document::Result<()> {
    let mut doc = self.document.delete_range(delta.at, delta.at + delta.deleted)?;
    if !delta.inserted.is_empty() {
      let attrs = self.insertion_attrs(&doc, delta.at);
      doc = doc.insert_text(delta.at, &delta.inserted, attrs.as_ref())?;
    }
    self.document = doc;
    self.selection = DocRange::point(delta.at + delta.inserted_chars());
    self.refresh();
    Ok(())
  }

  fn try_delete(&mut self, target: DocRange) -> document::Result<()> {
    let target = target.clamped(self.document.len_chars());
    if target.is_collapsed() {
      return Ok(());
    }
    self.document = self.document.delete_range(target.start, target.end)?;
    self.selection = DocRange::point(target.start);
    self.refresh();
    Ok(())
  }

  fn try_structural_break(&mut self) -> document::Result<()> {
    let target = self.selection;
    let mut doc = self.document.clone();
    if !target.is_collapsed() {
      doc = doc.delete_range(target.start, target.end)?;
    }
    doc = doc.insert_block_break(target.start)?;
    self.document = doc;
    self.selection = DocRange::point(target.start + 1);
    self.refresh();
    Ok(())
  }

  fn try_commit_paste(&mut self, payload: PastePayload) -> document::Result<()> {
    let target = self.selection;
    let mut doc = self.document.clone();
    if !target.is_collapsed() {
      doc = doc.delete_range(target.start, target.end)?;
    }
    let at = target.start;
    let caret = match payload {
      PastePayload::Text(text) => {
        doc = doc.insert_text(at, &text, None)?;
        at + text.chars().count()
      },
      PastePayload::Link { href, text } => {
        let attrs = AttrSet::new().with("href", href.as_str());
        doc = doc.insert_text(at, &text, Some(&attrs))?;
        at + text.chars().count()
      },
      PastePayload::Attachment(attachment) => {
        doc = doc.insert_attachment(at, attachment, AttrSet::new())?;
        at + 1
      },
      PastePayload::Fragment(blocks) => {
        let (spliced, caret) = insert_fragment(&doc, at, &blocks)?;
        doc = spliced;
        caret
      },
    };
    self.document = doc;
    self.selection = DocRange::point(caret);
    self.refresh();
    Ok(())
  }

  fn toggle_format(&mut self, name: &str) {
    let target = self.selection;
    if target.is_collapsed() {
      let active = match self.pending_attrs.iter().find(|(n, _)| n.as_str() == name) {
        Some((_, value)) => value.is_some(),
        None => self.document.attrs_at_caret(target.start).contains(name),
      };
      let value = if active { None } else { Some(AttrValue::Bool(true)) };
      self.set_pending(name, value);
      return;
    }
    match self
      .document
      .range_has_text_attribute(target.start, target.end, name)
    {
      Ok(active) => {
        let value = if active { None } else { Some(AttrValue::Bool(true)) };
        match self
          .document
          .apply_text_attribute(target.start, target.end, name, value)
        {
          Ok(doc) => {
            self.document = doc;
            self.refresh();
          },
          Err(err) => self.reject(err),
        }
      },
      Err(err) => self.reject(err),
    }
  }

  fn set_pending(&mut self, name: &str, value: Option<AttrValue>) {
    match self.pending_attrs.iter_mut().find(|(n, _)| n.as_str() == name) {
      Some(entry) => entry.1 = value,
      None => self.pending_attrs.push((name.into(), value)),
    }
  }

  /// Attributes for an insertion at `at`: the caret-inherited set with any
  /// pending toggles applied. `None` when nothing is pending, so the model's
  /// own inheritance runs.
  fn insertion_attrs(&self, doc: &Document, at: usize) -> Option<AttrSet> {
    if self.pending_attrs.is_empty() {
      return None;
    }
    let mut attrs = doc.attrs_at_caret(at);
    for (name, value) in &self.pending_attrs {
      match value {
        Some(value) => attrs.set(name.clone(), value.clone()),
        None => {
          attrs.remove(name);
        },
      }
    }
    Some(attrs)
  }

  /// Render, hand the trees to the surface and collect garbage, so the cache
  /// is bounded to live content after every edit.
  fn refresh(&mut self) {
    let nodes = self.renderer.render(&self.document);
    self.surface.present(nodes);
    self.renderer.garbage_collect();
    if self.renderer.rebuilds() > self.last_rebuilds {
      self.last_rebuilds = self.renderer.rebuilds();
      self.diagnostics.emit(DiagnosticEvent::CacheRebuilt);
    }
  }

  fn protocol_violation(&mut self, detail: &str) {
    warn!(detail, "composition protocol violation");
    self
      .diagnostics
      .emit(DiagnosticEvent::CompositionProtocolViolation {
        detail: detail.into(),
      });
  }

  fn reject(&mut self, err: document::DocumentError) {
    warn!(%err, "edit rejected; document unchanged");
    self.diagnostics.emit(DiagnosticEvent::EditRejected {
      reason: err.to_string().into(),
    });
  }
}

/// Splice a block fragment in at `at`, carrying each fragment block's
/// attributes and depth onto the blocks it creates. Returns the document and
/// the caret position after the fragment.
fn insert_fragment(doc: &Document, at: usize, blocks: &[Block]) -> document::Result<(Document, usize)> {
  let mut doc = doc.clone();
  let mut at = at;
  for (index, block) in blocks.iter().enumerate() {
    if index > 0 {
      doc = doc.insert_block_break(at)?;
      at += 1;
      let location = doc.locate(at)?;
      for (name, value) in block.attrs().iter() {
        doc = doc.apply_block_attribute(location.block_index, name, Some(value.clone()))?;
      }
      if block.depth() > 0 {
        doc = doc.set_block_depth(location.block_index, block.depth())?;
      }
    }
    for piece in block.pieces() {
      match piece.content() {
        PieceContent::Text(text) => {
          doc = doc.insert_text(at, text, Some(piece.attrs()))?;
          at += text.chars().count();
        },
        PieceContent::Attachment(attachment) => {
          doc = doc.insert_attachment(at, attachment.clone(), piece.attrs().clone())?;
          at += 1;
        },
      }
    }
  }
  Ok((doc, at))
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::surface::InMemorySurface;
  use vellum_core::piece::Attachment;

  fn controller() -> InputController<InMemorySurface> {
    InputController::new(InMemorySurface::new(), Capabilities {
      structured_input_events: true,
    })
  }

  fn type_text(c: &mut InputController<InMemorySurface>, text: &str) {
    c.structured_input(StructuredInput::new(InputKind::InsertText).with_data(text));
  }

  #[test]
  fn composing_on_an_empty_document() {
    let mut c = controller();
    c.composition_start();
    c.surface_mut().set_text("a");
    c.composition_update("a");
    c.surface_mut().set_text("ab");
    c.composition_update("ab");
    c.surface_mut().set_text("abc");
    c.composition_end("abc");
    assert_eq!(c.plain_text(), "abc");
    assert_eq!(c.selection(), DocRange::point(3));
  }

  #[test]
  fn typing_interleaved_with_composition() {
    let mut c = controller();
    type_text(&mut c, "a");
    assert_eq!(c.plain_text(), "a");

    c.composition_start();
    c.surface_mut().set_text("ab");
    c.composition_update("b");
    c.surface_mut().set_text("abc");
    c.composition_update("bc");
    c.surface_mut().set_text("abcd");
    c.composition_end("bcd");

    type_text(&mut c, "e");
    assert_eq!(c.plain_text(), "abcde");
  }

  #[test]
  fn formatting_carries_through_composition() {
    let mut c = controller();
    type_text(&mut c, "abc");
    c.structured_input(StructuredInput::new(InputKind::Format("bold".into())));

    c.composition_start();
    c.surface_mut().set_text("abcd");
    c.composition_update("d");
    c.surface_mut().set_text("abcde");
    c.composition_update("de");
    c.surface_mut().set_text("abcdef");
    c.composition_end("def");

    assert_eq!(c.plain_text(), "abcdef");
    let doc = c.document();
    assert!(doc.range_has_text_attribute(3, 6, "bold").unwrap());
    assert!(!doc.range_has_text_attribute(0, 3, "bold").unwrap());
  }

  #[test]
  fn spurious_composition_end_does_not_corrupt_structure() {
    let diagnostics = Diagnostics::new();
    let violations = Rc::new(RefCell::new(0));
    let sink = violations.clone();
    let _sub = diagnostics.subscribe(move |event| {
      if matches!(event, DiagnosticEvent::CompositionProtocolViolation { .. }) {
        *sink.borrow_mut() += 1;
      }
    });
    let mut c = InputController::with_diagnostics(
      InMemorySurface::new(),
      Capabilities {
        structured_input_events: true,
      },
      diagnostics,
    );
    type_text(&mut c, "ab");

    // End with no matching start: discarded, document untouched.
    c.composition_end("ab");
    assert_eq!(*violations.borrow(), 1);
    assert_eq!(c.plain_text(), "ab");

    c.structured_input(StructuredInput::new(InputKind::InsertParagraph));
    c.structured_input(StructuredInput::new(InputKind::InsertParagraph));
    assert_eq!(c.plain_text(), "ab\n\n");
    assert_eq!(c.document().block_count(), 3);
  }

  #[test]
  fn image_paste_commits_exactly_one_attachment() {
    let mut c = controller();
    c.paste_or_drop(&[
      PasteRepresentation::Html("<img src=\"cat.png\">".into()),
      PasteRepresentation::File(Attachment::new("image/png", "cat.png")),
    ]);
    let doc = c.document();
    assert_eq!(doc.pieces().filter(|p| p.is_attachment()).count(), 1);
    assert_eq!(doc.plain_text(), "\u{FFFC}");
  }

  #[test]
  fn backspacing_through_a_composition_hits_the_buffer() {
    let mut c = controller();
    c.composition_start();
    c.surface_mut().set_text("ab");
    c.composition_update("ab");
    // Backspace acts on the composed surface text, not the document.
    c.surface_mut().set_selection(DocRange::point(2));
    c.structured_input(StructuredInput::new(InputKind::DeleteContentBackward));
    c.surface_mut().backspace();
    assert_eq!(c.plain_text(), "");

    c.composition_end("a");
    assert_eq!(c.plain_text(), "a");
  }

  #[test]
  fn typing_during_composition_extends_the_session() {
    let mut c = controller();
    c.composition_start();
    c.surface_mut().set_text("b");
    c.composition_update("b");
    // A plain keystroke mid-session concatenates into the composed buffer.
    c.surface_mut().set_selection(DocRange::point(1));
    c.surface_mut().type_text("o");
    c.structured_input(StructuredInput::new(InputKind::InsertText).with_data("o"));
    assert_eq!(c.plain_text(), "");

    c.composition_end("bo");
    assert_eq!(c.plain_text(), "bo");
  }

  #[test]
  fn equal_data_updates_commit_once() {
    let mut c = controller();
    c.composition_start();
    c.surface_mut().set_text("a");
    c.composition_update("a");
    // Cursor movement re-reports the same data.
    c.composition_update("a");
    c.composition_end("a");
    assert_eq!(c.plain_text(), "a");
  }

  #[test]
  fn overlapping_start_forces_end_then_restart() {
    let mut c = controller();
    c.composition_start();
    c.surface_mut().set_text("ab");
    c.composition_update("ab");
    // A second start commits the first session before opening a new one.
    c.composition_start();
    assert_eq!(c.plain_text(), "ab");
    c.surface_mut().set_text("abc");
    c.composition_end("c");
    assert_eq!(c.plain_text(), "abc");
  }

  #[test]
  fn mutation_observation_reconciles_by_diffing() {
    let mut c = InputController::new(InMemorySurface::new(), Capabilities::default());
    assert_eq!(c.strategy(), InputStrategy::MutationObservation);

    c.surface_mut().type_text("hello");
    c.raw_mutation(RawMutation {
      character_data: true,
    });
    assert_eq!(c.plain_text(), "hello");

    // Structured events are not this strategy's input path.
    type_text(&mut c, "x");
    assert_eq!(c.plain_text(), "hello");
  }

  #[test]
  fn unsupported_input_falls_back_to_reconciliation() {
    let mut c = controller();
    type_text(&mut c, "teh");
    c.surface_mut().take_suppressed();
    c.surface_mut().set_selection(DocRange::point(3));

    c.structured_input(StructuredInput::new(InputKind::Unsupported("insertAutocorrect".into())));
    assert!(!c.surface_mut().take_suppressed());

    // The default action ran; the follow-up mutation signal reconciles.
    c.surface_mut().set_text("the");
    c.raw_mutation(RawMutation::default());
    assert_eq!(c.plain_text(), "the");
  }

  #[test]
  fn structured_inserts_suppress_the_default() {
    let mut c = controller();
    type_text(&mut c, "a");
    assert!(c.surface_mut().take_suppressed());
  }

  #[test]
  fn replacement_uses_the_target_range_hint() {
    let mut c = controller();
    type_text(&mut c, "teh cat");
    c.structured_input(
      StructuredInput::new(InputKind::InsertReplacementText)
        .with_data("the")
        .with_target_range(DocRange::new(0, 3)),
    );
    assert_eq!(c.plain_text(), "the cat");
  }

  #[test]
  fn rejected_edits_leave_the_document_unchanged() {
    let diagnostics = Diagnostics::new();
    let rejections = Rc::new(RefCell::new(0));
    let sink = rejections.clone();
    let _sub = diagnostics.subscribe(move |event| {
      if matches!(event, DiagnosticEvent::EditRejected { .. }) {
        *sink.borrow_mut() += 1;
      }
    });
    let mut c = InputController::with_diagnostics(
      InMemorySurface::new(),
      Capabilities {
        structured_input_events: true,
      },
      diagnostics,
    );
    type_text(&mut c, "ab");
    c.structured_input(
      StructuredInput::new(InputKind::InsertReplacementText)
        .with_data("x")
        .with_target_range(DocRange::new(5, 9)),
    );
    assert_eq!(*rejections.borrow(), 1);
    assert_eq!(c.plain_text(), "ab");
  }

  #[test]
  fn ambiguous_paste_is_a_no_op() {
    let diagnostics = Diagnostics::new();
    let seen = Rc::new(RefCell::new(false));
    let sink = seen.clone();
    let _sub = diagnostics.subscribe(move |event| {
      if matches!(event, DiagnosticEvent::AmbiguousPasteData) {
        *sink.borrow_mut() = true;
      }
    });
    let mut c = InputController::with_diagnostics(
      InMemorySurface::new(),
      Capabilities {
        structured_input_events: true,
      },
      diagnostics,
    );
    c.paste_or_drop(&[PasteRepresentation::Html("<video></video>".into())]);
    assert!(*seen.borrow());
    assert_eq!(c.plain_text(), "");
  }

  #[test]
  fn fragment_paste_is_one_atomic_edit() {
    let mut c = controller();
    type_text(&mut c, "xy");
    c.selection_changed(DocRange::point(1));

    let quote = Block::from_text("quoted", AttrSet::new())
      .with_attrs(AttrSet::new().with("quote", true));
    c.paste_or_drop(&[PasteRepresentation::Fragment(vec![
      Block::from_text("first", AttrSet::new()),
      quote,
    ])]);

    assert_eq!(c.plain_text(), "xfirst\nquotedy");
    assert!(c.document().block_at(1).unwrap().attrs().bool("quote"));
  }

  #[test]
  fn link_paste_carries_the_href_attribute() {
    let mut c = controller();
    c.paste_or_drop(&[PasteRepresentation::Link {
      href: "https://example.com".into(),
      text: "example".into(),
    }]);
    assert_eq!(c.plain_text(), "example");
    let piece = c.document().pieces().next().unwrap();
    assert_eq!(
      piece.attrs().get("href").and_then(AttrValue::as_str),
      Some("https://example.com")
    );
  }

  #[test]
  fn toggling_over_a_selection_applies_and_clears() {
    let mut c = controller();
    type_text(&mut c, "abcdef");
    c.selection_changed(DocRange::new(1, 4));
    c.structured_input(StructuredInput::new(InputKind::Format("bold".into())));
    assert!(c.document().range_has_text_attribute(1, 4, "bold").unwrap());

    c.structured_input(StructuredInput::new(InputKind::Format("bold".into())));
    assert!(!c.document().range_has_text_attribute(1, 4, "bold").unwrap());
    assert_eq!(c.plain_text(), "abcdef");
  }

  #[test]
  fn pending_attributes_clear_when_the_caret_moves() {
    let mut c = controller();
    type_text(&mut c, "ab");
    c.structured_input(StructuredInput::new(InputKind::Format("bold".into())));
    c.selection_changed(DocRange::point(1));
    type_text(&mut c, "x");
    assert_eq!(c.plain_text(), "axb");
    assert!(!c.document().range_has_text_attribute(1, 2, "bold").unwrap());
  }

  #[test]
  fn double_toggle_at_a_caret_cancels_out() {
    let mut c = controller();
    type_text(&mut c, "a");
    c.structured_input(StructuredInput::new(InputKind::Format("bold".into())));
    c.structured_input(StructuredInput::new(InputKind::Format("bold".into())));
    type_text(&mut c, "b");
    assert!(!c.document().range_has_text_attribute(1, 2, "bold").unwrap());
  }

  #[test]
  fn loading_a_document_abandons_a_composition() {
    let mut c = controller();
    c.composition_start();
    c.surface_mut().set_text("zzz");
    c.composition_update("zzz");

    c.load_document(Document::from_plain_text("fresh"));
    assert_eq!(c.plain_text(), "fresh");

    // The old session is gone; a late end is a recovered violation.
    c.composition_end("zzz");
    assert_eq!(c.plain_text(), "fresh");
  }

  #[test]
  fn canceled_composition_discards_the_buffer() {
    let mut c = controller();
    type_text(&mut c, "hi");
    c.composition_start();
    c.surface_mut().set_text("hizz");
    c.composition_update("zz");
    // Empty end data cancels; the buffered diff is thrown away.
    c.composition_end("");
    assert_eq!(c.plain_text(), "hi");
  }

  #[test]
  fn deferred_reconciliation_waits_for_the_frame_delay() {
    let mut c = controller();
    c.structured_input(StructuredInput::new(InputKind::Unsupported("insertHorizontalRule".into())));
    c.surface_mut().set_text("x");

    c.frame();
    assert_eq!(c.plain_text(), "");
    c.frame();
    assert_eq!(c.plain_text(), "x");

    // No reconcile is outstanding; further frames are no-ops.
    c.surface_mut().set_text("xy");
    c.frame();
    assert_eq!(c.plain_text(), "x");
  }

  #[test]
  fn every_edit_ends_with_a_presentation() {
    let mut c = controller();
    type_text(&mut c, "a");
    type_text(&mut c, "b");
    assert_eq!(c.surface().present_count(), 2);
    assert!(!c.surface().presented().is_empty());
  }
}
