//! Signature extraction from rule-file text.
//!
//! Pipeline:
//!   raw &str
//!     └─ RuleText::new()      → single-line text
//!          └─ extract()       → lazy Extract iterator
//!               └─ bind()     → Result<SignatureDraft> per match

use std::borrow::Cow;

use regex::{CaptureMatches, Captures};
use sigsync_core::signature::{Field, SignatureDraft};

use crate::{
  error::{Error, Result},
  grammar::Grammar,
};

// ─── Normalised input ────────────────────────────────────────────────────────

/// Rule-file contents with every line break collapsed to a single space, so a
/// rule body spread over several lines matches a single-line pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleText(String);

impl RuleText {
  pub fn new(raw: &str) -> Self {
    Self(raw.replace("\r\n", " ").replace(['\r', '\n'], " "))
  }

  /// Decode bytes lossily; invalid UTF-8 sequences never abort a file.
  pub fn from_bytes(raw: &[u8]) -> Self { Self::new(&String::from_utf8_lossy(raw)) }

  pub fn as_str(&self) -> &str { &self.0 }
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Lazily yield one item per non-overlapping match of `grammar` in `text`.
///
/// Every emitted draft has `origin_file` set to `origin` unless the grammar
/// binds that slot itself. Calling `extract` again restarts from the top.
pub fn extract<'g, 't>(
  grammar: &'g Grammar,
  text: &'t RuleText,
  origin: &'t str,
) -> Extract<'g, 't> {
  Extract {
    grammar,
    origin,
    matches: grammar.regex().captures_iter(text.as_str()),
  }
}

/// Iterator returned by [`extract`].
pub struct Extract<'g, 't> {
  grammar: &'g Grammar,
  origin:  &'t str,
  matches: CaptureMatches<'g, 't>,
}

impl Iterator for Extract<'_, '_> {
  type Item = Result<SignatureDraft>;

  fn next(&mut self) -> Option<Self::Item> {
    let caps = self.matches.next()?;
    Some(bind(self.grammar, &caps, self.origin))
  }
}

/// Turn one match into a draft, or a mismatch if a required slot is unbound.
fn bind(grammar: &Grammar, caps: &Captures<'_>, origin: &str) -> Result<SignatureDraft> {
  let offset = caps.get(0).map_or(0, |m| m.start());

  for &field in grammar.required() {
    let bound = grammar
      .slot_index(field)
      .and_then(|index| caps.get(index))
      .is_some_and(|m| !m.as_str().trim().is_empty());
    if !bound {
      return Err(Error::GrammarMismatch {
        grammar: grammar.name().to_owned(),
        slot: field,
        offset,
      });
    }
  }

  let mut draft = SignatureDraft::default();
  draft.attrs.origin_file = origin.to_owned();

  for &(index, field) in grammar.slots() {
    let Some(m) = caps.get(index) else { continue };
    let value = match field {
      Field::Message => strip_address_list(m.as_str()).trim().to_owned(),
      _ => m.as_str().trim().to_owned(),
    };
    draft.set(field, value);
  }

  Ok(draft)
}

/// Remove the first embedded `ip [ … ]` address list from a message.
///
/// Some feeds repeat the rule's address list inside `msg`; only the first such
/// fragment is dropped. Without a closing bracket the message is kept as is.
pub(crate) fn strip_address_list(message: &str) -> Cow<'_, str> {
  const MARKER: &str = "ip [";

  let Some(start) = message.find(MARKER) else {
    return Cow::Borrowed(message);
  };
  let Some(close) = message[start..].find(']') else {
    return Cow::Borrowed(message);
  };
  let end = start + close + 1;

  let mut stripped = String::with_capacity(message.len() - (end - start));
  stripped.push_str(&message[..start]);
  stripped.push_str(&message[end..]);
  Cow::Owned(stripped)
}
