//! Signature types: the single entity of the sigsync store.
//!
//! A [`SignatureDraft`] is what an extractor emits: an identity plus whatever
//! attributes its grammar could bind. A [`Signature`] is the canonical stored
//! row, carrying the store-managed timestamps on top of the same attributes.
//!
//! An attribute is considered absent when its string is empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// A named attribute slot of a signature.
///
/// The snake_case names double as capture-group names in extraction grammars
/// and as keys in configuration files.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  Identity,
  RuleType,
  Protocol,
  SrcAddr,
  SrcPort,
  DstAddr,
  DstPort,
  Message,
  OriginFile,
}

impl Field {
  /// Every attribute compared by the store's change detection, i.e. all
  /// fields except the identity itself.
  pub const TRACKED: [Field; 8] = [
    Field::RuleType,
    Field::Protocol,
    Field::SrcAddr,
    Field::SrcPort,
    Field::DstAddr,
    Field::DstPort,
    Field::Message,
    Field::OriginFile,
  ];
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// The tracked attribute set of a signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAttrs {
  /// Action keyword of the rule (`alert`, `drop`, …).
  pub rule_type:   String,
  pub protocol:    String,
  pub src_addr:    String,
  pub src_port:    String,
  pub dst_addr:    String,
  pub dst_port:    String,
  /// Human-readable rule description.
  pub message:     String,
  /// Archive member the record was extracted from.
  pub origin_file: String,
}

impl SignatureAttrs {
  /// Borrow the value of a tracked field. `Field::Identity` is not an
  /// attribute and yields `None`.
  pub fn get(&self, field: Field) -> Option<&str> {
    let value = match field {
      Field::Identity => return None,
      Field::RuleType => &self.rule_type,
      Field::Protocol => &self.protocol,
      Field::SrcAddr => &self.src_addr,
      Field::SrcPort => &self.src_port,
      Field::DstAddr => &self.dst_addr,
      Field::DstPort => &self.dst_port,
      Field::Message => &self.message,
      Field::OriginFile => &self.origin_file,
    };
    Some(value)
  }

  /// Mutable access to a tracked field; `None` for `Field::Identity`.
  pub fn get_mut(&mut self, field: Field) -> Option<&mut String> {
    let value = match field {
      Field::Identity => return None,
      Field::RuleType => &mut self.rule_type,
      Field::Protocol => &mut self.protocol,
      Field::SrcAddr => &mut self.src_addr,
      Field::SrcPort => &mut self.src_port,
      Field::DstAddr => &mut self.dst_addr,
      Field::DstPort => &mut self.dst_port,
      Field::Message => &mut self.message,
      Field::OriginFile => &mut self.origin_file,
    };
    Some(value)
  }

  /// The tracked fields whose values differ between `self` and `other`.
  pub fn diff(&self, other: &SignatureAttrs) -> Vec<Field> {
    Field::TRACKED
      .into_iter()
      .filter(|f| self.get(*f) != other.get(*f))
      .collect()
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// A partially-populated record as produced by an extraction grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDraft {
  pub identity: String,
  pub attrs:    SignatureAttrs,
}

impl SignatureDraft {
  pub fn new(identity: impl Into<String>) -> Self {
    Self { identity: identity.into(), attrs: SignatureAttrs::default() }
  }

  /// Set a slot by field name; the identity is addressable too.
  pub fn set(&mut self, field: Field, value: impl Into<String>) {
    let value = value.into();
    match self.attrs.get_mut(field) {
      Some(slot) => *slot = value,
      None => self.identity = value,
    }
  }

  /// Reject drafts without an identity. Surrounding whitespace is trimmed
  /// from the identity on success.
  pub fn validate(mut self) -> Result<Self> {
    let trimmed = self.identity.trim();
    if trimmed.is_empty() {
      return Err(Error::MalformedRecord { origin: self.attrs.origin_file });
    }
    if trimmed.len() != self.identity.len() {
      self.identity = trimmed.to_owned();
    }
    Ok(self)
  }
}

// ─── Stored signature ────────────────────────────────────────────────────────

/// The canonical stored record for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
  pub identity:   String,
  #[serde(flatten)]
  pub attrs:      SignatureAttrs,
  pub created_at: DateTime<Utc>,
  /// `None` until a later upsert changes the record.
  pub updated_at: Option<DateTime<Utc>>,
  /// Soft-delete marker; set only by administrative retirement.
  pub deleted_at: Option<DateTime<Utc>>,
}

impl Signature {
  pub fn is_live(&self) -> bool { self.deleted_at.is_none() }
}
