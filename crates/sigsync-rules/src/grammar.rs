//! Declarative extraction grammars.
//!
//! A grammar is a regular expression whose named capture groups are
//! [`Field`] slots. The group name *is* the mapping: a group called
//! `dst_port` binds `SignatureAttrs::dst_port`. Adding a source type means
//! adding a [`GrammarSpec`], never new extraction code.

use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;
use sigsync_core::signature::Field;

use crate::error::{Error, Result};

// ─── Built-in grammars ───────────────────────────────────────────────────────

// Between the header and the `msg:`/`sid:` options, `(?:[^;]|;+[^;)])*?;*`
// never crosses a `;)` rule terminator, so a rule missing an option cannot
// borrow it from the rule that follows.

/// Rule-set archives published over HTTP: message and identifier clauses,
/// wildcard ports, bracketed address lists allowed.
const SURICATA_PATTERN: &str = r#"(?i)\b(?P<rule_type>alert|drop|reject|pass|log) (?P<protocol>\w+) (?P<src_addr>\[.*?\]|\S+) any -> (?P<dst_addr>\[.*?\]|\S+) any (?:[^;]|;+[^;)])*?;*msg:\s*"(?P<message>(?:[^"\\]|\\.)*)";(?:[^;]|;+[^;)])*?;*sid:\s*(?P<identity>\d+);"#;

/// Rule-set archives mirrored over FTP: explicit port tokens on both sides of
/// the arrow, no message is bound.
const SNORT_PATTERN: &str = r"(?i)\b(?P<rule_type>alert|drop|reject|pass|log) (?P<protocol>\w+) (?P<src_addr>\S+) (?P<src_port>\S+) -> (?P<dst_addr>\S+) (?P<dst_port>\S+)(?:[^;]|;+[^;)])*?;*sid:\s*(?P<identity>\d+);";

pub const SURICATA: &str = "suricata";
pub const SNORT: &str = "snort";

/// Specs for the grammars every registry starts with.
pub fn builtin_specs() -> Vec<GrammarSpec> {
  vec![
    GrammarSpec {
      name:     SURICATA.into(),
      pattern:  SURICATA_PATTERN.into(),
      required: vec![
        Field::Identity,
        Field::RuleType,
        Field::Protocol,
        Field::SrcAddr,
        Field::DstAddr,
        Field::Message,
      ],
    },
    GrammarSpec {
      name:     SNORT.into(),
      pattern:  SNORT_PATTERN.into(),
      required: vec![
        Field::Identity,
        Field::RuleType,
        Field::Protocol,
        Field::SrcAddr,
        Field::SrcPort,
        Field::DstAddr,
        Field::DstPort,
      ],
    },
  ]
}

// ─── Spec ────────────────────────────────────────────────────────────────────

/// Uncompiled grammar definition, as written in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarSpec {
  pub name:     String,
  pub pattern:  String,
  /// Slots a match must bind to be accepted. The identity is always required
  /// whether listed or not.
  #[serde(default)]
  pub required: Vec<Field>,
}

// ─── Compiled grammar ────────────────────────────────────────────────────────

/// A compiled grammar: the regex plus its slot table.
#[derive(Debug, Clone)]
pub struct Grammar {
  name:     String,
  regex:    Regex,
  /// `(capture group index, field)` for every named group.
  slots:    Vec<(usize, Field)>,
  required: Vec<Field>,
}

impl Grammar {
  /// Compile and validate a spec.
  pub fn compile(spec: &GrammarSpec) -> Result<Self> {
    let invalid = |reason: String| Error::InvalidGrammar {
      grammar: spec.name.clone(),
      reason,
    };

    let regex = Regex::new(&spec.pattern).map_err(|source| Error::Regex {
      grammar: spec.name.clone(),
      source,
    })?;

    let mut slots = Vec::new();
    for (index, name) in regex.capture_names().enumerate() {
      let Some(name) = name else { continue };
      let field = Field::from_str(name)
        .map_err(|_| invalid(format!("capture group {name:?} is not a signature field")))?;
      if slots.iter().any(|(_, f)| *f == field) {
        return Err(invalid(format!("slot {field} is bound twice")));
      }
      slots.push((index, field));
    }

    let mut required = spec.required.clone();
    if !required.contains(&Field::Identity) {
      required.insert(0, Field::Identity);
    }
    for field in &required {
      if !slots.iter().any(|(_, f)| f == field) {
        return Err(invalid(format!("required slot {field} has no capture group")));
      }
    }

    Ok(Self { name: spec.name.clone(), regex, slots, required })
  }

  pub fn name(&self) -> &str { &self.name }

  pub(crate) fn regex(&self) -> &Regex { &self.regex }

  pub(crate) fn slots(&self) -> &[(usize, Field)] { &self.slots }

  pub(crate) fn required(&self) -> &[Field] { &self.required }

  /// Group index of `field`, if the grammar binds it.
  pub(crate) fn slot_index(&self, field: Field) -> Option<usize> {
    self
      .slots
      .iter()
      .find(|(_, f)| *f == field)
      .map(|(index, _)| *index)
  }

  /// Whether this grammar binds `field` at all.
  pub fn binds(&self, field: Field) -> bool { self.slot_index(field).is_some() }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Compiled grammars addressable by name.
#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
  grammars: Vec<Grammar>,
}

impl GrammarRegistry {
  /// A registry holding the built-in `suricata` and `snort` grammars.
  pub fn with_builtins() -> Result<Self> {
    let mut registry = Self::default();
    for spec in builtin_specs() {
      registry.register(&spec)?;
    }
    Ok(registry)
  }

  /// Compile and add a grammar. Names are unique across the registry.
  pub fn register(&mut self, spec: &GrammarSpec) -> Result<()> {
    if self.grammars.iter().any(|g| g.name == spec.name) {
      return Err(Error::DuplicateGrammar(spec.name.clone()));
    }
    self.grammars.push(Grammar::compile(spec)?);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Result<&Grammar> {
    self
      .grammars
      .iter()
      .find(|g| g.name == name)
      .ok_or_else(|| Error::UnknownGrammar(name.to_owned()))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.grammars.iter().map(|g| g.name.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn spec(name: &str, pattern: &str, required: Vec<Field>) -> GrammarSpec {
    GrammarSpec { name: name.into(), pattern: pattern.into(), required }
  }

  #[test]
  fn builtins_compile() {
    let registry = GrammarRegistry::with_builtins().unwrap();
    assert_eq!(registry.names().collect::<Vec<_>>(), [SURICATA, SNORT]);

    let suricata = registry.get(SURICATA).unwrap();
    assert!(suricata.binds(Field::Message));
    assert!(!suricata.binds(Field::SrcPort));

    let snort = registry.get(SNORT).unwrap();
    assert!(snort.binds(Field::DstPort));
    assert!(!snort.binds(Field::Message));
  }

  #[test]
  fn identity_is_always_required() {
    let grammar =
      Grammar::compile(&spec("bare", r"sid:(?P<identity>\d+);", vec![])).unwrap();
    assert_eq!(grammar.required(), [Field::Identity]);
  }

  #[test]
  fn unknown_group_name_is_rejected() {
    let err = Grammar::compile(&spec(
      "typo",
      r"(?P<proto>\w+) sid:(?P<identity>\d+);",
      vec![],
    ))
    .unwrap_err();
    assert!(matches!(err, Error::InvalidGrammar { ref grammar, .. } if grammar == "typo"));
  }

  #[test]
  fn missing_identity_group_is_rejected() {
    let err =
      Grammar::compile(&spec("anon", r"(?P<protocol>\w+)", vec![])).unwrap_err();
    assert!(matches!(err, Error::InvalidGrammar { .. }));
  }

  #[test]
  fn required_slot_must_have_a_group() {
    let err = Grammar::compile(&spec(
      "nomsg",
      r"sid:(?P<identity>\d+);",
      vec![Field::Message],
    ))
    .unwrap_err();
    assert!(matches!(err, Error::InvalidGrammar { .. }));
  }

  #[test]
  fn bad_regex_reports_grammar_name() {
    let err = Grammar::compile(&spec("broken", r"(?P<identity>\d+", vec![]))
      .unwrap_err();
    assert!(matches!(err, Error::Regex { ref grammar, .. } if grammar == "broken"));
  }

  #[test]
  fn duplicate_and_unknown_names() {
    let mut registry = GrammarRegistry::with_builtins().unwrap();
    let err = registry
      .register(&spec(SNORT, r"sid:(?P<identity>\d+);", vec![]))
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateGrammar(_)));
    assert!(matches!(
      registry.get("bro").unwrap_err(),
      Error::UnknownGrammar(name) if name == "bro"
    ));
  }
}
