//! Reconciliation of an incoming draft against the stored row.
//!
//! Backends call [`reconcile`] with the currently stored attributes and the
//! incoming ones, and write the returned row only when it is `Some`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::signature::{Field, SignatureAttrs};

/// How a changed record is written back.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReconcilePolicy {
  /// Every tracked attribute is overwritten with the incoming value, empty
  /// values included. Each source is authoritative for the whole row.
  #[default]
  Replace,
  /// Per attribute, the incoming value wins unless it is empty, in which case
  /// the stored value is kept.
  PreferNonEmpty,
}

/// Decide what to write for an existing identity.
///
/// Returns `None` when the row would not change, so the caller can skip the
/// write and leave `updated_at` alone.
pub fn reconcile(
  stored: &SignatureAttrs,
  incoming: SignatureAttrs,
  policy: ReconcilePolicy,
) -> Option<SignatureAttrs> {
  let next = match policy {
    ReconcilePolicy::Replace => incoming,
    ReconcilePolicy::PreferNonEmpty => {
      let mut merged = incoming;
      for field in Field::TRACKED {
        if let (Some(slot), Some(old)) = (merged.get_mut(field), stored.get(field))
          && slot.is_empty()
        {
          old.clone_into(slot);
        }
      }
      merged
    }
  };

  (next != *stored).then_some(next)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn http_attrs() -> SignatureAttrs {
    SignatureAttrs {
      rule_type:   "alert".into(),
      protocol:    "tcp".into(),
      src_addr:    "$EXTERNAL_NET".into(),
      dst_addr:    "$HOME_NET".into(),
      message:     "ET POLICY curl User-Agent".into(),
      origin_file: "rules/emerging-policy.rules".into(),
      ..Default::default()
    }
  }

  fn ftp_attrs() -> SignatureAttrs {
    SignatureAttrs {
      rule_type:   "alert".into(),
      protocol:    "tcp".into(),
      src_addr:    "$EXTERNAL_NET".into(),
      src_port:    "any".into(),
      dst_addr:    "$HOME_NET".into(),
      dst_port:    "80".into(),
      origin_file: "rules/policy.rules".into(),
      ..Default::default()
    }
  }

  #[test]
  fn identical_rows_are_unchanged() {
    let stored = http_attrs();
    assert_eq!(reconcile(&stored, http_attrs(), ReconcilePolicy::Replace), None);
    assert_eq!(
      reconcile(&stored, http_attrs(), ReconcilePolicy::PreferNonEmpty),
      None
    );
  }

  #[test]
  fn replace_blanks_missing_attributes() {
    let next = reconcile(&http_attrs(), ftp_attrs(), ReconcilePolicy::Replace)
      .expect("row changed");
    assert_eq!(next, ftp_attrs());
    assert!(next.message.is_empty());
  }

  #[test]
  fn prefer_non_empty_keeps_stored_message() {
    let next = reconcile(&http_attrs(), ftp_attrs(), ReconcilePolicy::PreferNonEmpty)
      .expect("row changed");
    assert_eq!(next.message, "ET POLICY curl User-Agent");
    assert_eq!(next.dst_port, "80");
    assert_eq!(next.origin_file, "rules/policy.rules");
  }

  #[test]
  fn prefer_non_empty_with_only_blanks_is_unchanged() {
    let incoming = SignatureAttrs {
      protocol: "tcp".into(),
      ..Default::default()
    };
    assert_eq!(
      reconcile(&http_attrs(), incoming, ReconcilePolicy::PreferNonEmpty),
      None
    );
  }

  #[test]
  fn policy_parses_from_config_names() {
    assert_eq!(
      "prefer_non_empty".parse::<ReconcilePolicy>().unwrap(),
      ReconcilePolicy::PreferNonEmpty
    );
    assert_eq!(ReconcilePolicy::default().to_string(), "replace");
  }
}
