//! Rule-text codec for sigsync.
//!
//! Extracts [`SignatureDraft`]s from intrusion-detection rule files with
//! declarative grammars, and renders stored [`Signature`]s back into rule-set
//! formats. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use sigsync_rules::{GrammarRegistry, RuleText, extract};
//!
//! let registry = GrammarRegistry::with_builtins().unwrap();
//! let text = RuleText::new(
//!   r#"alert tcp any any -> any any (msg:"test rule"; sid:1000001;)"#,
//! );
//! for draft in extract(registry.get("suricata").unwrap(), &text, "local.rules") {
//!   println!("{:?}", draft);
//! }
//! ```
//!
//! [`SignatureDraft`]: sigsync_core::signature::SignatureDraft
//! [`Signature`]: sigsync_core::signature::Signature

pub mod artifact;
pub mod error;
pub mod extract;
pub mod grammar;
pub mod render;

pub use error::{Error, Result};
pub use extract::{Extract, RuleText, extract};
pub use grammar::{Grammar, GrammarRegistry, GrammarSpec};
pub use render::{Artifact, ExportFormat, SENTINEL, render};
