//! Core types and trait definitions for the sigsync signature store.
//!
//! This crate is deliberately free of regex, filesystem and database
//! dependencies. Every other crate in the workspace depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod reconcile;
pub mod signature;
pub mod store;

pub use error::{Error, Result};
