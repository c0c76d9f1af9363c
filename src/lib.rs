//! A typed client bridge between application code and a feature-gating /
//! dynamic-configuration evaluation engine.
//!
//! # Overview
//!
//! The bridge revolves around a [`Client`] wrapping an opaque evaluation
//! [`Engine`]. The engine owns rule matching, bucketing, network sync, and
//! event batching; the client owns the contract layer in front of it:
//! normalizing partial caller-supplied user data into a complete
//! [`UserContext`], guarding the engine's lifecycle, and converting every
//! engine-side failure into the uniform [`Result`] model shared by all five
//! operation kinds (gate check, config fetch, experiment fetch, layer fetch,
//! event log).
//!
//! Config-shaped results come back as a [`DynamicPayload`], which offers
//! lenient typed getters with default fallback as well as a strict
//! [`decode`](DynamicPayload::decode) path into caller-defined types.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Call sites that cannot
//! propagate errors can use the `*_or_default` operation variants (lossy) or
//! the `*_resolved` variants, which pair a safe default value with the failure
//! reason in a [`Resolved`] record.
//!
//! # Logging
//!
//! The crate uses the [`log`](https://docs.rs/log/latest/log/) crate with
//! key-value payloads under the `flagbridge` target. Consider integrating a
//! `log`-compatible logger implementation for better visibility into bridge
//! operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod attributes;
mod client;
mod engine;
mod error;
mod options;
mod payload;
mod resolution;
mod user;

pub use attributes::{AttributeValue, Attributes};
pub use client::Client;
pub use engine::{Engine, EngineError};
pub use error::{Error, Result};
pub use options::EngineOptions;
pub use payload::{DynamicPayload, PayloadValue};
pub use resolution::Resolved;
pub use user::{UserContext, UserInputError};
