//! Domain models for ONLV documents.
//!
//! This module contains the core domain types: the compact position
//! identifier and its change detection, the typed ONLV document tree, and
//! configuration.

/// Compact position identifier types and parsing.
pub mod identifier;
pub use identifier::{Identifier, Validation, ValidationError, Variant};

/// Component-level diffs between identifiers.
pub mod changes;
pub use changes::{ChangeDetector, ChangeSet, Component};

mod clock;
pub use clock::{Clock, FixedClock, SystemClock};

mod config;
pub use config::Config;

/// Typed ONLV document tree.
pub mod document;
pub use document::{Document, OneOrMany, Quantity};

/// Rich text to plain text reduction.
pub mod rich_text;
pub use rich_text::{JsonText, PlainText};
