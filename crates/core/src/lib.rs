//! Rich Habits Core - Shared domain types.
//!
//! This crate provides the types used across all Rich Habits OS components:
//! - `server` - JSON REST API consumed by the single-page app
//! - `cli` - Operator tools for migrations, seeding and data dumps
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Status and role columns are stored as `TEXT`, so every
//! enumeration here round-trips through [`std::str::FromStr`] and `as_str`.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, workflow statuses and permission kinds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
