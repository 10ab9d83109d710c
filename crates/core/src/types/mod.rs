//! Core types for Rich Habits OS.
//!
//! This module provides type-safe wrappers for common domain concepts.

#[macro_use]
mod text_enum;

pub mod email;
pub mod id;
pub mod permission;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{PermissionFlags, PermissionKind};
pub use role::UserRole;
pub use status::*;
pub use text_enum::UnknownVariant;
