//! Business logic services.
//!
//! - `auth` - Password login and account creation
//! - `runtime_settings` - Feature flags and the test-mode role override
//! - `status_remap` - Legacy manufacturing status migration
//! - `uploads` - Signed object store URLs and object references

pub mod auth;
pub mod runtime_settings;
pub mod status_remap;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use runtime_settings::{RuntimeSettings, RuntimeSettingsError, RuntimeSettingsStore};
pub use uploads::{UploadError, UploadSigner};
