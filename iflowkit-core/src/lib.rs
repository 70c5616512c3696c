//! iflowkit core library — domain types, metadata, routing, config stores.
//!
//! Public API surface:
//! - [`types`] — artifact kinds, keys, tenant environments
//! - [`metadata`] — repo locator and `.iflowkit/package.json`
//! - [`router`] — branch → tenant mapping and the PRD safety gate
//! - [`profile`] — profile and tenant service-key models
//! - [`store`] — read paths for the user config store
//! - [`fsio`] / [`archive`] — atomic writes and zip handling
//! - [`error`] — [`CoreError`]

pub mod archive;
pub mod error;
pub mod fsio;
pub mod metadata;
pub mod profile;
pub mod router;
pub mod store;
pub mod types;

pub use error::CoreError;
pub use metadata::SyncMetadata;
pub use types::{ArtifactKey, ArtifactKind, TenantEnv};
