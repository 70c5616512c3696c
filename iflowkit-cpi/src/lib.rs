//! # iflowkit-cpi
//!
//! Blocking client for the CPI Integration Content OData v2 API:
//! OAuth2 client-credentials with a cached token, the CSRF + cookie
//! handshake required for writes, package export, artifact
//! update/delete/deploy and runtime status queries.

pub mod client;
pub mod error;

pub use client::{
    escape_odata_id, ArtifactInfo, CpiClient, CsrfSession, IntegrationPackage,
    RuntimeArtifactStatus,
};
pub use error::CpiError;
