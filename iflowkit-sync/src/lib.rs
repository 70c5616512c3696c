//! # iflowkit-sync
//!
//! The synchronization engine: ignore patterns, artifact classification,
//! folder comparison, transport records with checkpointed remainders, and
//! the init/pull/push/deliver flows that converge a Git branch and a CPI
//! tenant.

pub mod classifier;
pub mod compare;
pub mod engine;
pub mod error;
pub mod ignore;
pub mod transport;

pub use engine::EngineContext;
pub use error::SyncError;
pub use ignore::RepoIgnore;
pub use transport::{
    build_transport_commit_message, new_transport_ids, TransportIndex, TransportRecord,
    TransportStatus, TransportStore, TransportType,
};
