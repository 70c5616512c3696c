//! # iflowkit-git
//!
//! Typed wrapper around the `git` subprocess plus git-hosting provider
//! plumbing (remote URL construction, token resolution, repository
//! creation on GitHub/GitLab).
//!
//! Every mutation logs its command line via `tracing` and surfaces the
//! combined subprocess output inside [`GitError`].

pub mod driver;
pub mod error;
pub mod provider;
pub mod remote;
pub mod tagger;
pub mod token;

pub use driver::GitDriver;
pub use error::GitError;
pub use provider::{new_provider, ProviderError, RepoCreator};
pub use tagger::{transport_tag_name, GitTagger};
