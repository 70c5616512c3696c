//! Provider auth token resolution from the environment.

use crate::provider::ProviderError;
use crate::remote::{PROVIDER_GITHUB, PROVIDER_GITLAB};

/// Read an auth token from environment variables.
///
/// Priority: `IFLOWKIT_GIT_TOKEN`, then provider-specific fallbacks
/// (GitHub: `GITHUB_TOKEN`, `GH_TOKEN`; GitLab: `GITLAB_TOKEN`,
/// `GITLAB_PRIVATE_TOKEN`).
pub fn resolve_token(provider: &str) -> Result<String, ProviderError> {
    let mut keys = vec!["IFLOWKIT_GIT_TOKEN"];
    match provider {
        p if p == PROVIDER_GITHUB => keys.extend(["GITHUB_TOKEN", "GH_TOKEN"]),
        p if p == PROVIDER_GITLAB => keys.extend(["GITLAB_TOKEN", "GITLAB_PRIVATE_TOKEN"]),
        _ => {}
    }
    for key in keys {
        if let Ok(value) = std::env::var(key) {
            let value = value.trim().to_string();
            if !value.is_empty() {
                return Ok(value);
            }
        }
    }
    Err(ProviderError::TokenNotFound)
}
