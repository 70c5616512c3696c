//! Git-hosting provider repo creation (GitHub, GitLab).
//!
//! `sync init` creates the private remote repository once. "Already
//! exists" responses count as success so init stays idempotent.

use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::remote::{PROVIDER_GITHUB, PROVIDER_GITLAB};

/// Errors from provider REST calls and remote parsing.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("git auth token not found; set IFLOWKIT_GIT_TOKEN (or provider-specific token env var)")]
    TokenNotFound,

    #[error("invalid remote URL: {0}")]
    InvalidRemote(String),

    #[error("unable to determine GitHub owner from namespace: '{0}'")]
    MissingOwner(String),

    #[error("{provider} repo create failed ({status}): {body}")]
    CreateFailed {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("gitlab group resolve failed ({status}): {body}")]
    GroupResolve { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(String),
}

/// Provider-specific repository creation and naming.
pub trait RepoCreator {
    fn name(&self) -> &'static str;

    /// Human-friendly repo display name derived from the CPI package name.
    fn normalize_repo_display_name(&self, name: &str) -> String;

    /// Create the repository; existing repositories are success.
    fn create_repo(
        &self,
        token: &str,
        host: &str,
        namespace: &str,
        repo_path: &str,
        display_name: &str,
        private: bool,
    ) -> Result<(), ProviderError>;
}

/// Resolve a provider by name; unknown providers skip repo creation.
pub fn new_provider(name: &str) -> Option<Box<dyn RepoCreator>> {
    match name {
        p if p == PROVIDER_GITHUB => Some(Box::new(GithubProvider)),
        p if p == PROVIDER_GITLAB => Some(Box::new(GitlabProvider)),
        _ => None,
    }
}

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(30))
        .build()
}

struct HttpFailure {
    status: u16,
    body: String,
}

/// POST a JSON payload; `Ok(None)` on 2xx, `Ok(Some(failure))` on an HTTP
/// rejection, `Err` only for transport-level problems.
fn post_json(
    agent: &ureq::Agent,
    url: &str,
    headers: &[(&str, &str)],
    payload: &serde_json::Value,
) -> Result<Option<HttpFailure>, ProviderError> {
    let mut req = agent
        .post(url)
        .set("Accept", "application/json")
        .set("Content-Type", "application/json")
        .set("User-Agent", "iflowkit-cli");
    for (k, v) in headers {
        req = req.set(k, v);
    }
    match req.send_string(&payload.to_string()) {
        Ok(_) => Ok(None),
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default().trim().to_string();
            Ok(Some(HttpFailure { status, body }))
        }
        Err(e) => Err(ProviderError::Transport(e.to_string())),
    }
}

fn normalize_common(name: &str, max_len: usize) -> String {
    let non_alnum = Regex::new(r"[^a-zA-Z0-9._-]+").expect("static pattern");
    let mut s = non_alnum.replace_all(name.trim(), "-").into_owned();
    s = s.trim_matches(|c| matches!(c, '-' | '.' | '_')).to_string();
    if s.is_empty() {
        return "repo".to_string();
    }
    if max_len > 0 && s.len() > max_len {
        let mut truncated: String = s.chars().take(max_len).collect();
        truncated = truncated
            .trim_matches(|c| matches!(c, '-' | '.' | '_'))
            .to_string();
        if truncated.is_empty() {
            return "repo".to_string();
        }
        return truncated;
    }
    s
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

struct GithubProvider;

fn github_api_base(host: &str) -> String {
    let h = host.trim().to_ascii_lowercase();
    if h.is_empty() || h == "github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{h}/api/v3")
    }
}

fn github_already_exists(f: &HttpFailure) -> bool {
    f.status == 422 || f.body.to_ascii_lowercase().contains("already exists")
}

fn github_auth_or_not_found(f: &HttpFailure) -> bool {
    let body = f.body.to_ascii_lowercase();
    f.status == 403 || f.status == 404 || body.contains("forbidden") || body.contains("not found")
}

impl RepoCreator for GithubProvider {
    fn name(&self) -> &'static str {
        PROVIDER_GITHUB
    }

    fn normalize_repo_display_name(&self, name: &str) -> String {
        // The URL path comes from the package id; the display name only
        // feeds the repository description.
        normalize_common(name, 100)
    }

    fn create_repo(
        &self,
        token: &str,
        host: &str,
        namespace: &str,
        repo_path: &str,
        display_name: &str,
        private: bool,
    ) -> Result<(), ProviderError> {
        let owner = namespace
            .trim_matches('/')
            .split('/')
            .next()
            .unwrap_or("")
            .trim();
        if owner.is_empty() {
            return Err(ProviderError::MissingOwner(namespace.to_string()));
        }

        let api_base = github_api_base(host);
        let agent = agent();
        let auth = format!("Bearer {token}");
        let headers = [
            ("Authorization", auth.as_str()),
            ("Accept", "application/vnd.github+json"),
        ];
        let payload = serde_json::json!({
            "name": repo_path,
            "private": private,
            "description": display_name,
            "auto_init": false,
        });

        // Try org repo creation first, then fall back to the user account.
        let org_url = format!("{api_base}/orgs/{owner}/repos");
        let org_failure = match post_json(&agent, &org_url, &headers, &payload)? {
            None => return Ok(()),
            Some(f) => f,
        };
        if github_already_exists(&org_failure) {
            return Ok(());
        }
        if !github_auth_or_not_found(&org_failure) {
            return Err(ProviderError::CreateFailed {
                provider: PROVIDER_GITHUB,
                status: org_failure.status,
                body: org_failure.body,
            });
        }

        let user_url = format!("{api_base}/user/repos");
        match post_json(&agent, &user_url, &headers, &payload)? {
            None => Ok(()),
            Some(f) if github_already_exists(&f) => Ok(()),
            Some(f) => Err(ProviderError::CreateFailed {
                provider: PROVIDER_GITHUB,
                status: f.status,
                body: f.body,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// GitLab
// ---------------------------------------------------------------------------

struct GitlabProvider;

fn gitlab_api_base(host: &str) -> String {
    let h = host.trim().to_ascii_lowercase();
    if h.is_empty() {
        "https://gitlab.com/api/v4".to_string()
    } else {
        format!("https://{h}/api/v4")
    }
}

fn gitlab_already_exists(f: &HttpFailure) -> bool {
    let body = f.body.to_ascii_lowercase();
    body.contains("already been taken") || body.contains("already exists")
}

fn gitlab_resolve_group_id(
    agent: &ureq::Agent,
    token: &str,
    api_base: &str,
    namespace: &str,
) -> Result<u64, ProviderError> {
    // GET /groups/:id accepts a URL-encoded full group path.
    let encoded = namespace.trim_matches('/').replace('/', "%2F");
    let url = format!("{api_base}/groups/{encoded}");
    let resp = agent
        .get(&url)
        .set("Accept", "application/json")
        .set("User-Agent", "iflowkit-cli")
        .set("PRIVATE-TOKEN", token)
        .call();
    let body = match resp {
        Ok(resp) => resp
            .into_string()
            .map_err(|e| ProviderError::Transport(e.to_string()))?,
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default().trim().to_string();
            return Err(ProviderError::GroupResolve { status, body });
        }
        Err(e) => return Err(ProviderError::Transport(e.to_string())),
    };
    let value: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| ProviderError::Transport(e.to_string()))?;
    match value.get("id").and_then(|v| v.as_u64()) {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ProviderError::GroupResolve {
            status: 200,
            body: "gitlab group resolve returned empty id".to_string(),
        }),
    }
}

impl RepoCreator for GitlabProvider {
    fn name(&self) -> &'static str {
        PROVIDER_GITLAB
    }

    fn normalize_repo_display_name(&self, name: &str) -> String {
        // GitLab keeps display name separate from the URL path.
        normalize_common(name, 255)
    }

    fn create_repo(
        &self,
        token: &str,
        host: &str,
        namespace: &str,
        repo_path: &str,
        display_name: &str,
        private: bool,
    ) -> Result<(), ProviderError> {
        let api_base = gitlab_api_base(host);
        let agent = agent();

        let group_id = if namespace.trim().is_empty() {
            None
        } else {
            gitlab_resolve_group_id(&agent, token, &api_base, namespace).ok()
        };

        let visibility = if private { "private" } else { "public" };
        let mut payload = serde_json::json!({
            "name": display_name,
            "path": repo_path,
            "visibility": visibility,
        });
        if let Some(id) = group_id {
            payload["namespace_id"] = serde_json::json!(id);
        }

        let url = format!("{api_base}/projects");
        let headers = [("PRIVATE-TOKEN", token)];
        let failure = match post_json(&agent, &url, &headers, &payload)? {
            None => return Ok(()),
            Some(f) => f,
        };
        if gitlab_already_exists(&failure) {
            return Ok(());
        }

        // Group creation may be forbidden; retry in the user namespace.
        if group_id.is_some() {
            payload.as_object_mut().expect("object").remove("namespace_id");
            return match post_json(&agent, &url, &headers, &payload)? {
                None => Ok(()),
                Some(f) if gitlab_already_exists(&f) => Ok(()),
                Some(f) => Err(ProviderError::CreateFailed {
                    provider: PROVIDER_GITLAB,
                    status: f.status,
                    body: f.body,
                }),
            };
        }

        Err(ProviderError::CreateFailed {
            provider: PROVIDER_GITLAB,
            status: failure.status,
            body: failure.body,
        })
    }
}
