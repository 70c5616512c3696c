//! Remote URL construction and parsing.

use crate::provider::ProviderError;

pub const PROVIDER_UNKNOWN: &str = "unknown";
pub const PROVIDER_GITHUB: &str = "github";
pub const PROVIDER_GITLAB: &str = "gitlab";

/// Build the repository URL as `gitServerUrl + cpiPath + <packageId>.git`.
///
/// When the server URL carries a scheme, the path segments are joined on
/// the URL path (preserving any base path); otherwise the pieces are glued
/// with `/` best-effort.
pub fn build_remote_url(
    git_server_url: &str,
    cpi_path: &str,
    package_id: &str,
) -> Result<String, ProviderError> {
    let git_server_url = git_server_url.trim();
    let cpi_path = cpi_path.trim();
    let package_id = package_id.trim();
    if git_server_url.is_empty() {
        return Err(ProviderError::InvalidRemote(
            "gitServerUrl is empty".to_string(),
        ));
    }
    if package_id.is_empty() {
        return Err(ProviderError::InvalidRemote("packageId is empty".to_string()));
    }

    let repo_segment = format!("{package_id}.git");

    if let Some((scheme, rest)) = git_server_url.split_once("://") {
        let (host, base_path) = match rest.split_once('/') {
            Some((host, path)) => (host, path),
            None => (rest, ""),
        };
        if host.is_empty() {
            return Err(ProviderError::InvalidRemote(git_server_url.to_string()));
        }
        let mut parts: Vec<&str> = Vec::new();
        let base_path = base_path.trim_matches('/');
        if !base_path.is_empty() {
            parts.push(base_path);
        }
        let cpi = cpi_path.trim_matches('/');
        if !cpi.is_empty() {
            parts.push(cpi);
        }
        parts.push(&repo_segment);
        return Ok(format!("{scheme}://{host}/{}", parts.join("/")));
    }

    // Best-effort fallback for non-scheme remotes: host[/base].
    let mut base = git_server_url.trim_matches('/').to_string();
    let cpi = cpi_path.trim_matches('/');
    if !cpi.is_empty() {
        base = format!("{base}/{cpi}");
    }
    Ok(format!("{base}/{repo_segment}"))
}

/// Infer the git provider from a remote URL host.
pub fn detect_provider_from_remote(remote: &str) -> &'static str {
    let host = remote_host(remote).unwrap_or_else(|_| remote.to_string());
    detect_provider(&host)
}

fn detect_provider(host: &str) -> &'static str {
    let h = host.to_ascii_lowercase();
    if h.contains("github") {
        PROVIDER_GITHUB
    } else if h.contains("gitlab") {
        PROVIDER_GITLAB
    } else {
        PROVIDER_UNKNOWN
    }
}

/// Extract `(namespace, repo)` from an https remote.
///
/// `https://github.com/acme/com.example.pkg.git` → (`acme`, `com.example.pkg`).
pub fn split_remote_namespace_and_repo(remote: &str) -> Result<(String, String), ProviderError> {
    let rest = remote
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| ProviderError::InvalidRemote(remote.to_string()))?;
    let (_, path) = rest
        .split_once('/')
        .ok_or_else(|| ProviderError::InvalidRemote(remote.to_string()))?;
    let path = path.trim_matches('/');
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(ProviderError::InvalidRemote(remote.to_string()));
    }
    let repo = segments
        .last()
        .expect("checked length")
        .trim_end_matches(".git");
    let namespace = segments[..segments.len() - 1].join("/");
    if namespace.is_empty() || repo.is_empty() {
        return Err(ProviderError::InvalidRemote(remote.to_string()));
    }
    Ok((namespace, repo.to_string()))
}

/// Extract the hostname (without port) from an https remote.
pub fn remote_host(remote: &str) -> Result<String, ProviderError> {
    let rest = remote
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| ProviderError::InvalidRemote(remote.to_string()))?;
    let authority = rest.split('/').next().unwrap_or("");
    let host = authority
        .rsplit_once('@')
        .map(|(_, h)| h)
        .unwrap_or(authority);
    let host = host.split(':').next().unwrap_or("");
    if host.is_empty() {
        return Err(ProviderError::InvalidRemote(remote.to_string()));
    }
    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_url_with_scheme_and_base_path() {
        let url = build_remote_url("https://github.com", "/acme", "com.example.pkg").unwrap();
        assert_eq!(url, "https://github.com/acme/com.example.pkg.git");

        let url = build_remote_url("https://git.corp.example/base/", "team", "pkg").unwrap();
        assert_eq!(url, "https://git.corp.example/base/team/pkg.git");
    }

    #[test]
    fn builds_url_without_scheme() {
        let url = build_remote_url("git.example.com", "group", "pkg").unwrap();
        assert_eq!(url, "git.example.com/group/pkg.git");
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(build_remote_url("", "x", "pkg").is_err());
        assert!(build_remote_url("https://github.com", "x", "").is_err());
    }

    #[test]
    fn detects_provider_from_host() {
        assert_eq!(
            detect_provider_from_remote("https://github.com/a/b.git"),
            PROVIDER_GITHUB
        );
        assert_eq!(
            detect_provider_from_remote("https://gitlab.corp.example/a/b.git"),
            PROVIDER_GITLAB
        );
        assert_eq!(
            detect_provider_from_remote("https://git.example.com/a/b.git"),
            PROVIDER_UNKNOWN
        );
    }

    #[test]
    fn splits_namespace_and_repo() {
        let (ns, repo) =
            split_remote_namespace_and_repo("https://github.com/acme/com.example.pkg.git").unwrap();
        assert_eq!(ns, "acme");
        assert_eq!(repo, "com.example.pkg");

        let (ns, repo) =
            split_remote_namespace_and_repo("https://gitlab.com/group/subgroup/pkg.git").unwrap();
        assert_eq!(ns, "group/subgroup");
        assert_eq!(repo, "pkg");

        assert!(split_remote_namespace_and_repo("https://github.com/onlyrepo").is_err());
    }

    #[test]
    fn extracts_host_without_port() {
        assert_eq!(
            remote_host("https://github.com/a/b.git").unwrap(),
            "github.com"
        );
        assert_eq!(
            remote_host("https://user@git.example.com:8443/a/b.git").unwrap(),
            "git.example.com"
        );
    }
}
