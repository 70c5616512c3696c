//! The CPI OData client.
//!
//! One client instance serves one tenant for the duration of a command.
//! The OAuth token cache lives inside the instance; there is no shared
//! process-wide state.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use iflowkit_core::archive::extract_zip_bytes;
use iflowkit_core::fsio::{atomic_write_file, ensure_dir};
use iflowkit_core::profile::TenantServiceKey;
use iflowkit_core::types::ArtifactKind;

use crate::error::CpiError;

/// Refresh the cached token this long before its actual expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);
/// Applied when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// Escape an OData string literal used inside single quotes.
///
/// CPI OData endpoints delimit key values with single quotes; quotes inside
/// the value are doubled.
pub fn escape_odata_id(id: &str) -> String {
    id.replace('\'', "''")
}

/// Parsed main payload of `IntegrationPackages('<id>')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationPackage {
    pub id: String,
    pub name: String,
}

/// Read/write information for one design-time artifact.
///
/// Uploads go through a JSON payload with a base64 zip (`ArtifactContent`);
/// `media_src` is only reliable for downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub uri: String,
    pub media_src: String,
    pub edit_media: String,
}

/// Simplified view of `IntegrationRuntimeArtifacts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeArtifactStatus {
    pub id: String,
    pub name: String,
    pub status: String,
    pub deployed_on: String,
}

/// CSRF token + session cookies required for OData writes.
#[derive(Debug, Clone)]
pub struct CsrfSession {
    pub token: String,
    pub cookie_header: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Blocking CPI API client with a per-instance OAuth token cache.
pub struct CpiClient {
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    agent: ureq::Agent,
    token: Option<CachedToken>,
}

impl CpiClient {
    pub fn new(key: &TenantServiceKey) -> CpiClient {
        CpiClient {
            base_url: key.oauth.url.trim_end_matches('/').to_string(),
            token_url: key.oauth.tokenurl.clone(),
            client_id: key.oauth.clientid.clone(),
            client_secret: key.oauth.clientsecret.clone(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(60))
                .build(),
            token: None,
        }
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// The token endpoint with `grant_type=client_credentials` appended when
    /// the configured URL does not already carry a grant type.
    fn token_request_url(&self) -> String {
        let has_grant_type = self
            .token_url
            .split_once('?')
            .map(|(_, query)| query.split('&').any(|p| p.starts_with("grant_type=")))
            .unwrap_or(false);
        if has_grant_type {
            self.token_url.clone()
        } else if self.token_url.contains('?') {
            format!("{}&grant_type=client_credentials", self.token_url)
        } else {
            format!("{}?grant_type=client_credentials", self.token_url)
        }
    }

    fn token(&mut self) -> Result<String, CpiError> {
        if let Some(cached) = &self.token {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let url = self.token_request_url();
        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .agent
            .post(&url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Basic {basic}"))
            .call();

        let body = match response {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| CpiError::Transport(e.to_string()))?,
            Err(ureq::Error::Status(_, resp)) => {
                let body = resp.into_string().unwrap_or_default().trim().to_string();
                return Err(CpiError::Token(body));
            }
            Err(e) => return Err(CpiError::Transport(e.to_string())),
        };

        #[derive(Deserialize)]
        struct TokenResponse {
            #[serde(default)]
            access_token: String,
            #[serde(default)]
            expires_in: Option<u64>,
        }
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CpiError::InvalidTokenResponse(e.to_string()))?;
        if parsed.access_token.is_empty() {
            return Err(CpiError::MissingAccessToken);
        }

        let lifetime = parsed
            .expires_in
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        self.token = Some(CachedToken {
            value: parsed.access_token.clone(),
            expires_at,
        });
        Ok(parsed.access_token)
    }

    /// Fetch a CSRF token plus the session cookies write operations need.
    pub fn fetch_csrf_token(&mut self) -> Result<CsrfSession, CpiError> {
        let token = self.token()?;
        let url = format!("{}/api/v1/IntegrationPackages?$top=1", self.base_url);
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {token}"))
            .set("X-CSRF-Token", "Fetch")
            .call();

        let resp = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                return Err(CpiError::HttpStatus {
                    context: "CSRF token fetch failed",
                    status,
                    status_line: format!("{status} {}", resp.status_text()),
                    body: resp.into_string().unwrap_or_default().trim().to_string(),
                })
            }
            Err(e) => return Err(CpiError::Transport(e.to_string())),
        };

        let csrf = resp.header("X-CSRF-Token").unwrap_or("").trim().to_string();
        let cookie_header = join_set_cookies(&resp.all("Set-Cookie"));
        if csrf.is_empty() {
            return Err(CpiError::CsrfMissing);
        }
        Ok(CsrfSession {
            token: csrf,
            cookie_header,
        })
    }

    // -----------------------------------------------------------------------
    // HTTP plumbing
    // -----------------------------------------------------------------------

    fn absolute_url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with('/') {
            format!("{}{}", self.base_url, path_or_url)
        } else {
            path_or_url.to_string()
        }
    }

    /// Authorized GET returning the raw body bytes.
    fn get_raw(&mut self, path_or_url: &str, accept: &str) -> Result<Vec<u8>, CpiError> {
        let token = self.token()?;
        let url = self.absolute_url(path_or_url);
        let response = self
            .agent
            .get(&url)
            .set("Accept", accept)
            .set("Authorization", &format!("Bearer {token}"))
            .call();
        match response {
            Ok(resp) => {
                let mut bytes = Vec::new();
                resp.into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| CpiError::Transport(e.to_string()))?;
                Ok(bytes)
            }
            Err(ureq::Error::Status(status, resp)) => Err(CpiError::HttpStatus {
                context: "CPI request failed",
                status,
                status_line: format!("{status} {}", resp.status_text()),
                body: resp.into_string().unwrap_or_default().trim().to_string(),
            }),
            Err(e) => Err(CpiError::Transport(e.to_string())),
        }
    }

    /// Authorized write (PUT/POST/DELETE) with CSRF headers; discards the
    /// response body on success.
    fn write_request(
        &mut self,
        method: &str,
        path_or_url: &str,
        body: Option<&str>,
        session: &CsrfSession,
        context: &'static str,
        if_match: bool,
    ) -> Result<(), CpiError> {
        let token = self.token()?;
        let url = self.absolute_url(path_or_url);
        let mut req = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json")
            .set("Authorization", &format!("Bearer {token}"));
        if body.is_some() {
            req = req.set("Content-Type", "application/json");
        }
        if if_match {
            // Avoid ETag handling on OData updates/deletes.
            req = req.set("If-Match", "*");
        }
        if !session.token.is_empty() {
            req = req.set("X-CSRF-Token", &session.token);
        }
        if !session.cookie_header.is_empty() {
            req = req.set("Cookie", &session.cookie_header);
        }

        let response = match body {
            Some(body) => req.send_string(body),
            None => req.call(),
        };
        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, resp)) => Err(CpiError::HttpStatus {
                context,
                status,
                status_line: format!("{status} {}", resp.status_text()),
                body: resp.into_string().unwrap_or_default().trim().to_string(),
            }),
            Err(e) => Err(CpiError::Transport(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Read the main `IntegrationPackages('<id>')` payload; returns the
    /// parsed metadata plus the raw JSON (preserved for export).
    pub fn read_integration_package(
        &mut self,
        package_id: &str,
    ) -> Result<(IntegrationPackage, Vec<u8>), CpiError> {
        let path = format!(
            "/api/v1/IntegrationPackages('{}')",
            escape_odata_id(package_id)
        );
        let raw = self.get_raw(&path, "application/json")?;

        #[derive(Deserialize)]
        struct PackageResponse {
            d: PackageBody,
        }
        #[derive(Deserialize)]
        struct PackageBody {
            #[serde(rename = "Id", default)]
            id: String,
            #[serde(rename = "Name", default)]
            name: String,
        }
        let parsed: PackageResponse = serde_json::from_slice(&raw)
            .map_err(|e| CpiError::InvalidResponse(e.to_string()))?;
        Ok((
            IntegrationPackage {
                id: parsed.d.id,
                name: parsed.d.name,
            },
            raw,
        ))
    }

    /// The list endpoint for one kind sub-collection of a package.
    pub fn list_endpoint_for_kind(package_id: &str, kind: ArtifactKind) -> String {
        format!(
            "/api/v1/IntegrationPackages('{}')/{}",
            escape_odata_id(package_id),
            kind.list_segment()
        )
    }

    /// Fetch an artifact list endpoint into `id → ArtifactInfo`.
    pub fn list_artifacts(
        &mut self,
        list_endpoint: &str,
    ) -> Result<HashMap<String, ArtifactInfo>, CpiError> {
        let raw = self.get_raw(list_endpoint, "application/json")?;
        let items = parse_artifact_list(&raw)?;
        Ok(items
            .into_iter()
            .filter(|info| !info.id.is_empty())
            .map(|info| (info.id.clone(), info))
            .collect())
    }

    /// Runtime deployment status for an artifact id; `None` when the
    /// artifact is not deployed.
    pub fn get_integration_runtime_artifact(
        &mut self,
        id: &str,
    ) -> Result<Option<RuntimeArtifactStatus>, CpiError> {
        let path = format!(
            "/api/v1/IntegrationRuntimeArtifacts?$top=1&$filter=Id%20eq%20'{}'",
            escape_odata_id(id).replace(' ', "%20")
        );
        let raw = self.get_raw(&path, "application/json")?;

        #[derive(Deserialize)]
        struct RuntimeResponse {
            d: RuntimeBody,
        }
        #[derive(Deserialize)]
        struct RuntimeBody {
            #[serde(default)]
            results: Vec<RuntimeItem>,
        }
        #[derive(Deserialize)]
        struct RuntimeItem {
            #[serde(rename = "Id", default)]
            id: String,
            #[serde(rename = "Name", default)]
            name: String,
            #[serde(rename = "Status", default)]
            status: String,
            #[serde(rename = "DeployedOn", default)]
            deployed_on: String,
        }
        let parsed: RuntimeResponse = serde_json::from_slice(&raw)
            .map_err(|e| CpiError::InvalidResponse(e.to_string()))?;
        Ok(parsed.d.results.into_iter().next().map(|it| {
            RuntimeArtifactStatus {
                id: it.id.trim().to_string(),
                name: it.name.trim().to_string(),
                status: it.status.trim().to_string(),
                deployed_on: it.deployed_on.trim().to_string(),
            }
        }))
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Materialize a package export under `dest_dir`: the raw main JSON as
    /// `IntegrationPackage.json`, then per kind the list JSON and every
    /// artifact with a media link extracted to `<Kind>/<id>/`.
    ///
    /// List fetch failures are soft (some packages lack certain artifact
    /// types); download/extract failures are hard.
    pub fn export_integration_package_from_raw(
        &mut self,
        package_id: &str,
        raw_main_json: &[u8],
        dest_dir: &Path,
    ) -> Result<(), CpiError> {
        ensure_dir(dest_dir)?;
        atomic_write_file(&dest_dir.join("IntegrationPackage.json"), raw_main_json)?;

        for kind in ArtifactKind::ALL {
            self.export_artifact_set(package_id, kind, dest_dir)?;
        }
        Ok(())
    }

    fn export_artifact_set(
        &mut self,
        package_id: &str,
        kind: ArtifactKind,
        dest_dir: &Path,
    ) -> Result<(), CpiError> {
        let folder = dest_dir.join(kind.folder_name());
        ensure_dir(&folder)?;

        tracing::info!(folder = kind.folder_name(), "reading CPI artifacts");
        let endpoint = Self::list_endpoint_for_kind(package_id, kind);
        let list_json = match self.get_raw(&endpoint, "application/json") {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    folder = kind.folder_name(),
                    error = %err,
                    "artifact list request failed"
                );
                return Ok(());
            }
        };
        atomic_write_file(&folder.join(kind.list_file()), &list_json)?;

        for info in parse_artifact_list(&list_json)? {
            if info.id.is_empty() || info.media_src.is_empty() {
                continue;
            }
            tracing::info!(folder = kind.folder_name(), id = %info.id, "downloading artifact");
            let zip_bytes = self.get_raw(&info.media_src, "application/zip")?;
            extract_zip_bytes(&zip_bytes, &folder.join(&info.id))?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Upload artifact content as a base64 zip via the Integration Content
    /// API (`PUT` on the entity URL with `ArtifactContent`).
    pub fn update_artifact(
        &mut self,
        entity_set: &str,
        info: &ArtifactInfo,
        zip_bytes: &[u8],
        session: &CsrfSession,
    ) -> Result<(), CpiError> {
        let uri = if !info.uri.is_empty() {
            info.uri.clone()
        } else if !info.version.is_empty() {
            // CPI did not return an entity URL; construct one.
            format!(
                "{}/api/v1/{}(Id='{}',Version='{}')",
                self.base_url,
                entity_set,
                escape_odata_id(&info.id),
                escape_odata_id(&info.version)
            )
        } else {
            return Err(CpiError::MissingArtifactUri {
                id: info.id.clone(),
            });
        };

        let mut payload = serde_json::json!({
            "ArtifactContent": BASE64.encode(zip_bytes),
        });
        if !info.name.is_empty() {
            payload["Name"] = serde_json::json!(info.name);
        }

        self.write_request(
            "PUT",
            &uri,
            Some(&payload.to_string()),
            session,
            "CPI upload failed",
            true,
        )
    }

    /// OData `DELETE` of a design-time artifact. An empty version omits the
    /// Version key from the entity URL.
    pub fn delete_artifact(
        &mut self,
        entity_set: &str,
        id: &str,
        version: Option<&str>,
        session: &CsrfSession,
    ) -> Result<(), CpiError> {
        let path = match version.filter(|v| !v.trim().is_empty()) {
            Some(version) => format!(
                "/api/v1/{}(Id='{}',Version='{}')",
                entity_set,
                escape_odata_id(id),
                escape_odata_id(version)
            ),
            None => format!("/api/v1/{}(Id='{}')", entity_set, escape_odata_id(id)),
        };
        self.write_request("DELETE", &path, None, session, "CPI request failed", true)
    }

    /// Delete an artifact by kind.
    ///
    /// iFlows first try `IntegrationAdapterDesigntimeArtifacts` without a
    /// version; a 400/404 falls back to the standard entity set with
    /// `Version='active'`. `CustomTags` deletes are unsupported no-ops.
    pub fn delete_artifact_by_kind(
        &mut self,
        kind: ArtifactKind,
        id: &str,
        session: &CsrfSession,
    ) -> Result<(), CpiError> {
        match kind {
            ArtifactKind::IFlows => {
                match self.delete_artifact(
                    "IntegrationAdapterDesigntimeArtifacts",
                    id,
                    None,
                    session,
                ) {
                    Ok(()) => Ok(()),
                    Err(err) if err.is_not_found() || err.is_bad_request() => self.delete_artifact(
                        "IntegrationDesigntimeArtifacts",
                        id,
                        Some("active"),
                        session,
                    ),
                    Err(err) => Err(err),
                }
            }
            other => match other.entity_set() {
                Some(entity_set) => self.delete_artifact(entity_set, id, Some("active"), session),
                None => Ok(()),
            },
        }
    }

    /// Trigger a deployment via the kind's function import.
    ///
    /// The version is always `active`: deploying the concrete version from
    /// list responses does not reliably trigger a deployment.
    pub fn deploy_artifact(
        &mut self,
        kind: ArtifactKind,
        id: &str,
        session: &CsrfSession,
    ) -> Result<(), CpiError> {
        let Some(endpoint) = kind.deploy_endpoint() else {
            return Ok(());
        };
        let path = format!(
            "/api/v1/{}?Id='{}'&Version='active'",
            endpoint,
            escape_odata_id(id)
        );
        self.write_request("POST", &path, None, session, "CPI deploy failed", false)
    }
}

/// Concatenate the name=value part of all Set-Cookie headers with `; `.
fn join_set_cookies(set_cookie_headers: &[&str]) -> String {
    let parts: Vec<&str> = set_cookie_headers
        .iter()
        .filter_map(|sc| sc.split(';').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    parts.join("; ")
}

fn parse_artifact_list(raw: &[u8]) -> Result<Vec<ArtifactInfo>, CpiError> {
    #[derive(Deserialize)]
    struct ListResponse {
        d: ListBody,
    }
    #[derive(Deserialize)]
    struct ListBody {
        #[serde(default)]
        results: Vec<ListItem>,
    }
    #[derive(Deserialize)]
    struct ListItem {
        #[serde(rename = "Id", default)]
        id: String,
        #[serde(rename = "Name", default)]
        name: String,
        #[serde(rename = "Version", default)]
        version: String,
        #[serde(rename = "__metadata", default)]
        metadata: ListItemMetadata,
    }
    #[derive(Deserialize, Default)]
    struct ListItemMetadata {
        #[serde(default)]
        uri: String,
        #[serde(default)]
        media_src: String,
        #[serde(default)]
        edit_media: String,
    }

    let parsed: ListResponse =
        serde_json::from_slice(raw).map_err(|e| CpiError::InvalidResponse(e.to_string()))?;
    Ok(parsed
        .d
        .results
        .into_iter()
        .map(|it| ArtifactInfo {
            id: it.id.trim().to_string(),
            name: it.name.trim().to_string(),
            version: it.version.trim().to_string(),
            uri: it.metadata.uri.trim().to_string(),
            media_src: it.metadata.media_src.trim().to_string(),
            edit_media: it.metadata.edit_media.trim().to_string(),
        })
        .collect())
}
