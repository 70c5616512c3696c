//! Read paths for the user config store.
//!
//! **Core API** (`_at` variants): accept an explicit config root — used in
//! tests with `TempDir` so that no test ever touches the real config dir.
//!
//! Layout under `<config_dir>/iflowkit/`:
//!
//! ```text
//! active_profile                    (single line: profile id)
//! profiles/<id>/profile.json
//! profiles/<id>/tenants/<env>.json
//! ```

use std::path::PathBuf;

use crate::error::{io_err, CoreError};
use crate::fsio::atomic_write_file;
use crate::profile::{Profile, TenantServiceKey};
use crate::types::TenantEnv;

/// Resolved locations inside the config store.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_root: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_profile_file: PathBuf,
}

impl Paths {
    /// Root the store at an explicit directory (tests, `--config-root`).
    pub fn at(config_root: impl Into<PathBuf>) -> Paths {
        let config_root = config_root.into();
        Paths {
            profiles_dir: config_root.join("profiles"),
            active_profile_file: config_root.join("active_profile"),
            config_root,
        }
    }

    /// Root the store at the platform config dir (`<config_dir>/iflowkit`).
    pub fn new() -> Result<Paths, CoreError> {
        let base = dirs::config_dir().ok_or(CoreError::ConfigDirNotFound)?;
        Ok(Paths::at(base.join("iflowkit")))
    }

    pub fn profile_file(&self, profile_id: &str) -> PathBuf {
        self.profiles_dir.join(profile_id).join("profile.json")
    }

    pub fn tenant_file(&self, profile_id: &str, env: TenantEnv) -> PathBuf {
        self.profiles_dir
            .join(profile_id)
            .join("tenants")
            .join(format!("{env}.json"))
    }
}

/// Resolve the effective profile id: an explicit flag wins, then the
/// `active_profile` file.
pub fn resolve_profile_id(paths: &Paths, explicit: Option<&str>) -> Result<String, CoreError> {
    if let Some(id) = explicit {
        let id = id.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }
    if let Ok(contents) = std::fs::read_to_string(&paths.active_profile_file) {
        let id = contents.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }
    Err(CoreError::NoProfileSelected)
}

/// Load and validate a profile.
pub fn read_profile(paths: &Paths, profile_id: &str) -> Result<Profile, CoreError> {
    let path = paths.profile_file(profile_id);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let profile: Profile =
        serde_json::from_str(&contents).map_err(|e| CoreError::Json { path, source: e })?;
    profile.validate_required()?;
    Ok(profile)
}

/// Load and validate a tenant service key; a missing file maps to the
/// import hint error.
pub fn read_tenant_key(
    paths: &Paths,
    profile_id: &str,
    env: TenantEnv,
) -> Result<TenantServiceKey, CoreError> {
    let path = paths.tenant_file(profile_id, env);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::TenantKeyMissing {
                profile: profile_id.to_string(),
                env,
            })
        }
        Err(e) => return Err(io_err(&path, e)),
    };
    let key: TenantServiceKey =
        serde_json::from_str(&contents).map_err(|e| CoreError::Json { path, source: e })?;
    key.validate_required()?;
    Ok(key)
}

/// Write a profile (used by tests and the profile tooling).
pub fn write_profile(paths: &Paths, profile: &Profile) -> Result<(), CoreError> {
    profile.validate_required()?;
    let data = serde_json::to_vec_pretty(profile)?;
    atomic_write_file(&paths.profile_file(&profile.id), &data)
}

/// Write a tenant service key.
pub fn write_tenant_key(
    paths: &Paths,
    profile_id: &str,
    env: TenantEnv,
    key: &TenantServiceKey,
) -> Result<(), CoreError> {
    key.validate_required()?;
    let data = serde_json::to_vec_pretty(key)?;
    atomic_write_file(&paths.tenant_file(profile_id, env), &data)
}

/// Record the active profile id.
pub fn set_active_profile(paths: &Paths, profile_id: &str) -> Result<(), CoreError> {
    atomic_write_file(&paths.active_profile_file, profile_id.as_bytes())
}
