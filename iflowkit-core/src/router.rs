//! Branch → tenant routing and the PRD safety gate.

use crate::error::CoreError;
use crate::metadata::SyncMetadata;
use crate::types::TenantEnv;

/// Outcome of resolving the current branch against the landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub tenant: TenantEnv,
    /// True only for the exact env branches (dev/qas/prd).
    pub is_env_branch: bool,
}

/// Map the current git branch to a CPI tenant environment.
///
/// Rules:
/// - `dev` → dev
/// - `qas` → qas (only when `cpiTenantLevels == 3`)
/// - `prd` → prd
/// - `feature/*`, `bugfix/*` → dev (work branches)
pub fn resolve_target_tenant(
    meta: &SyncMetadata,
    branch: &str,
) -> Result<RouteDecision, CoreError> {
    let branch = branch.trim();
    if branch.is_empty() {
        return Err(CoreError::EmptyBranch);
    }

    let levels = meta.cpi_tenant_levels;
    match branch {
        "dev" => Ok(RouteDecision {
            tenant: TenantEnv::Dev,
            is_env_branch: true,
        }),
        "qas" => {
            if levels != 3 {
                return Err(CoreError::QasNotEnabled { levels });
            }
            Ok(RouteDecision {
                tenant: TenantEnv::Qas,
                is_env_branch: true,
            })
        }
        "prd" => {
            if levels != 2 && levels != 3 {
                return Err(CoreError::InvalidTenantLevels { levels });
            }
            Ok(RouteDecision {
                tenant: TenantEnv::Prd,
                is_env_branch: true,
            })
        }
        other => {
            if other.starts_with("feature/") || other.starts_with("bugfix/") {
                return Ok(RouteDecision {
                    tenant: TenantEnv::Dev,
                    is_env_branch: false,
                });
            }
            Err(CoreError::UnsupportedBranch {
                branch: other.to_string(),
                allowed: allowed_branches(levels),
            })
        }
    }
}

/// The env branches legal for this landscape, omitting qas on 2 tiers.
pub fn allowed_env_branches(levels: u8) -> String {
    if levels == 3 {
        "dev, qas, prd".to_string()
    } else {
        "dev, prd".to_string()
    }
}

/// Render the allow-list for error messages, omitting qas on 2-tier landscapes.
pub fn allowed_branches(levels: u8) -> String {
    format!("{}, feature/*, bugfix/*", allowed_env_branches(levels))
}

/// Whether `sync push` accepts the branch at all.
pub fn is_allowed_push_branch(branch: &str) -> bool {
    let branch = branch.trim();
    matches!(branch, "dev" | "qas" | "prd")
        || branch.starts_with("feature/")
        || branch.starts_with("bugfix/")
}

/// Enforce the PRD safety rule.
///
/// If the resolved tenant is PRD, `--to prd` is mandatory. A `--to` passed
/// for any other tenant must match the resolved tenant.
pub fn validate_to_flag(to: Option<TenantEnv>, tenant: TenantEnv) -> Result<(), CoreError> {
    if tenant == TenantEnv::Prd {
        if to != Some(TenantEnv::Prd) {
            return Err(CoreError::PrdConfirmationRequired);
        }
        return Ok(());
    }
    match to {
        None => Ok(()),
        Some(t) if t == tenant => Ok(()),
        Some(t) => Err(CoreError::ToFlagMismatch { to: t, tenant }),
    }
}
