//! Profile and tenant service-key models.
//!
//! Field names follow the on-disk JSON produced by the profile tooling:
//! profiles keep a snake_case `schema_version` while the CPI-facing fields
//! are camelCase; service keys use the flat lowercase names of the CPI
//! service-key export.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A landscape profile (`profiles/<id>/profile.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Profile {
    pub schema_version: u32,
    pub id: String,
    pub name: String,
    #[serde(rename = "gitServerUrl")]
    pub git_server_url: String,
    #[serde(rename = "cpiPath")]
    pub cpi_path: String,
    #[serde(rename = "cpiTenantLevels")]
    pub cpi_tenant_levels: u8,
}

impl Profile {
    pub fn validate_required(&self) -> Result<(), CoreError> {
        let file = "profile.json".to_string();
        let missing = |field| CoreError::MissingField {
            file: file.clone(),
            field,
        };
        if self.schema_version == 0 {
            return Err(missing("schema_version"));
        }
        if self.id.is_empty() {
            return Err(missing("id"));
        }
        if self.name.is_empty() {
            return Err(missing("name"));
        }
        if self.git_server_url.is_empty() {
            return Err(missing("gitServerUrl"));
        }
        if self.cpi_path.is_empty() {
            return Err(missing("cpiPath"));
        }
        if self.cpi_tenant_levels != 2 && self.cpi_tenant_levels != 3 {
            return Err(CoreError::InvalidTenantLevels {
                levels: self.cpi_tenant_levels,
            });
        }
        Ok(())
    }
}

/// OAuth block of a tenant service key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TenantOAuth {
    pub createdate: String,
    pub clientid: String,
    pub clientsecret: String,
    pub tokenurl: String,
    pub url: String,
}

/// A CPI tenant service key (`profiles/<id>/tenants/<env>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TenantServiceKey {
    pub oauth: TenantOAuth,
}

impl TenantServiceKey {
    pub fn validate_required(&self) -> Result<(), CoreError> {
        let file = "tenant service key".to_string();
        let missing = |field| CoreError::MissingField {
            file: file.clone(),
            field,
        };
        if self.oauth.url.is_empty() {
            return Err(missing("oauth.url"));
        }
        if self.oauth.tokenurl.is_empty() {
            return Err(missing("oauth.tokenurl"));
        }
        if self.oauth.clientid.is_empty() {
            return Err(missing("oauth.clientid"));
        }
        if self.oauth.clientsecret.is_empty() {
            return Err(missing("oauth.clientsecret"));
        }
        if self.oauth.createdate.is_empty() {
            return Err(missing("oauth.createdate"));
        }
        Ok(())
    }
}
