//! Domain types shared across the sync engine.
//!
//! The artifact kind table is the single source of truth for the
//! kind → entity-set / deploy-endpoint / deletable / deploy-required
//! mapping consulted by both the push and deliver flows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

/// Design-time artifact categories of a CPI Integration Package.
///
/// The serialized form equals the export folder name under the content
/// folder (`iFlows/`, `ValueMappings/`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    #[serde(rename = "iFlows")]
    IFlows,
    #[serde(rename = "ValueMappings")]
    ValueMappings,
    #[serde(rename = "MessageMappings")]
    MessageMappings,
    #[serde(rename = "Scripts")]
    Scripts,
    #[serde(rename = "CustomTags")]
    CustomTags,
}

/// One row of the kind table.
struct KindSpec {
    folder: &'static str,
    /// OData entity set for update/delete; `None` means writes are no-ops.
    entity_set: Option<&'static str>,
    /// Sub-collection segment of `IntegrationPackages('<id>')` for listing,
    /// also the stem of the exported `<ListFile>.json`.
    list_segment: &'static str,
    /// Function-import name used to deploy; `None` means the kind never deploys.
    deploy_endpoint: Option<&'static str>,
    deletable: bool,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::IFlows,
        ArtifactKind::ValueMappings,
        ArtifactKind::MessageMappings,
        ArtifactKind::Scripts,
        ArtifactKind::CustomTags,
    ];

    fn spec(self) -> &'static KindSpec {
        const IFLOWS: KindSpec = KindSpec {
            folder: "iFlows",
            entity_set: Some("IntegrationDesigntimeArtifacts"),
            list_segment: "IntegrationDesigntimeArtifacts",
            deploy_endpoint: Some("DeployIntegrationDesigntimeArtifact"),
            deletable: true,
        };
        const VALUE_MAPPINGS: KindSpec = KindSpec {
            folder: "ValueMappings",
            entity_set: Some("ValueMappingDesigntimeArtifacts"),
            list_segment: "ValueMappingDesigntimeArtifacts",
            deploy_endpoint: Some("DeployValueMappingDesigntimeArtifact"),
            deletable: true,
        };
        const MESSAGE_MAPPINGS: KindSpec = KindSpec {
            folder: "MessageMappings",
            entity_set: Some("MessageMappingDesigntimeArtifacts"),
            list_segment: "MessageMappingDesigntimeArtifacts",
            deploy_endpoint: Some("DeployMessageMappingDesigntimeArtifact"),
            deletable: true,
        };
        const SCRIPTS: KindSpec = KindSpec {
            folder: "Scripts",
            entity_set: Some("ScriptCollectionDesigntimeArtifacts"),
            list_segment: "ScriptCollectionDesigntimeArtifacts",
            deploy_endpoint: Some("DeployScriptCollectionDesigntimeArtifact"),
            deletable: true,
        };
        const CUSTOM_TAGS: KindSpec = KindSpec {
            folder: "CustomTags",
            entity_set: None,
            list_segment: "CustomTags",
            deploy_endpoint: None,
            deletable: false,
        };
        match self {
            ArtifactKind::IFlows => &IFLOWS,
            ArtifactKind::ValueMappings => &VALUE_MAPPINGS,
            ArtifactKind::MessageMappings => &MESSAGE_MAPPINGS,
            ArtifactKind::Scripts => &SCRIPTS,
            ArtifactKind::CustomTags => &CUSTOM_TAGS,
        }
    }

    /// The export folder name (also the serialized representation).
    pub fn folder_name(self) -> &'static str {
        self.spec().folder
    }

    /// OData entity set used for update and delete operations.
    pub fn entity_set(self) -> Option<&'static str> {
        self.spec().entity_set
    }

    /// Sub-collection segment for listing under the package entity.
    pub fn list_segment(self) -> &'static str {
        self.spec().list_segment
    }

    /// File name of the exported list JSON (`<segment>.json`).
    pub fn list_file(self) -> String {
        format!("{}.json", self.spec().list_segment)
    }

    /// Function-import name used to deploy the kind.
    pub fn deploy_endpoint(self) -> Option<&'static str> {
        self.spec().deploy_endpoint
    }

    /// Whether a missing local folder translates into a CPI delete.
    pub fn is_deletable(self) -> bool {
        self.spec().deletable
    }

    /// Whether a successful upload must be followed by a deploy.
    pub fn requires_deploy(self) -> bool {
        self.spec().deploy_endpoint.is_some()
    }

    /// Parse from an export folder name.
    pub fn from_folder(name: &str) -> Option<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .find(|k| k.folder_name() == name)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

// Stable output order is lexicographic by folder name, not declaration order.
impl Ord for ArtifactKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folder_name().cmp(other.folder_name())
    }
}

impl PartialOrd for ArtifactKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Artifact keys
// ---------------------------------------------------------------------------

/// Identifies one artifact by kind folder and CPI artifact id.
///
/// Serves as the element type of transport `objects`, `deletedObjects` and
/// all three `*Remaining` lists; the JSON shape is `{"kind": ..., "id": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub kind: ArtifactKind,
    pub id: String,
}

impl ArtifactKey {
    pub fn new(kind: ArtifactKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// Tenant environments
// ---------------------------------------------------------------------------

/// One tier of the CPI landscape. QAS only exists in 3-tier profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantEnv {
    Dev,
    Qas,
    Prd,
}

impl TenantEnv {
    pub const ALL: [TenantEnv; 3] = [TenantEnv::Dev, TenantEnv::Qas, TenantEnv::Prd];

    pub fn as_str(self) -> &'static str {
        match self {
            TenantEnv::Dev => "dev",
            TenantEnv::Qas => "qas",
            TenantEnv::Prd => "prd",
        }
    }

    /// Upper-case rendering for user-facing messages ("DEV tenant not found").
    pub fn display_upper(self) -> &'static str {
        match self {
            TenantEnv::Dev => "DEV",
            TenantEnv::Qas => "QAS",
            TenantEnv::Prd => "PRD",
        }
    }
}

impl fmt::Display for TenantEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantEnv {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(TenantEnv::Dev),
            "qas" => Ok(TenantEnv::Qas),
            "prd" => Ok(TenantEnv::Prd),
            other => Err(CoreError::InvalidEnv(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_table_columns() {
        assert_eq!(
            ArtifactKind::IFlows.entity_set(),
            Some("IntegrationDesigntimeArtifacts")
        );
        assert_eq!(
            ArtifactKind::Scripts.deploy_endpoint(),
            Some("DeployScriptCollectionDesigntimeArtifact")
        );
        assert_eq!(ArtifactKind::CustomTags.entity_set(), None);
        assert!(!ArtifactKind::CustomTags.is_deletable());
        assert!(!ArtifactKind::CustomTags.requires_deploy());
        for kind in [
            ArtifactKind::IFlows,
            ArtifactKind::ValueMappings,
            ArtifactKind::MessageMappings,
            ArtifactKind::Scripts,
        ] {
            assert!(kind.is_deletable());
            assert!(kind.requires_deploy());
        }
    }

    #[test]
    fn kind_roundtrips_through_folder_name() {
        for kind in ArtifactKind::ALL {
            assert_eq!(ArtifactKind::from_folder(kind.folder_name()), Some(kind));
        }
        assert_eq!(ArtifactKind::from_folder("Unknown"), None);
    }

    #[test]
    fn kind_order_is_lexicographic_by_folder() {
        let mut kinds = ArtifactKind::ALL.to_vec();
        kinds.sort();
        let folders: Vec<&str> = kinds.iter().map(|k| k.folder_name()).collect();
        let mut expected: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.folder_name()).collect();
        expected.sort();
        assert_eq!(folders, expected);
        // ASCII order puts the capitalised folders before "iFlows".
        assert_eq!(folders.last(), Some(&"iFlows"));
    }

    #[test]
    fn key_order_is_kind_then_id() {
        let mut keys = vec![
            ArtifactKey::new(ArtifactKind::IFlows, "b"),
            ArtifactKey::new(ArtifactKind::IFlows, "a"),
            ArtifactKey::new(ArtifactKind::Scripts, "z"),
        ];
        keys.sort();
        assert_eq!(keys[0].kind, ArtifactKind::Scripts);
        assert_eq!(keys[1].id, "a");
        assert_eq!(keys[2].id, "b");
    }

    #[test]
    fn key_serde_shape() {
        let key = ArtifactKey::new(ArtifactKind::IFlows, "Order_Create");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"kind":"iFlows","id":"Order_Create"}"#);
        let back: ArtifactKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn tenant_env_parse_and_display() {
        assert_eq!("dev".parse::<TenantEnv>().unwrap(), TenantEnv::Dev);
        assert_eq!(" QAS ".parse::<TenantEnv>().unwrap(), TenantEnv::Qas);
        assert_eq!(TenantEnv::Prd.to_string(), "prd");
        assert_eq!(TenantEnv::Prd.display_upper(), "PRD");
        assert!("staging".parse::<TenantEnv>().is_err());
    }
}
