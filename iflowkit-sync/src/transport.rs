//! Transport records, the per-env index, and id generation.
//!
//! A transport record is the checkpoint for one run of the engine. The
//! `*Remaining` lists shrink monotonically as CPI steps succeed and the
//! record is re-persisted after every unit of work, making a failed run
//! resumable without duplicating mutations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use iflowkit_core::fsio::{atomic_write_file, ensure_dir};
use iflowkit_core::metadata::MARKER_DIR;
use iflowkit_core::types::{ArtifactKey, TenantEnv};

use crate::error::SyncError;

const RECORD_EXT: &str = ".transport.json";
const INDEX_FILE: &str = "index.json";
const SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The operation a transport record belongs to. Unknown values normalize
/// to `push` on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportType {
    Init,
    Pull,
    Push,
    Deliver,
}

impl TransportType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportType::Init => "init",
            TransportType::Pull => "pull",
            TransportType::Push => "push",
            TransportType::Deliver => "deliver",
        }
    }
}

impl From<String> for TransportType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "init" => TransportType::Init,
            "pull" => TransportType::Pull,
            "deliver" => TransportType::Deliver,
            _ => TransportType::Push,
        }
    }
}

impl From<TransportType> for String {
    fn from(t: TransportType) -> String {
        t.as_str().to_string()
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion state. Unknown values normalize to `pending` on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportStatus {
    Pending,
    Completed,
}

impl TransportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportStatus::Pending => "pending",
            TransportStatus::Completed => "completed",
        }
    }
}

impl From<String> for TransportStatus {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("completed") {
            TransportStatus::Completed
        } else {
            TransportStatus::Pending
        }
    }
}

impl From<TransportStatus> for String {
    fn from(s: TransportStatus) -> String {
        s.as_str().to_string()
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record + index
// ---------------------------------------------------------------------------

/// Stored at `.iflowkit/transports/<env>/<transportId>.transport.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRecord {
    pub schema_version: u32,
    pub transport_id: String,
    pub transport_type: TransportType,
    pub package_id: String,
    pub branch: String,
    pub created_at: String,

    /// Commit hashes pushed by this transport, oldest → newest.
    #[serde(default)]
    pub git_commits: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_user_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_user_email: String,

    /// Artifacts touched (changed/added) under this transport.
    #[serde(default)]
    pub objects: Vec<ArtifactKey>,

    /// Artifacts removed. For pull: deleted in CPI and removed from the
    /// repo. For push: deleted in the repo and removed from CPI.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_objects: Vec<ArtifactKey>,

    pub transport_status: TransportStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// Outstanding work for retry; shrinks as steps succeed.
    #[serde(default)]
    pub upload_remaining: Vec<ArtifactKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_remaining: Vec<ArtifactKey>,
    #[serde(default)]
    pub deploy_remaining: Vec<ArtifactKey>,
}

impl TransportRecord {
    pub fn new(
        transport_id: impl Into<String>,
        transport_type: TransportType,
        package_id: impl Into<String>,
        branch: impl Into<String>,
        created_at: impl Into<String>,
    ) -> TransportRecord {
        TransportRecord {
            schema_version: SCHEMA_VERSION,
            transport_id: transport_id.into(),
            transport_type,
            package_id: package_id.into(),
            branch: branch.into(),
            created_at: created_at.into(),
            git_commits: Vec::new(),
            git_user_name: String::new(),
            git_user_email: String::new(),
            objects: Vec::new(),
            deleted_objects: Vec::new(),
            transport_status: TransportStatus::Pending,
            error: String::new(),
            upload_remaining: Vec::new(),
            delete_remaining: Vec::new(),
            deploy_remaining: Vec::new(),
        }
    }

    /// No outstanding delete/upload/deploy work.
    pub fn remainders_empty(&self) -> bool {
        self.upload_remaining.is_empty()
            && self.delete_remaining.is_empty()
            && self.deploy_remaining.is_empty()
    }

    pub fn mark_completed(&mut self) {
        self.transport_status = TransportStatus::Completed;
        self.error.clear();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.transport_status = TransportStatus::Pending;
        self.error = error.into();
    }
}

/// Stored at `.iflowkit/transports/<env>/index.json`; the authoritative
/// ordering for "latest pending" lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransportIndex {
    pub schema_version: u32,
    #[serde(default)]
    pub items: Vec<TransportIndexItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportIndexItem {
    pub seq: u64,
    pub transport_id: String,
    pub transport_type: TransportType,
    pub transport_status: TransportStatus,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Generate `(transportId, createdAt)` for a wall-clock instant:
/// `YYYYMMDDTHHMMSSmmmZ` and RFC3339 at second precision, both UTC.
pub fn new_transport_ids(now: DateTime<Utc>) -> (String, String) {
    let created_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let millis = now.nanosecond() / 1_000_000;
    let transport_id = format!("{}{millis:03}Z", now.format("%Y%m%dT%H%M%S"));
    (transport_id, created_at)
}

/// Strip separators and whitespace so the id is a safe filename stem.
/// Canonical ids already lack these characters.
pub fn sanitize_transport_id(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | ':' | '.' | '+' | '/' | '\\') && !c.is_whitespace())
        .collect()
}

/// Strict, parseable commit message:
/// `<transportId> <transportType> <commitType> [<extra>]`.
pub fn build_transport_commit_message(
    transport_id: &str,
    transport_type: TransportType,
    commit_type: &str,
    extra: &str,
) -> String {
    let base = format!("{transport_id} {transport_type} {commit_type}");
    let extra = extra.trim();
    if extra.is_empty() {
        base
    } else {
        format!("{base} {extra}")
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Manages the per-env transport records and index. Exclusively owns
/// writes under `.iflowkit/transports/<env>/`.
#[derive(Debug, Clone)]
pub struct TransportStore {
    repo_root: PathBuf,
    env: TenantEnv,
}

impl TransportStore {
    pub fn new(repo_root: &Path, env: TenantEnv) -> TransportStore {
        TransportStore {
            repo_root: repo_root.to_path_buf(),
            env,
        }
    }

    pub fn env_dir(&self) -> PathBuf {
        self.repo_root
            .join(MARKER_DIR)
            .join("transports")
            .join(self.env.as_str())
    }

    pub fn record_path(&self, transport_id: &str) -> PathBuf {
        self.env_dir()
            .join(format!("{}{RECORD_EXT}", sanitize_transport_id(transport_id)))
    }

    fn index_path(&self) -> PathBuf {
        self.env_dir().join(INDEX_FILE)
    }

    /// Save the record file atomically and upsert the index entry.
    pub fn persist(&self, rec: &TransportRecord) -> Result<PathBuf, SyncError> {
        if rec.transport_id.trim().is_empty() {
            return Err(SyncError::TransportIdRequired);
        }
        ensure_dir(&self.env_dir())?;

        let mut rec = rec.clone();
        if rec.schema_version == 0 {
            rec.schema_version = SCHEMA_VERSION;
        }
        let path = self.record_path(&rec.transport_id);
        let json = serde_json::to_vec_pretty(&rec)?;
        atomic_write_file(&path, &json)?;
        self.upsert_index(&rec)?;
        Ok(path)
    }

    pub fn load_record(&self, transport_id: &str) -> Result<TransportRecord, SyncError> {
        let path = self.record_path(transport_id);
        let raw = std::fs::read(&path).map_err(|e| SyncError::RecordRead {
            transport_id: transport_id.to_string(),
            reason: e.to_string(),
        })?;
        let rec: TransportRecord =
            serde_json::from_slice(&raw).map_err(|e| SyncError::RecordRead {
                transport_id: transport_id.to_string(),
                reason: format!("invalid transport record: {e}"),
            })?;
        Ok(rec)
    }

    fn load_index(&self) -> Result<Option<TransportIndex>, SyncError> {
        let path = self.index_path();
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(crate::error::io_err(&path, e)),
        };
        let mut idx: TransportIndex = serde_json::from_slice(&raw)?;
        if idx.schema_version == 0 {
            idx.schema_version = SCHEMA_VERSION;
        }
        Ok(Some(idx))
    }

    fn save_index(&self, idx: &TransportIndex) -> Result<(), SyncError> {
        let mut idx = idx.clone();
        if idx.schema_version == 0 {
            idx.schema_version = SCHEMA_VERSION;
        }
        let json = serde_json::to_vec_pretty(&idx)?;
        atomic_write_file(&self.index_path(), &json)?;
        Ok(())
    }

    fn upsert_index(&self, rec: &TransportRecord) -> Result<(), SyncError> {
        let mut idx = self.load_index()?.unwrap_or(TransportIndex {
            schema_version: SCHEMA_VERSION,
            items: Vec::new(),
        });

        if let Some(item) = idx
            .items
            .iter_mut()
            .find(|it| it.transport_id == rec.transport_id)
        {
            item.transport_type = rec.transport_type;
            item.transport_status = rec.transport_status;
            item.created_at = rec.created_at.clone();
            return self.save_index(&idx);
        }

        let next_seq = idx.items.iter().map(|it| it.seq).max().unwrap_or(0) + 1;
        idx.items.push(TransportIndexItem {
            seq: next_seq,
            transport_id: rec.transport_id.clone(),
            transport_type: rec.transport_type,
            transport_status: rec.transport_status,
            created_at: rec.created_at.clone(),
        });
        self.save_index(&idx)
    }

    /// The most recent record for this env: index last-item first, falling
    /// back to scanning all record files by max `createdAt` when the index
    /// is unusable.
    pub fn load_latest(&self) -> Result<Option<(TransportRecord, PathBuf)>, SyncError> {
        if let Ok(Some(idx)) = self.load_index() {
            if let Some(last) = idx.items.last() {
                if let Ok(rec) = self.load_record(&last.transport_id) {
                    let path = self.record_path(&last.transport_id);
                    return Ok(Some((rec, path)));
                }
            }
        }

        let dir = self.env_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(crate::error::io_err(&dir, e)),
        };

        let mut best: Option<(TransportRecord, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(RECORD_EXT) || !path.is_file() {
                continue;
            }
            let Ok(raw) = std::fs::read(&path) else {
                continue;
            };
            let Ok(rec) = serde_json::from_slice::<TransportRecord>(&raw) else {
                continue;
            };
            let newer = match &best {
                None => true,
                Some((current, _)) => parse_created_at(&rec.created_at)
                    > parse_created_at(&current.created_at),
            };
            if newer {
                best = Some((rec, path));
            }
        }
        Ok(best)
    }

    /// The most recent non-completed record matching all provided filters,
    /// scanning the index newest → oldest.
    pub fn load_latest_pending(
        &self,
        package_id: Option<&str>,
        branch: Option<&str>,
        transport_type: Option<TransportType>,
    ) -> Result<Option<(TransportRecord, PathBuf)>, SyncError> {
        let Some(idx) = self.load_index()? else {
            return Ok(None);
        };
        for item in idx.items.iter().rev() {
            if item.transport_status == TransportStatus::Completed {
                continue;
            }
            if let Some(ttype) = transport_type {
                if item.transport_type != ttype {
                    continue;
                }
            }
            let Ok(rec) = self.load_record(&item.transport_id) else {
                continue;
            };
            if let Some(pkg) = package_id {
                if rec.package_id != pkg {
                    continue;
                }
            }
            if let Some(branch) = branch {
                if rec.branch != branch {
                    continue;
                }
            }
            if let Some(ttype) = transport_type {
                if rec.transport_type != ttype {
                    continue;
                }
            }
            let path = self.record_path(&rec.transport_id);
            return Ok(Some((rec, path)));
        }
        Ok(None)
    }
}

fn parse_created_at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Key list helpers
// ---------------------------------------------------------------------------

/// Set-union `add` into `existing`, sorted by `(kind, id)`.
pub fn merge_keys(existing: &[ArtifactKey], add: impl IntoIterator<Item = ArtifactKey>) -> Vec<ArtifactKey> {
    let mut set: BTreeSet<ArtifactKey> = existing
        .iter()
        .filter(|k| !k.id.is_empty())
        .cloned()
        .collect();
    set.extend(add.into_iter().filter(|k| !k.id.is_empty()));
    set.into_iter().collect()
}

/// Remove one key from a remainder list, preserving order.
pub fn remove_key(list: &mut Vec<ArtifactKey>, key: &ArtifactKey) {
    list.retain(|it| it != key);
}

/// Merge two string lists into a sorted unique list (commit hashes,
/// path lists).
pub fn merge_unique_sorted(a: &[String], b: &[String]) -> Vec<String> {
    let set: BTreeSet<String> = a
        .iter()
        .chain(b.iter())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    set.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use iflowkit_core::types::ArtifactKind;
    use tempfile::TempDir;

    fn key(kind: ArtifactKind, id: &str) -> ArtifactKey {
        ArtifactKey::new(kind, id)
    }

    fn record(id: &str, ttype: TransportType) -> TransportRecord {
        let mut rec = TransportRecord::new(id, ttype, "com.example.pkg", "dev", "2026-01-02T03:04:05Z");
        rec.objects = vec![key(ArtifactKind::IFlows, "Flow_A")];
        rec
    }

    #[test]
    fn id_format_matches_utc_millis() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(67);
        let (id, created_at) = new_transport_ids(now);
        assert_eq!(id, "20260102T030405067Z");
        assert_eq!(created_at, "2026-01-02T03:04:05Z");
    }

    #[test]
    fn ids_increase_with_time() {
        let base = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let (a, _) = new_transport_ids(base + chrono::Duration::milliseconds(1));
        let (b, _) = new_transport_ids(base + chrono::Duration::milliseconds(2));
        assert!(b > a);
        // Same millisecond reuses the same id.
        let (c, _) = new_transport_ids(base + chrono::Duration::milliseconds(1));
        assert_eq!(a, c);
    }

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(
            sanitize_transport_id(" 2026-01-02T03:04:05.067+00:00 "),
            "20260102T0304050670000"
        );
        assert_eq!(sanitize_transport_id("a/b\\c d"), "abcd");
    }

    #[test]
    fn commit_message_format() {
        assert_eq!(
            build_transport_commit_message("t1", TransportType::Push, "contents", ""),
            "t1 push contents"
        );
        assert_eq!(
            build_transport_commit_message("t1", TransportType::Deliver, "logs", " promote "),
            "t1 deliver logs promote"
        );
    }

    #[test]
    fn type_and_status_normalization() {
        assert_eq!(TransportType::from("INIT".to_string()), TransportType::Init);
        assert_eq!(
            TransportType::from("mystery".to_string()),
            TransportType::Push
        );
        assert_eq!(
            TransportStatus::from("Completed".to_string()),
            TransportStatus::Completed
        );
        assert_eq!(
            TransportStatus::from("anything".to_string()),
            TransportStatus::Pending
        );
    }

    #[test]
    fn record_serde_uses_camel_case_and_defaults() {
        let rec = record("t1", TransportType::Push);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"transportId\":\"t1\""));
        assert!(json.contains("\"transportStatus\":\"pending\""));
        // Empty optional lists are omitted.
        assert!(!json.contains("deletedObjects"));
        assert!(!json.contains("\"error\""));

        // Nil-ish slices and unknown enums normalize on load.
        let minimal = r#"{
            "schemaVersion": 1,
            "transportId": "t2",
            "transportType": "weird",
            "packageId": "p",
            "branch": "dev",
            "createdAt": "2026-01-01T00:00:00Z",
            "transportStatus": "???"
        }"#;
        let rec: TransportRecord = serde_json::from_str(minimal).unwrap();
        assert_eq!(rec.transport_type, TransportType::Push);
        assert_eq!(rec.transport_status, TransportStatus::Pending);
        assert!(rec.git_commits.is_empty());
        assert!(rec.upload_remaining.is_empty());
        assert!(rec.deploy_remaining.is_empty());
    }

    #[test]
    fn persist_writes_record_and_index() {
        let tmp = TempDir::new().unwrap();
        let store = TransportStore::new(tmp.path(), TenantEnv::Dev);
        let path = store.persist(&record("20260101T000000000Z", TransportType::Init)).unwrap();
        assert!(path.ends_with("20260101T000000000Z.transport.json"));
        assert!(tmp
            .path()
            .join(".iflowkit/transports/dev/index.json")
            .exists());

        let loaded = store.load_record("20260101T000000000Z").unwrap();
        assert_eq!(loaded.transport_type, TransportType::Init);
    }

    #[test]
    fn persist_rejects_empty_id() {
        let tmp = TempDir::new().unwrap();
        let store = TransportStore::new(tmp.path(), TenantEnv::Dev);
        let err = store.persist(&record("  ", TransportType::Push)).unwrap_err();
        assert!(matches!(err, SyncError::TransportIdRequired));
    }

    #[test]
    fn index_seq_is_monotonic_and_upsert_updates_in_place() {
        let tmp = TempDir::new().unwrap();
        let store = TransportStore::new(tmp.path(), TenantEnv::Dev);

        store.persist(&record("t1", TransportType::Push)).unwrap();
        store.persist(&record("t2", TransportType::Push)).unwrap();

        let mut rec1 = record("t1", TransportType::Push);
        rec1.mark_completed();
        store.persist(&rec1).unwrap();

        let idx: TransportIndex = serde_json::from_slice(
            &std::fs::read(tmp.path().join(".iflowkit/transports/dev/index.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(idx.items.len(), 2);
        assert_eq!(idx.items[0].seq, 1);
        assert_eq!(idx.items[1].seq, 2);
        assert_eq!(idx.items[0].transport_status, TransportStatus::Completed);
        assert_eq!(idx.items[1].transport_status, TransportStatus::Pending);
    }

    #[test]
    fn latest_pending_filters_and_scans_newest_first() {
        let tmp = TempDir::new().unwrap();
        let store = TransportStore::new(tmp.path(), TenantEnv::Dev);

        let mut done = record("t1", TransportType::Push);
        done.mark_completed();
        store.persist(&done).unwrap();
        store.persist(&record("t2", TransportType::Push)).unwrap();
        store.persist(&record("t3", TransportType::Pull)).unwrap();

        // Newest pending push for the right package/branch is t2.
        let (rec, _) = store
            .load_latest_pending(Some("com.example.pkg"), Some("dev"), Some(TransportType::Push))
            .unwrap()
            .unwrap();
        assert_eq!(rec.transport_id, "t2");

        // Branch filter excludes everything.
        assert!(store
            .load_latest_pending(None, Some("qas"), None)
            .unwrap()
            .is_none());

        // Without filters the newest pending wins (t3).
        let (rec, _) = store.load_latest_pending(None, None, None).unwrap().unwrap();
        assert_eq!(rec.transport_id, "t3");
    }

    #[test]
    fn load_latest_prefers_index_then_falls_back_to_scan() {
        let tmp = TempDir::new().unwrap();
        let store = TransportStore::new(tmp.path(), TenantEnv::Qas);

        let mut older = record("t1", TransportType::Push);
        older.created_at = "2026-01-01T00:00:00Z".into();
        let mut newer = record("t2", TransportType::Deliver);
        newer.created_at = "2026-02-01T00:00:00Z".into();
        store.persist(&newer).unwrap();
        store.persist(&older).unwrap();

        // Index says the last persisted item (t1) is latest.
        let (rec, _) = store.load_latest().unwrap().unwrap();
        assert_eq!(rec.transport_id, "t1");

        // With an unreadable index, the scan picks max createdAt (t2).
        std::fs::write(tmp.path().join(".iflowkit/transports/qas/index.json"), "{broken").unwrap();
        let (rec, _) = store.load_latest().unwrap().unwrap();
        assert_eq!(rec.transport_id, "t2");
    }

    #[test]
    fn remainders_empty_iff_completable() {
        let mut rec = record("t1", TransportType::Push);
        rec.upload_remaining = vec![key(ArtifactKind::IFlows, "A")];
        assert!(!rec.remainders_empty());
        rec.upload_remaining.clear();
        assert!(rec.remainders_empty());
        rec.mark_completed();
        assert_eq!(rec.transport_status, TransportStatus::Completed);
        assert!(rec.error.is_empty());
    }

    #[test]
    fn merge_and_remove_keys() {
        let existing = vec![key(ArtifactKind::IFlows, "B"), key(ArtifactKind::IFlows, "A")];
        let merged = merge_keys(
            &existing,
            [key(ArtifactKind::IFlows, "A"), key(ArtifactKind::Scripts, "S")],
        );
        assert_eq!(
            merged,
            vec![
                key(ArtifactKind::Scripts, "S"),
                key(ArtifactKind::IFlows, "A"),
                key(ArtifactKind::IFlows, "B"),
            ]
        );

        let mut list = merged;
        remove_key(&mut list, &key(ArtifactKind::IFlows, "A"));
        assert_eq!(
            list,
            vec![key(ArtifactKind::Scripts, "S"), key(ArtifactKind::IFlows, "B")]
        );
    }

    #[test]
    fn merge_unique_sorted_strings() {
        let merged = merge_unique_sorted(
            &["b".into(), "a".into()],
            &["a".into(), "c".into(), " ".into()],
        );
        assert_eq!(merged, vec!["a", "b", "c"]);
    }
}
