//! # Settings and Plan Storage
//!
//! Per-user persistence for the estimator, behind two small traits:
//!
//! - [`SettingsStore`] - project settings plus rate/quantity overrides
//! - [`PlanStore`] - analysed floor plans saved to the user's profile
//!
//! [`JsonFileStore`] implements both on a local directory:
//!
//! ```text
//! <data dir>/
//! ├── <user>.settings.json        SettingsRecord
//! ├── <user>.plans.json           PlanBook
//! └── <user>.*.json.lock          present while a write is in progress
//! ```
//!
//! Every write is atomic (temp file, fsync, rename) and runs under an
//! exclusive lock: an OS-level `fs2` lock for processes on this machine and a
//! `.lock` sidecar naming the holder for everyone else. Every record carries
//! a schema version that is checked on load.
//!
//! ## Example
//!
//! ```rust,no_run
//! use boq_core::file_io::{JsonFileStore, SettingsStore};
//! use boq_core::project::{Overrides, ProjectSettings, SettingsSnapshot};
//!
//! let store = JsonFileStore::new("/tmp/boq");
//! let mut overrides = Overrides::default();
//! overrides.set_rate("cement", 410.0);
//!
//! store.save("local", &SettingsSnapshot::capture(&ProjectSettings::default(), &overrides))?;
//! let fetched = store.fetch("local")?;
//! assert_eq!(fetched.custom_rates.unwrap()["cement"], 410.0);
//! # Ok::<(), boq_core::errors::EstimateError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::errors::{EstimateError, EstimateResult};
use crate::project::SettingsSnapshot;
use crate::report::ReportData;

/// Version written into every stored record
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Locks older than this are taken over regardless of who holds them
const STALE_LOCK_HOURS: i64 = 24;

// ============================================================================
// Store traits
// ============================================================================

/// Acknowledgement of a successful settings save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub user_key: String,
    pub updated_at: DateTime<Utc>,
}

/// Persistence for per-user settings and overrides.
///
/// `fetch` never fails just because nothing was saved yet: a missing record
/// is an empty snapshot, and the caller keeps its in-memory defaults for
/// every field the snapshot lacks.
pub trait SettingsStore {
    fn fetch(&self, user_key: &str) -> EstimateResult<SettingsSnapshot>;
    fn save(&self, user_key: &str, snapshot: &SettingsSnapshot) -> EstimateResult<SaveAck>;
}

/// Persistence for saved floor plans
pub trait PlanStore {
    /// Store a plan and return its id
    fn save_plan(&self, user_key: &str, plan: SavedPlan) -> EstimateResult<Uuid>;

    /// All saved plans for a user, newest first
    fn list_plans(&self, user_key: &str) -> EstimateResult<Vec<SavedPlan>>;

    /// Remove a plan; `NotFound` if the user has no plan with that id
    fn delete_plan(&self, user_key: &str, id: Uuid) -> EstimateResult<SavedPlan>;
}

// ============================================================================
// Records
// ============================================================================

/// One analysed plan saved to a user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlan {
    pub id: Uuid,
    pub file_name: String,
    /// Raw analysis as returned by the service
    pub analysis_result: AnalysisResult,
    /// Priced report at the time of saving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimation: Option<ReportData>,
    pub created_at: DateTime<Utc>,
}

impl SavedPlan {
    pub fn new(
        file_name: impl Into<String>,
        analysis_result: AnalysisResult,
        cost_estimation: Option<ReportData>,
    ) -> Self {
        SavedPlan {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            analysis_result,
            cost_estimation,
            created_at: Utc::now(),
        }
    }
}

/// On-disk settings record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsRecord {
    version: String,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    snapshot: SettingsSnapshot,
}

/// On-disk list of saved plans
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlanBook {
    version: String,
    #[serde(default)]
    plans: Vec<SavedPlan>,
}

impl Default for PlanBook {
    fn default() -> Self {
        PlanBook {
            version: SCHEMA_VERSION.to_string(),
            plans: Vec::new(),
        }
    }
}

// ============================================================================
// Locking
// ============================================================================

/// Contents of a `.lock` sidecar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Who is writing (the user key)
    pub holder: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    fn for_current_process(holder: impl Into<String>) -> Self {
        LockInfo {
            holder: holder.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// A lock is stale when its process is gone (same machine only) or when
    /// it is older than a day.
    fn is_stale(&self) -> bool {
        if (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS {
            return true;
        }
        match hostname() {
            Some(ours) if ours == self.machine => !process_alive(self.pid),
            _ => false,
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

fn process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        Path::new(&format!("/proc/{pid}")).exists()
    }
    #[cfg(not(target_os = "linux"))]
    {
        // No cheap check; rely on the age limit
        let _ = pid;
        true
    }
}

/// Exclusive write lock on one store file, released on drop.
pub struct StoreLock {
    lock_path: PathBuf,
    _handle: File,
    pub info: LockInfo,
}

impl StoreLock {
    /// Take the lock for `path` on behalf of `holder`.
    ///
    /// Fails with `FileLocked` when a live lock exists; stale sidecars are
    /// taken over.
    pub fn acquire(path: &Path, holder: impl Into<String>) -> EstimateResult<Self> {
        let lock_path = sidecar_path(path, "lock");

        if let Some(existing) = read_lock(&lock_path) {
            if !existing.is_stale() {
                return Err(EstimateError::file_locked(
                    path.display().to_string(),
                    format!("{} ({})", existing.holder, existing.machine),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            warn!(path = %lock_path.display(), holder = %existing.holder, "taking over stale lock");
        }

        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        handle.try_lock_exclusive().map_err(|_| {
            EstimateError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let info = LockInfo::for_current_process(holder);
        let json = serde_json::to_string_pretty(&info).map_err(EstimateError::serialization)?;
        handle
            .write_all(json.as_bytes())
            .and_then(|_| handle.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        Ok(StoreLock {
            lock_path,
            _handle: handle,
            info,
        })
    }

    /// Current holder of a live lock on `path`, if any
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock(&sidecar_path(path, "lock")).filter(|info| !info.is_stale())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn read_lock(lock_path: &Path) -> Option<LockInfo> {
    let text = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&text).ok()
}

/// `name.json` -> `name.json.<suffix>`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn io_error(operation: &str, path: &Path, err: std::io::Error) -> EstimateError {
    EstimateError::file_error(operation, path.display().to_string(), err.to_string())
}

// ============================================================================
// Atomic read / write
// ============================================================================

/// Serialize `value` to `path` atomically: write a temp file, fsync, rename.
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> EstimateResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(EstimateError::serialization)?;
    let tmp_path = sidecar_path(path, "tmp");

    let mut tmp = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.sync_all())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("rename to final", path, e)
    })
}

/// Read a JSON record; `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> EstimateResult<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("read", path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| EstimateError::serialization(format!("Invalid JSON in {}: {e}", path.display())))
}

/// Accept records written by this schema or an older compatible one.
///
/// Major versions must match; while the major is 0 a newer minor is refused.
pub fn validate_version(file_version: &str) -> EstimateResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file = parse(file_version);
    let ours = parse(SCHEMA_VERSION);

    let mismatch = || EstimateError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    match (file.as_slice(), ours.as_slice()) {
        ([], _) | (_, []) => Err(mismatch()),
        ([major, ..], [our_major, ..]) if major != our_major => Err(mismatch()),
        ([0, minor, ..], [0, our_minor, ..]) if minor > our_minor => Err(mismatch()),
        _ => Ok(()),
    }
}

/// User keys become file names, so keep them to a safe alphabet.
pub fn validate_user_key(user_key: &str) -> EstimateResult<()> {
    let ok = !user_key.is_empty()
        && user_key.len() <= 64
        && !user_key.starts_with('.')
        && user_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if ok {
        Ok(())
    } else {
        Err(EstimateError::invalid_input(
            "user",
            user_key,
            "User key may only contain letters, digits, '-', '_', '.', '@'",
        ))
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Directory-backed implementation of [`SettingsStore`] and [`PlanStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self, user_key: &str) -> PathBuf {
        self.dir.join(format!("{user_key}.settings.json"))
    }

    pub fn plans_path(&self, user_key: &str) -> PathBuf {
        self.dir.join(format!("{user_key}.plans.json"))
    }

    fn ensure_dir(&self) -> EstimateResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error("create directory", &self.dir, e))
    }

    fn load_plans(&self, path: &Path) -> EstimateResult<PlanBook> {
        match read_json::<PlanBook>(path)? {
            Some(book) => {
                validate_version(&book.version)?;
                Ok(book)
            }
            None => Ok(PlanBook::default()),
        }
    }

    /// Read-modify-write the plan book under the lock
    fn update_plans<R>(
        &self,
        user_key: &str,
        change: impl FnOnce(&mut PlanBook) -> EstimateResult<R>,
    ) -> EstimateResult<R> {
        validate_user_key(user_key)?;
        self.ensure_dir()?;
        let path = self.plans_path(user_key);
        let _lock = StoreLock::acquire(&path, user_key)?;

        let mut book = self.load_plans(&path)?;
        let result = change(&mut book)?;
        book.version = SCHEMA_VERSION.to_string();
        write_json_atomic(&book, &path)?;
        Ok(result)
    }
}

impl SettingsStore for JsonFileStore {
    fn fetch(&self, user_key: &str) -> EstimateResult<SettingsSnapshot> {
        validate_user_key(user_key)?;
        let path = self.settings_path(user_key);
        match read_json::<SettingsRecord>(&path)? {
            Some(record) => {
                validate_version(&record.version)?;
                debug!(user = user_key, updated_at = %record.updated_at, "loaded settings");
                Ok(record.snapshot)
            }
            None => {
                debug!(user = user_key, "no saved settings; using defaults");
                Ok(SettingsSnapshot::default())
            }
        }
    }

    fn save(&self, user_key: &str, snapshot: &SettingsSnapshot) -> EstimateResult<SaveAck> {
        validate_user_key(user_key)?;
        if let Some(settings) = &snapshot.project_settings {
            settings.validate()?;
        }
        self.ensure_dir()?;
        let path = self.settings_path(user_key);
        let _lock = StoreLock::acquire(&path, user_key)?;

        let record = SettingsRecord {
            version: SCHEMA_VERSION.to_string(),
            updated_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        write_json_atomic(&record, &path)?;
        info!(user = user_key, path = %path.display(), "settings saved");

        Ok(SaveAck {
            user_key: user_key.to_string(),
            updated_at: record.updated_at,
        })
    }
}

impl PlanStore for JsonFileStore {
    fn save_plan(&self, user_key: &str, plan: SavedPlan) -> EstimateResult<Uuid> {
        let id = plan.id;
        let file_name = plan.file_name.clone();
        self.update_plans(user_key, |book| {
            book.plans.retain(|p| p.id != id);
            book.plans.push(plan);
            Ok(())
        })?;
        info!(user = user_key, plan_id = %id, file = %file_name, "plan saved");
        Ok(id)
    }

    fn list_plans(&self, user_key: &str) -> EstimateResult<Vec<SavedPlan>> {
        validate_user_key(user_key)?;
        let mut plans = self.load_plans(&self.plans_path(user_key))?.plans;
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }

    fn delete_plan(&self, user_key: &str, id: Uuid) -> EstimateResult<SavedPlan> {
        let removed = self.update_plans(user_key, |book| {
            let index = book
                .plans
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| EstimateError::not_found("Floor plan", id.to_string()))?;
            Ok(book.plans.remove(index))
        })?;
        info!(user = user_key, plan_id = %id, "plan deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::sample_plan;
    use crate::project::{BrickSize, Overrides, ProjectSettings};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn test_sidecar_paths() {
        let path = Path::new("/data/local.settings.json");
        assert_eq!(sidecar_path(path, "lock"), Path::new("/data/local.settings.json.lock"));
        assert_eq!(sidecar_path(path, "tmp"), Path::new("/data/local.settings.json.tmp"));
    }

    #[test]
    fn test_fetch_without_saved_settings_is_empty() {
        let (_dir, store) = store();
        let snapshot = store.fetch("local").unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_settings_roundtrip() {
        let (_dir, store) = store();
        let settings = ProjectSettings {
            wall_height_m: 3.2,
            brick_size: BrickSize::Modular,
            ..ProjectSettings::default()
        };
        let mut overrides = Overrides::default();
        overrides.set_rate("cement", 410.0);
        overrides.set_quantity("bricks", 18_000.0);
        let snapshot = SettingsSnapshot::capture(&settings, &overrides);

        let ack = store.save("site-a", &snapshot).unwrap();
        assert_eq!(ack.user_key, "site-a");
        assert_eq!(store.fetch("site-a").unwrap(), snapshot);

        // Other users are unaffected
        assert!(store.fetch("site-b").unwrap().is_empty());
    }

    #[test]
    fn test_partial_record_on_disk() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.settings_path("local"),
            r#"{ "version": "0.1.0", "updatedAt": "2025-01-01T00:00:00Z", "customRates": { "steel": 80 } }"#,
        )
        .unwrap();

        let snapshot = store.fetch("local").unwrap();
        assert!(snapshot.project_settings.is_none());
        assert_eq!(snapshot.custom_rates.unwrap()["steel"], 80.0);
    }

    #[test]
    fn test_partial_project_settings_on_disk() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.settings_path("local"),
            r#"{ "version": "0.1.0", "updatedAt": "2025-01-01T00:00:00Z", "projectSettings": { "currency": "USD" } }"#,
        )
        .unwrap();

        let settings = store.fetch("local").unwrap().project_settings.unwrap();
        assert_eq!(settings.currency, "USD");
        assert_eq!(settings.wall_height_m, 3.0);
        assert_eq!(settings.brick_size, BrickSize::Standard);
    }

    #[test]
    fn test_save_is_atomic_and_unlocks() {
        let (_dir, store) = store();
        store.save("local", &SettingsSnapshot::default()).unwrap();
        let path = store.settings_path("local");
        assert!(path.exists());
        assert!(!sidecar_path(&path, "tmp").exists());
        assert!(!sidecar_path(&path, "lock").exists());
    }

    #[test]
    fn test_save_rejects_invalid_settings() {
        let (_dir, store) = store();
        let bad = ProjectSettings {
            wall_height_m: -1.0,
            ..ProjectSettings::default()
        };
        let snapshot = SettingsSnapshot::capture(&bad, &Overrides::default());
        assert_eq!(store.save("local", &snapshot).unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.settings_path("local"),
            r#"{ "version": "0.9.0", "updatedAt": "2025-01-01T00:00:00Z" }"#,
        )
        .unwrap();
        assert_eq!(store.fetch("local").unwrap_err().error_code(), "VERSION_MISMATCH");
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.settings_path("local"), "{ not json").unwrap();
        assert_eq!(store.fetch("local").unwrap_err().error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_bad_user_keys() {
        assert!(validate_user_key("local").is_ok());
        assert!(validate_user_key("a.b@site-1").is_ok());
        assert!(validate_user_key("").is_err());
        assert!(validate_user_key("../etc").is_err());
        assert!(validate_user_key("a/b").is_err());
        assert!(validate_user_key(".hidden").is_err());
    }

    #[test]
    fn test_live_lock_blocks_writes() {
        let (_dir, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        let path = store.settings_path("local");

        let lock = StoreLock::acquire(&path, "someone").unwrap();
        assert_eq!(StoreLock::check(&path).unwrap().holder, "someone");
        let err = store.save("local", &SettingsSnapshot::default()).unwrap_err();
        assert!(err.is_recoverable());
        drop(lock);

        assert!(StoreLock::check(&path).is_none());
        assert!(store.save("local", &SettingsSnapshot::default()).is_ok());
    }

    #[test]
    fn test_old_lock_is_stale() {
        let mut info = LockInfo::for_current_process("someone");
        assert!(!info.is_stale());
        info.locked_at = Utc::now() - Duration::hours(25);
        assert!(info.is_stale());
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("garbage").is_err());
    }

    #[test]
    fn test_plans_newest_first() {
        let (_dir, store) = store();
        let mut older = SavedPlan::new("ground.png", sample_plan(), None);
        older.created_at = Utc::now() - Duration::days(2);
        let newer = SavedPlan::new("first.png", sample_plan(), None);

        store.save_plan("local", newer.clone()).unwrap();
        store.save_plan("local", older.clone()).unwrap();

        let plans = store.list_plans("local").unwrap();
        let names: Vec<_> = plans.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, ["first.png", "ground.png"]);
        assert_eq!(plans[1], older);
    }

    #[test]
    fn test_delete_plan() {
        let (_dir, store) = store();
        let plan = SavedPlan::new("plan.pdf", sample_plan(), None);
        let id = store.save_plan("local", plan).unwrap();

        let removed = store.delete_plan("local", id).unwrap();
        assert_eq!(removed.id, id);
        assert!(store.list_plans("local").unwrap().is_empty());

        let err = store.delete_plan("local", id).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_plans_are_per_user() {
        let (_dir, store) = store();
        let id = store
            .save_plan("alice", SavedPlan::new("a.png", sample_plan(), None))
            .unwrap();
        assert!(store.list_plans("bob").unwrap().is_empty());
        assert!(store.delete_plan("bob", id).is_err());
        assert_eq!(store.list_plans("alice").unwrap().len(), 1);
    }
}
