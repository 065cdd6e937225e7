//! Script artifacts on disk.
//!
//! Each case ordinal `N` owns one live script `<scripts>/<prefix>_<N>.py`.
//! A repair is staged next to it as `<live>.healed`; promotion moves the live
//! script to `<live>.failed_backup_<attempt>` (with `.<k>` appended when that
//! name is taken) and renames the staged file into place. Backups are never
//! overwritten or deleted.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::failures::script_key;

pub const HEALED_SUFFIX: &str = ".healed";
pub const BACKUP_MARKER: &str = ".failed_backup_";
pub const INVALID_SUFFIX: &str = ".invalid";

/// Lifecycle of a script artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Generated,
    Failed,
    Healing,
    Healed,
    Verified,
    Abandoned,
}

impl ArtifactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Failed => "failed",
            Self::Healing => "healing",
            Self::Healed => "healed",
            Self::Verified => "verified",
            Self::Abandoned => "abandoned",
        }
    }

    /// Check if transition to another status is valid.
    pub fn can_transition_to(&self, target: ArtifactStatus) -> bool {
        use ArtifactStatus::*;
        matches!(
            (self, target),
            (Generated, Failed)
                | (Failed, Healing)
                | (Healing, Healed)
                | (Healing, Failed)
                | (Healed, Verified)
                | (Healed, Failed)
                | (Verified, Failed)
                | (_, Abandoned)
        ) && *self != Abandoned
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Abandoned)
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

fn artifact_error(path: &Path, source: io::Error) -> CoreError {
    CoreError::Artifact {
        path: path.to_path_buf(),
        source,
    }
}

/// File layout of the scripts directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    scripts_dir: PathBuf,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(scripts_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Live script path for a case ordinal.
    pub fn live_path(&self, ordinal: usize) -> PathBuf {
        self.scripts_dir
            .join(heal_cases::script_name_for(&self.prefix, ordinal))
    }

    /// Live script path for a script id from a report.
    ///
    /// Scripts live in the scripts directory, so only the file name counts;
    /// a `.healed` suffix is dropped.
    pub fn locate(&self, script_id: &str) -> PathBuf {
        let name = script_key(script_id);
        let name = name.strip_suffix(HEALED_SUFFIX).unwrap_or(name);
        self.scripts_dir.join(name)
    }

    pub fn staged_path(live: &Path) -> PathBuf {
        with_suffix(live, HEALED_SUFFIX)
    }

    pub fn invalid_path(live: &Path) -> PathBuf {
        with_suffix(live, INVALID_SUFFIX)
    }

    /// First free backup name for `live` and `attempt`.
    pub fn backup_path(live: &Path, attempt: u32) -> PathBuf {
        let base = with_suffix(live, &format!("{}{}", BACKUP_MARKER, attempt));
        if !base.exists() {
            return base;
        }
        (1u32..)
            .map(|k| with_suffix(&base, &format!(".{}", k)))
            .find(|p| !p.exists())
            .unwrap_or(base)
    }

    /// Read a live script. `Ok(None)` when it does not exist.
    pub fn read_live(&self, live: &Path) -> CoreResult<Option<String>> {
        match fs::read_to_string(live) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(artifact_error(live, e)),
        }
    }

    /// Replace a live script with a repaired one, keeping the old text as a
    /// backup. Returns the backup path.
    pub fn promote_repair(&self, live: &Path, script: &str, attempt: u32) -> CoreResult<PathBuf> {
        let staged = Self::staged_path(live);
        fs::write(&staged, script).map_err(|e| artifact_error(&staged, e))?;
        debug!("Staged repair at {:?}", staged);

        let backup = self.backup_live(live, attempt)?;

        fs::rename(&staged, live).map_err(|e| artifact_error(live, e))?;
        info!("Promoted repair to {:?} (backup {:?})", live, backup);
        Ok(backup)
    }

    /// Move a live script to its backup name.
    pub fn backup_live(&self, live: &Path, attempt: u32) -> CoreResult<PathBuf> {
        let backup = Self::backup_path(live, attempt);
        fs::rename(live, &backup).map_err(|e| artifact_error(live, e))?;
        Ok(backup)
    }

    /// Write a freshly generated script, creating the scripts directory.
    pub fn write_new(&self, path: &Path, script: &str) -> CoreResult<()> {
        fs::create_dir_all(&self.scripts_dir).map_err(|e| artifact_error(&self.scripts_dir, e))?;
        fs::write(path, script).map_err(|e| artifact_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_status_transitions() {
        use ArtifactStatus::*;
        assert!(Generated.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Healing));
        assert!(Healing.can_transition_to(Healed));
        assert!(Healing.can_transition_to(Failed));
        assert!(Healed.can_transition_to(Verified));
        assert!(Healed.can_transition_to(Failed));
        assert!(Verified.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Abandoned));

        assert!(!Generated.can_transition_to(Healed));
        assert!(!Failed.can_transition_to(Verified));
        assert!(!Abandoned.can_transition_to(Failed));
        assert!(!Abandoned.can_transition_to(Abandoned));
    }

    #[test]
    fn test_paths() {
        let store = ArtifactStore::new("/w/scripts", "test_playwright");
        let live = store.live_path(3);
        assert_eq!(live, PathBuf::from("/w/scripts/test_playwright_3.py"));
        assert_eq!(store.locate("other/dir/test_playwright_3.py"), live);
        assert_eq!(store.locate("test_playwright_3.py.healed"), live);
        assert_eq!(
            ArtifactStore::staged_path(&live),
            PathBuf::from("/w/scripts/test_playwright_3.py.healed")
        );
    }

    #[test]
    fn test_promote_keeps_backups() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), "case");
        let live = store.live_path(1);
        fs::write(&live, "v0").unwrap();

        let b1 = store.promote_repair(&live, "v1", 1).unwrap();
        assert_eq!(b1, dir.path().join("case_1.py.failed_backup_1"));
        assert_eq!(fs::read_to_string(&live).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&b1).unwrap(), "v0");
        assert!(!ArtifactStore::staged_path(&live).exists());

        // Same attempt number again does not overwrite
        let b2 = store.promote_repair(&live, "v2", 1).unwrap();
        assert_eq!(b2, dir.path().join("case_1.py.failed_backup_1.1"));
        assert_eq!(fs::read_to_string(&b1).unwrap(), "v0");
        assert_eq!(fs::read_to_string(&b2).unwrap(), "v1");
    }

    #[test]
    fn test_read_missing_live() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), "case");
        assert_eq!(store.read_live(&store.live_path(9)).unwrap(), None);
    }
}
