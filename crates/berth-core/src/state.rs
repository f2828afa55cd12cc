use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const STATE_FILE: &str = "state.json";

/// What the last successful `up` used, persisted under the work directory so
/// that later commands can default to the same profile and engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateRecord {
    pub profile: String,
    pub runtime: String,
    pub telemetry: bool,
}

impl StateRecord {
    pub fn save(&self, work_dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(work_dir)?;
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(work_dir.join(STATE_FILE), json)
    }

    /// `None` when no state has been recorded or the file is unreadable;
    /// stale state never blocks an operation.
    pub fn load(work_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(work_dir.join(STATE_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let record = StateRecord {
            profile: "local".to_owned(),
            runtime: "docker".to_owned(),
            telemetry: true,
        };
        record.save(dir.path()).unwrap();
        assert_eq!(StateRecord::load(dir.path()), Some(record));
    }

    #[test]
    fn missing_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(StateRecord::load(dir.path()), None);
    }

    #[test]
    fn corrupt_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), "{not json").unwrap();
        assert_eq!(StateRecord::load(dir.path()), None);
    }
}
