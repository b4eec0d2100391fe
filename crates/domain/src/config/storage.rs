use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `ledger.json`.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
        }
    }
}

impl StorageConfig {
    pub fn ledger_file(&self) -> PathBuf {
        self.state_path.join("ledger.json")
    }
}

fn d_state_path() -> PathBuf {
    PathBuf::from("data")
}
