use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answers::ApplicantAnswers;
use super::flags::FlagSet;
use super::steps::{RunId, StepId};
use super::variant::WorkflowVariant;

/// Persisted state of one run, stored verbatim as JSON under its run id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub variant: WorkflowVariant,
    pub current_step: StepId,
    #[serde(default)]
    pub history: Vec<StepId>,
    pub answers: ApplicantAnswers,
    /// Effective flags at save time; informational.
    pub flags: FlagSet,
    #[serde(default)]
    pub carried_flags: FlagSet,
    pub saved_at: DateTime<Utc>,
}

/// Key-value persistence for run snapshots. Saves are best effort; a missing
/// snapshot on load means the run starts fresh.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError>;
    fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<Mutex<HashMap<RunId, String>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().map_or(0, |guard| guard.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(snapshot)?;
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|_| StoreError::Unavailable("snapshot mutex poisoned".to_string()))?;
        guard.insert(snapshot.run_id.clone(), encoded);
        Ok(())
    }

    fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, StoreError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|_| StoreError::Unavailable("snapshot mutex poisoned".to_string()))?;
        guard
            .get(run_id)
            .map(|encoded| serde_json::from_str(encoded))
            .transpose()
            .map_err(StoreError::from)
    }
}
