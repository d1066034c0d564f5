use metrics_exporter_prometheus::PrometheusHandle;
use rental_prequal::config::{StoreConfig, TablesConfig};
use rental_prequal::error::AppError;
use rental_prequal::workflows::prequal::{
    load_table_overrides, CreditBracket, EmploymentClassifier, EmploymentStatus,
    InMemorySnapshotStore, OutcomeCatalog, RentResponsibility, RunId, RunSnapshot, SnapshotStore,
    StoreError, WorkflowVariant,
};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// One JSON document per run id inside a single directory.
#[derive(Debug, Clone)]
pub(crate) struct DirectorySnapshotStore {
    root: PathBuf,
}

impl DirectorySnapshotStore {
    pub(crate) fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, run_id: &RunId) -> Result<PathBuf, StoreError> {
        let raw = run_id.as_str();
        let safe = !raw.is_empty()
            && raw
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !safe {
            return Err(StoreError::Unavailable(format!(
                "run id `{raw}` cannot be used as a file name"
            )));
        }
        Ok(self.root.join(format!("{raw}.json")))
    }
}

impl SnapshotStore for DirectorySnapshotStore {
    fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.run_id)?;
        let staging = path.with_extension("json.tmp");
        let encoded = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, StoreError> {
        let path = self.path_for(run_id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// The store picked by `PREQUAL_SNAPSHOT_DIR`.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredStore {
    Memory(InMemorySnapshotStore),
    Directory(DirectorySnapshotStore),
}

impl ConfiguredStore {
    pub(crate) fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match &config.snapshot_dir {
            Some(dir) => Ok(Self::Directory(DirectorySnapshotStore::open(dir)?)),
            None => Ok(Self::Memory(InMemorySnapshotStore::new())),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            ConfiguredStore::Memory(_) => "memory".to_string(),
            ConfiguredStore::Directory(store) => store.root.display().to_string(),
        }
    }
}

impl SnapshotStore for ConfiguredStore {
    fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.save(snapshot),
            ConfiguredStore::Directory(store) => store.save(snapshot),
        }
    }

    fn load(&self, run_id: &RunId) -> Result<Option<RunSnapshot>, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.load(run_id),
            ConfiguredStore::Directory(store) => store.load(run_id),
        }
    }
}

/// Generated tables with any repaired exports from `PREQUAL_TABLE_DIR` applied.
pub(crate) fn outcome_catalog(config: &TablesConfig) -> Result<OutcomeCatalog, AppError> {
    let mut catalog = OutcomeCatalog::standard()?;
    if let Some(dir) = &config.override_dir {
        let replaced = load_table_overrides(&mut catalog, dir, EmploymentClassifier::shared()?)?;
        tracing::info!(
            dir = %dir.display(),
            replaced = replaced.len(),
            "outcome table overrides applied"
        );
    }
    Ok(catalog)
}

pub(crate) fn parse_variant(raw: &str) -> Result<WorkflowVariant, String> {
    WorkflowVariant::from_code(raw).ok_or_else(|| format!("unknown workflow variant '{raw}'"))
}

pub(crate) fn parse_status(raw: &str) -> Result<EmploymentStatus, String> {
    EmploymentStatus::from_label(raw).ok_or_else(|| {
        format!("unknown employment status '{raw}' (retired, unemployed, full_time, part_time, self_employed)")
    })
}

pub(crate) fn parse_responsibility(raw: &str) -> Result<RentResponsibility, String> {
    RentResponsibility::from_label(raw)
        .ok_or_else(|| format!("unknown rent responsibility '{raw}' (full, partial, none)"))
}

pub(crate) fn parse_bracket(raw: &str) -> Result<CreditBracket, String> {
    CreditBracket::from_label(raw).ok_or_else(|| {
        let labels: Vec<&str> = CreditBracket::ALL.iter().map(|b| b.label()).collect();
        format!("unknown credit bracket '{raw}' ({})", labels.join(", "))
    })
}

pub(crate) fn parse_yes_no(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(true),
        "no" | "n" | "false" => Ok(false),
        other => Err(format!("expected yes or no, got '{other}'")),
    }
}

pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
