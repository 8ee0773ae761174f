//! Registry reconciliation.
//!
//! Compares the registry against the projects directory. Only ever run on
//! request.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use yard_runner::COMPOSE_FILE;

use crate::error::EngineResult;
use crate::registry::ProjectRegistry;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Registered projects whose root or compose file is missing
    pub missing: Vec<String>,
    /// Directories holding a compose file that no record points at
    pub orphaned: Vec<PathBuf>,
    /// Records removed because their root no longer exists
    pub pruned: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.orphaned.is_empty()
    }
}

/// Reconcile `registry` with `projects_dir`.
///
/// With `prune`, records whose root directory is gone are removed.
pub fn reconcile(
    registry: &ProjectRegistry,
    projects_dir: &Path,
    prune: bool,
) -> EngineResult<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let records = registry.list()?;

    for record in &records {
        if !record.root.join(COMPOSE_FILE).is_file() {
            warn!("Project {} has no compose file under {:?}", record.name, record.root);
            report.missing.push(record.name.clone());
        }
        if prune && !record.root.exists() {
            registry.remove(&record.name)?;
            report.pruned.push(record.name.clone());
        }
    }

    let roots: BTreeSet<&Path> = records.iter().map(|r| r.root.as_path()).collect();
    let entries = match fs::read_dir(projects_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };

    let mut orphaned = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.join(COMPOSE_FILE).is_file() && !roots.contains(path.as_path()) {
            orphaned.push(path);
        }
    }
    orphaned.sort();
    report.orphaned = orphaned;

    info!(
        "Reconciled {} projects: {} missing, {} orphaned, {} pruned",
        records.len(),
        report.missing.len(),
        report.orphaned.len(),
        report.pruned.len()
    );
    Ok(report)
}
