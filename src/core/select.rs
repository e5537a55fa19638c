//! Step 1: pick the case folder and persist its path.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::model::{CaseEntry, StepContext, StepId, StepReport, CASE_PATH_FILE};
use crate::domain::ports::{Confirmer, PipelineStep};
use crate::utils::error::{CasefilesError, Result};
use crate::utils::fs::list_subdirs;

/// Path written by a previous selection run, if any.
pub fn saved_case_path() -> Option<PathBuf> {
    let saved = std::fs::read_to_string(CASE_PATH_FILE).ok()?;
    let saved = saved.trim();
    if saved.is_empty() {
        None
    } else {
        Some(PathBuf::from(saved))
    }
}

/// Case folder for a run resumed past the selection step: an explicit
/// preset wins, then the path saved by an earlier run.
pub fn resume_case_folder(preset: Option<PathBuf>) -> Result<PathBuf> {
    preset
        .or_else(saved_case_path)
        .ok_or_else(|| CasefilesError::MissingConfigError {
            field: "general.case_folder".to_string(),
        })
}

pub struct SelectStep {
    roots: Vec<PathBuf>,
    preset: Option<PathBuf>,
    confirmer: Arc<dyn Confirmer>,
}

impl SelectStep {
    pub fn new(roots: Vec<PathBuf>, preset: Option<PathBuf>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            roots,
            preset,
            confirmer,
        }
    }

    /// All subdirectories of the configured roots, sorted by folder name.
    /// Missing roots are skipped with a warning.
    fn collect_entries(&self) -> Vec<CaseEntry> {
        let mut entries = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                warn!("case root not found: {}", root.display());
                continue;
            }
            let root_name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| root.display().to_string());
            match list_subdirs(root) {
                Ok(subdirs) => {
                    for path in subdirs {
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default();
                        entries.push(CaseEntry {
                            root_name: root_name.clone(),
                            name,
                            path,
                        });
                    }
                }
                Err(e) => warn!("failed to list case root {}: {}", root.display(), e),
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn resolve(&self) -> Result<PathBuf> {
        if let Some(preset) = &self.preset {
            return Ok(preset.clone());
        }

        // a previous run may have left the chosen path behind
        if let Some(saved_path) = saved_case_path() {
            if self.confirmer.confirm_saved_path(&saved_path)? {
                return Ok(saved_path);
            }
        }

        let entries = self.collect_entries();
        if !entries.is_empty() {
            if let Some(index) = self.confirmer.pick_case(&entries)? {
                return Ok(entries[index].path.clone());
            }
        }

        self.confirmer.read_case_path()
    }
}

#[async_trait]
impl PipelineStep for SelectStep {
    fn id(&self) -> StepId {
        StepId::Select
    }

    async fn run(&self, ctx: &mut StepContext) -> Result<StepReport> {
        let case_folder = self.resolve()?;

        if !case_folder.exists() {
            if self.confirmer.confirm_create(&case_folder)? {
                std::fs::create_dir_all(&case_folder)?;
                info!("created case folder: {}", case_folder.display());
            } else {
                return Err(CasefilesError::Aborted);
            }
        }

        std::fs::write(CASE_PATH_FILE, case_folder.to_string_lossy().as_bytes())?;
        info!("case folder selected: {}", case_folder.display());

        let mut report = StepReport::new(StepId::Select).with_metadata(
            "case_folder",
            serde_json::Value::String(case_folder.display().to_string()),
        );
        report.processed = 1;
        ctx.case_folder = Some(case_folder);
        Ok(report)
    }

    fn verify(&self, ctx: &StepContext) -> Result<()> {
        let case_folder = ctx
            .case_folder
            .as_ref()
            .ok_or_else(|| CasefilesError::VerificationFailed {
                step: StepId::Select.to_string(),
                message: "no case folder selected".to_string(),
            })?;
        if !case_folder.is_dir() {
            return Err(CasefilesError::VerificationFailed {
                step: StepId::Select.to_string(),
                message: format!("case folder does not exist: {}", case_folder.display()),
            });
        }
        Ok(())
    }
}
