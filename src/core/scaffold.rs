//! Step 2: create the standard subfolder structure in the case folder.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::model::{StepContext, StepId, StepReport, STANDARD_FOLDERS};
use crate::domain::ports::PipelineStep;
use crate::utils::error::{CasefilesError, Result};

#[derive(Default)]
pub struct ScaffoldStep;

impl ScaffoldStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineStep for ScaffoldStep {
    fn id(&self) -> StepId {
        StepId::Scaffold
    }

    async fn run(&self, ctx: &mut StepContext) -> Result<StepReport> {
        let case_folder = ctx
            .case_folder
            .clone()
            .ok_or_else(|| CasefilesError::StepFailed {
                step: StepId::Scaffold.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        let mut report = StepReport::new(StepId::Scaffold);
        let mut created = 0usize;

        for name in STANDARD_FOLDERS {
            let folder = case_folder.join(name);
            if folder.is_dir() {
                debug!("folder already present: {}", name);
                continue;
            }
            std::fs::create_dir_all(&folder)?;
            created += 1;
            info!("created folder: {}", folder.display());
        }

        info!(
            "standard folders ready in {} ({} created)",
            case_folder.display(),
            created
        );
        report.processed = created;
        Ok(report)
    }

    fn verify(&self, ctx: &StepContext) -> Result<()> {
        let case_folder = ctx
            .case_folder
            .as_ref()
            .ok_or_else(|| CasefilesError::VerificationFailed {
                step: StepId::Scaffold.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        let missing: Vec<&str> = STANDARD_FOLDERS
            .iter()
            .copied()
            .filter(|name| !case_folder.join(name).is_dir())
            .collect();

        if !missing.is_empty() {
            return Err(CasefilesError::VerificationFailed {
                step: StepId::Scaffold.to_string(),
                message: format!("missing folders: {}", missing.join(", ")),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_all_standard_folders() {
        let dir = TempDir::new().unwrap();
        let mut ctx = StepContext::with_case_folder(dir.path().to_path_buf());

        let step = ScaffoldStep::new();
        let report = step.run(&mut ctx).await.unwrap();

        assert_eq!(report.processed, STANDARD_FOLDERS.len());
        assert!(step.verify(&ctx).is_ok());
        assert!(dir.path().join("원본폴더").is_dir());
        assert!(dir.path().join("0_INBOX").is_dir());
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut ctx = StepContext::with_case_folder(dir.path().to_path_buf());

        let step = ScaffoldStep::new();
        step.run(&mut ctx).await.unwrap();
        let second = step.run(&mut ctx).await.unwrap();

        assert_eq!(second.processed, 0);
        assert!(step.verify(&ctx).is_ok());
    }

    #[tokio::test]
    async fn verify_reports_missing_folder() {
        let dir = TempDir::new().unwrap();
        let mut ctx = StepContext::with_case_folder(dir.path().to_path_buf());

        let step = ScaffoldStep::new();
        step.run(&mut ctx).await.unwrap();
        std::fs::remove_dir(dir.path().join("9_판결")).unwrap();

        assert!(step.verify(&ctx).is_err());
    }
}
