//! Step 3: import downloaded files into the case folder.
//!
//! Each file in the download folder is copied into the case's original
//! folder, then the download itself is moved into a per-case backup
//! folder. A file that would overwrite an earlier import gets the earlier
//! copy preserved under a timestamped name first.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::model::{StepContext, StepId, StepReport};
use crate::domain::ports::PipelineStep;
use crate::utils::error::{CasefilesError, Result};
use crate::utils::fs::{collision_free, copy_chunked, list_files, move_file, timestamped_name};

pub struct ImportStep {
    source_folder: PathBuf,
    backup_root: PathBuf,
    original_folder_name: String,
    chunk_size: usize,
}

impl ImportStep {
    pub fn new(
        source_folder: PathBuf,
        backup_root: PathBuf,
        original_folder_name: String,
        chunk_size: usize,
    ) -> Self {
        Self {
            source_folder,
            backup_root,
            original_folder_name,
            chunk_size,
        }
    }
}

#[async_trait]
impl PipelineStep for ImportStep {
    fn id(&self) -> StepId {
        StepId::Import
    }

    async fn run(&self, ctx: &mut StepContext) -> Result<StepReport> {
        let case_folder = ctx
            .case_folder
            .clone()
            .ok_or_else(|| CasefilesError::StepFailed {
                step: StepId::Import.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        if !self.source_folder.is_dir() {
            return Err(CasefilesError::StepFailed {
                step: StepId::Import.to_string(),
                message: format!(
                    "source folder does not exist: {}",
                    self.source_folder.display()
                ),
            });
        }

        let original_folder = case_folder.join(&self.original_folder_name);
        std::fs::create_dir_all(&original_folder)?;

        let case_name = case_folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "case".to_string());
        let case_backup = self.backup_root.join(format!("{}_백업", case_name));
        std::fs::create_dir_all(&case_backup)?;

        let files = list_files(&self.source_folder)?;
        info!(
            "importing {} files from {}",
            files.len(),
            self.source_folder.display()
        );

        let mut report = StepReport::new(StepId::Import);
        let mut backed_up = 0usize;

        for source_path in files {
            let filename = match source_path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let target = original_folder.join(&filename);

            // preserve an earlier import under a timestamped name
            if target.exists() {
                let preserved = original_folder.join(timestamped_name(&filename));
                if let Err(e) = copy_chunked(&target, &preserved, self.chunk_size) {
                    report
                        .errors
                        .push(format!("backup failed ({}): {}", filename, e));
                    continue;
                }
                backed_up += 1;
                info!("preserved earlier import as {}", preserved.display());
            }

            if let Err(e) = copy_chunked(&source_path, &target, self.chunk_size) {
                report
                    .errors
                    .push(format!("copy failed ({}): {}", filename, e));
                continue;
            }
            report.processed += 1;

            let backup_target = collision_free(&case_backup.join(&filename));
            if let Err(e) = move_file(&source_path, &backup_target, self.chunk_size) {
                warn!("failed to move download to backup ({}): {}", filename, e);
                report
                    .errors
                    .push(format!("backup move failed ({}): {}", filename, e));
            }
        }

        info!(
            "import complete: {} copied, {} preserved, {} errors",
            report.processed,
            backed_up,
            report.errors.len()
        );
        Ok(report
            .with_metadata("backed_up", serde_json::Value::from(backed_up))
            .with_metadata(
                "backup_folder",
                serde_json::Value::String(case_backup.display().to_string()),
            ))
    }

    fn verify(&self, ctx: &StepContext) -> Result<()> {
        let case_folder = ctx
            .case_folder
            .as_ref()
            .ok_or_else(|| CasefilesError::VerificationFailed {
                step: StepId::Import.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        let original_folder = case_folder.join(&self.original_folder_name);
        if !original_folder.is_dir() {
            return Err(CasefilesError::VerificationFailed {
                step: StepId::Import.to_string(),
                message: format!("original folder missing: {}", original_folder.display()),
            });
        }

        // imports consume the downloads; leftovers mean incomplete moves
        let leftover = list_files(&self.source_folder)?.len();
        if leftover > 0 {
            return Err(CasefilesError::VerificationFailed {
                step: StepId::Import.to_string(),
                message: format!("{} files left in source folder", leftover),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fs::DEFAULT_CHUNK_SIZE;
    use tempfile::TempDir;

    fn step(source: &TempDir, backup: &TempDir) -> ImportStep {
        ImportStep::new(
            source.path().to_path_buf(),
            backup.path().to_path_buf(),
            "원본폴더".to_string(),
            DEFAULT_CHUNK_SIZE,
        )
    }

    #[tokio::test]
    async fn copies_files_and_moves_downloads_to_backup() {
        let source = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        let case = TempDir::new().unwrap();
        let case_folder = case.path().join("2023가단5243_손해배상");
        std::fs::create_dir_all(&case_folder).unwrap();

        std::fs::write(source.path().join("a.pdf"), b"one").unwrap();
        std::fs::write(source.path().join("b.pdf"), b"two").unwrap();

        let step = step(&source, &backup);
        let mut ctx = StepContext::with_case_folder(case_folder.clone());
        let report = step.run(&mut ctx).await.unwrap();

        assert_eq!(report.processed, 2);
        assert!(report.errors.is_empty());
        assert!(case_folder.join("원본폴더/a.pdf").exists());
        assert!(backup
            .path()
            .join("2023가단5243_손해배상_백업/a.pdf")
            .exists());
        assert!(!source.path().join("a.pdf").exists());
        assert!(step.verify(&ctx).is_ok());
    }

    #[tokio::test]
    async fn existing_import_is_preserved_before_overwrite() {
        let source = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        let case = TempDir::new().unwrap();
        let case_folder = case.path().join("case");
        let original = case_folder.join("원본폴더");
        std::fs::create_dir_all(&original).unwrap();

        std::fs::write(original.join("a.pdf"), b"old").unwrap();
        std::fs::write(source.path().join("a.pdf"), b"new").unwrap();

        let step = step(&source, &backup);
        let mut ctx = StepContext::with_case_folder(case_folder.clone());
        let report = step.run(&mut ctx).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(std::fs::read(original.join("a.pdf")).unwrap(), b"new");
        // the earlier copy survives under a timestamped name
        let preserved = list_files(&original)
            .unwrap()
            .into_iter()
            .filter(|p| p != &original.join("a.pdf"))
            .count();
        assert_eq!(preserved, 1);
    }

    #[tokio::test]
    async fn missing_source_folder_is_an_error() {
        let backup = TempDir::new().unwrap();
        let case = TempDir::new().unwrap();

        let step = ImportStep::new(
            PathBuf::from("/nonexistent/downloads"),
            backup.path().to_path_buf(),
            "원본폴더".to_string(),
            DEFAULT_CHUNK_SIZE,
        );
        let mut ctx = StepContext::with_case_folder(case.path().to_path_buf());
        assert!(step.run(&mut ctx).await.is_err());
    }
}
