//! Step 4: rename imported files to the standard naming convention.
//!
//! Three phases over the original folder: rewrite downloaded names into
//! the per-category form, classify the results under numbered prefixes,
//! then sweep everything still unclassified into the procedural folder.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::naming::{
    has_numbered_prefix, remove_duplicate_phrases, split_numbered_prefix, Renamer,
};
use crate::domain::model::{StepContext, StepId, StepReport};
use crate::domain::ports::PipelineStep;
use crate::utils::error::{CasefilesError, Result};
use crate::utils::fs::{collision_free, list_files, move_file, DEFAULT_CHUNK_SIZE};

pub struct RenameStep {
    renamer: Renamer,
    original_folder_name: String,
    unclassified_folder_name: String,
}

impl RenameStep {
    pub fn new(
        renamer: Renamer,
        original_folder_name: String,
        unclassified_folder_name: String,
    ) -> Self {
        Self {
            renamer,
            original_folder_name,
            unclassified_folder_name,
        }
    }
}

#[async_trait]
impl PipelineStep for RenameStep {
    fn id(&self) -> StepId {
        StepId::Rename
    }

    async fn run(&self, ctx: &mut StepContext) -> Result<StepReport> {
        let case_folder = ctx
            .case_folder
            .clone()
            .ok_or_else(|| CasefilesError::StepFailed {
                step: StepId::Rename.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        let original_folder = case_folder.join(&self.original_folder_name);
        if !original_folder.is_dir() {
            return Err(CasefilesError::StepFailed {
                step: StepId::Rename.to_string(),
                message: format!("original folder missing: {}", original_folder.display()),
            });
        }

        let mut report = StepReport::new(StepId::Rename);

        // phase 1: per-category rewrite of downloaded names
        let mut renamed: Vec<String> = Vec::new();
        for path in list_files(&original_folder)? {
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let Some(new_name) = self.renamer.standardize(&filename) else {
                continue;
            };

            let target = collision_free(&original_folder.join(&new_name));
            let final_name = target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&new_name)
                .to_string();
            match std::fs::rename(&path, &target) {
                Ok(()) => {
                    info!("renamed: {} -> {}", filename, final_name);
                    report.processed += 1;
                    renamed.push(final_name);
                }
                Err(e) => {
                    report
                        .errors
                        .push(format!("rename failed ({}): {}", filename, e));
                }
            }
        }

        // phase 2: numbered prefix classification
        let mut classified: HashSet<String> = HashSet::new();
        for filename in &renamed {
            let path = original_folder.join(filename);
            if !path.exists() {
                warn!("renamed file disappeared: {}", filename);
                continue;
            }
            // prefixed files are only reconsidered for the fixed categories
            if has_numbered_prefix(filename)
                && !filename.contains("항소이유서")
                && !filename.contains("판결문")
                && !filename.contains("판결선고조서")
            {
                classified.insert(filename.clone());
                continue;
            }

            let mut new_name = remove_duplicate_phrases(&self.renamer.apply_prefix(filename));

            // keep the bare name intact when swapping one prefix for another
            if has_numbered_prefix(filename) && new_name != *filename {
                let reclassified = match (
                    split_numbered_prefix(&new_name),
                    split_numbered_prefix(filename),
                ) {
                    (Some((new_prefix, _)), Some((_, bare))) => {
                        Some(format!("{}{}", new_prefix, bare))
                    }
                    _ => None,
                };
                if let Some(name) = reclassified {
                    new_name = name;
                }
            }

            if new_name == *filename {
                classified.insert(filename.clone());
                continue;
            }

            let target = collision_free(&original_folder.join(&new_name));
            let final_name = target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&new_name)
                .to_string();
            match std::fs::rename(&path, &target) {
                Ok(()) => {
                    info!("classified: {} -> {}", filename, final_name);
                    report.processed += 1;
                    classified.insert(final_name);
                }
                Err(e) => {
                    report
                        .errors
                        .push(format!("prefix rename failed ({}): {}", filename, e));
                }
            }
        }

        // phase 3: sweep unclassified files into the procedural folder
        let unclassified_folder = case_folder.join(&self.unclassified_folder_name);
        std::fs::create_dir_all(&unclassified_folder)?;

        let mut moved = 0usize;
        for path in list_files(&original_folder)? {
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if classified.contains(&filename) || has_numbered_prefix(&filename) {
                continue;
            }

            let target = collision_free(&unclassified_folder.join(&filename));
            match move_file(&path, &target, DEFAULT_CHUNK_SIZE) {
                Ok(()) => {
                    info!(
                        "moved unclassified file: {} -> {}",
                        filename,
                        self.unclassified_folder_name
                    );
                    moved += 1;
                }
                Err(e) => {
                    report
                        .errors
                        .push(format!("move failed ({}): {}", filename, e));
                }
            }
        }

        info!(
            "rename complete: {} renamed, {} moved, {} errors",
            report.processed,
            moved,
            report.errors.len()
        );
        Ok(report.with_metadata("moved_unclassified", serde_json::Value::from(moved)))
    }

    fn verify(&self, ctx: &StepContext) -> Result<()> {
        let case_folder = ctx
            .case_folder
            .as_ref()
            .ok_or_else(|| CasefilesError::VerificationFailed {
                step: StepId::Rename.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        let original_folder = case_folder.join(&self.original_folder_name);
        let unprefixed: Vec<String> = list_files(&original_folder)?
            .into_iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .filter(|name| !has_numbered_prefix(name))
            .collect();

        if !unprefixed.is_empty() {
            return Err(CasefilesError::VerificationFailed {
                step: StepId::Rename.to_string(),
                message: format!("unclassified files remain: {}", unprefixed.join(", ")),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml_config::FileNamingRules;
    use crate::domain::model::{EVIDENCE_PREFIX, JUDGMENT_PREFIX, SUBMISSION_PREFIX};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn rules() -> FileNamingRules {
        let mut prefix_patterns = BTreeMap::new();
        prefix_patterns.insert(
            EVIDENCE_PREFIX.to_string(),
            vec!["갑\\d+".to_string(), "을\\d+".to_string()],
        );
        prefix_patterns.insert(
            SUBMISSION_PREFIX.to_string(),
            vec!["소장".to_string(), "답변서".to_string(), "준비서면".to_string()],
        );
        prefix_patterns.insert(JUDGMENT_PREFIX.to_string(), vec!["판결문".to_string()]);
        FileNamingRules { prefix_patterns }
    }

    fn step() -> RenameStep {
        RenameStep::new(
            Renamer::new(&rules()).unwrap(),
            "원본폴더".to_string(),
            "절차관련".to_string(),
        )
    }

    fn setup_case(files: &[&str]) -> (TempDir, StepContext) {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("원본폴더");
        std::fs::create_dir_all(&original).unwrap();
        for f in files {
            std::fs::write(original.join(f), b"x").unwrap();
        }
        let ctx = StepContext::with_case_folder(dir.path().to_path_buf());
        (dir, ctx)
    }

    #[tokio::test]
    async fn evidence_file_gets_standard_name_and_prefix() {
        let (dir, mut ctx) = setup_case(&["2023가단5243_2023.05.01_서증_갑1_등기사항전부증명서.pdf"]);

        let step = step();
        step.run(&mut ctx).await.unwrap();

        let original = dir.path().join("원본폴더");
        assert!(original
            .join("7_제출증거_(갑1)_등기사항전부증명서.pdf")
            .exists());
        assert!(step.verify(&ctx).is_ok());
    }

    #[tokio::test]
    async fn judgment_is_reclassified_to_judgment_prefix() {
        let (dir, mut ctx) = setup_case(&["2023가단5243_2024.01.15_판결문_판사_홍길동.pdf"]);

        let step = step();
        step.run(&mut ctx).await.unwrap();

        assert!(dir
            .path()
            .join("원본폴더/9_판결_2024.01.15.자_판결문_판사_홍길동.pdf")
            .exists());
    }

    #[tokio::test]
    async fn unmatched_file_moves_to_procedural_folder() {
        let (dir, mut ctx) = setup_case(&["메모.txt"]);

        let step = step();
        let report = step.run(&mut ctx).await.unwrap();

        assert_eq!(
            report.metadata.get("moved_unclassified"),
            Some(&serde_json::Value::from(1u64))
        );
        assert!(dir.path().join("절차관련/메모.txt").exists());
        assert!(!dir.path().join("원본폴더/메모.txt").exists());
        assert!(step.verify(&ctx).is_ok());
    }

    #[tokio::test]
    async fn already_prefixed_file_stays_put() {
        let (dir, mut ctx) = setup_case(&["1_기본정보_위임장.pdf"]);

        let step = step();
        step.run(&mut ctx).await.unwrap();

        assert!(dir.path().join("원본폴더/1_기본정보_위임장.pdf").exists());
        assert!(step.verify(&ctx).is_ok());
    }
}
