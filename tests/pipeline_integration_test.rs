use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use httpmock::prelude::*;
use tempfile::TempDir;

use casefiles::config::yaml_config::{DocumentTemplate, FileNamingRules, TextExtractionConfig};
use casefiles::core::naming::Renamer;
use casefiles::core::template::TemplateSet;
use casefiles::core::{ExtractStep, ImportStep, RenameStep, ScaffoldStep, StepRunner};
use casefiles::domain::model::{CaseEntry, StepContext, StepId};
use casefiles::domain::ports::{Confirmer, Decision, PdfRasterizer};
use casefiles::ocr::VisionOcr;
use casefiles::utils::fs::DEFAULT_CHUNK_SIZE;
use casefiles::Result;

struct RunEverything;

impl Confirmer for RunEverything {
    fn confirm_step(&self, _step: StepId, _case: Option<&Path>) -> Result<Decision> {
        Ok(Decision::Run)
    }

    fn pick_case(&self, _entries: &[CaseEntry]) -> Result<Option<usize>> {
        Ok(None)
    }

    fn confirm_saved_path(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    fn read_case_path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("."))
    }

    fn confirm_create(&self, _path: &Path) -> Result<bool> {
        Ok(true)
    }

    fn confirm_extract_evidence(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Stands in for poppler: one fake JPEG per "page".
struct FakeRasterizer {
    pages: usize,
}

#[async_trait]
impl PdfRasterizer for FakeRasterizer {
    async fn rasterize(&self, _pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for i in 1..=self.pages {
            let page = out_dir.join(format!("page-{}.jpg", i));
            std::fs::write(&page, b"fake-jpeg")?;
            paths.push(page);
        }
        Ok(paths)
    }
}

fn naming_rules() -> FileNamingRules {
    let mut prefix_patterns = std::collections::BTreeMap::new();
    prefix_patterns.insert(
        "7_제출증거_".to_string(),
        vec!["갑\\d+".to_string(), "을\\d+".to_string()],
    );
    prefix_patterns.insert(
        "8_제출서면_".to_string(),
        vec![
            "소장".to_string(),
            "답변서".to_string(),
            "준비서면".to_string(),
        ],
    );
    prefix_patterns.insert("9_판결_".to_string(), vec!["판결문".to_string()]);
    FileNamingRules { prefix_patterns }
}

fn extraction_config(endpoint: String) -> TextExtractionConfig {
    TextExtractionConfig {
        google_credentials_path: None,
        vision_endpoint: endpoint,
        poppler_path: None,
        dpi: 300,
        language_hints: vec!["ko".to_string()],
        max_concurrent_pages: 2,
        evidence_template: DocumentTemplate {
            patterns: vec!["^7_제출증거_".to_string()],
            metadata_template: "# {filename}\n\n- 총 페이지: {page_count}\n".to_string(),
        },
        submission_template: DocumentTemplate {
            patterns: vec!["^8_제출서면_".to_string()],
            metadata_template: "# {filename}\n\n- 제출자: {submitter}\n- 총 페이지: {page_count}\n"
                .to_string(),
        },
        judgment_template: DocumentTemplate {
            patterns: vec!["^9_판결_".to_string()],
            metadata_template: "# {filename}\n".to_string(),
        },
        default_template: None,
    }
}

fn vision_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "responses": [{
            "fullTextAnnotation": {"text": text}
        }]
    })
}

#[tokio::test]
async fn test_scaffold_import_rename_end_to_end() {
    let case_dir = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let backup = TempDir::new().unwrap();
    let case_folder = case_dir.path().join("2023가단5243_대여금");
    std::fs::create_dir_all(&case_folder).unwrap();

    std::fs::write(
        source
            .path()
            .join("2023가단5243_2023.05.01_서증_갑1_금전소비대차계약서.pdf"),
        b"pdf",
    )
    .unwrap();
    std::fs::write(
        source.path().join("2023가단5243_2023.10.13_답변서_피고.pdf"),
        b"pdf",
    )
    .unwrap();
    std::fs::write(source.path().join("수신확인.txt"), b"txt").unwrap();

    let runner = StepRunner::new(
        vec![
            Box::new(ScaffoldStep::new()),
            Box::new(ImportStep::new(
                source.path().to_path_buf(),
                backup.path().to_path_buf(),
                "원본폴더".to_string(),
                DEFAULT_CHUNK_SIZE,
            )),
            Box::new(RenameStep::new(
                Renamer::new(&naming_rules()).unwrap(),
                "원본폴더".to_string(),
                "절차관련".to_string(),
            )),
        ],
        Arc::new(RunEverything),
    );

    let mut ctx = StepContext::with_case_folder(case_folder.clone());
    runner.run(&mut ctx).await.unwrap();

    // standard folders in place
    assert!(case_folder.join("0_INBOX").is_dir());
    assert!(case_folder.join("7_제출증거").is_dir());
    assert!(case_folder.join("원본폴더").is_dir());

    // downloads consumed and backed up per case
    assert!(source.path().read_dir().unwrap().next().is_none());
    assert!(backup
        .path()
        .join("2023가단5243_대여금_백업/수신확인.txt")
        .exists());

    // classified names in the original folder
    let original = case_folder.join("원본폴더");
    assert!(original
        .join("7_제출증거_(갑1)_금전소비대차계약서.pdf")
        .exists());
    assert!(original
        .join("8_제출서면_2023.10.13.자_답변서_피고.pdf")
        .exists());

    // the unclassified file went to the procedural folder
    assert!(case_folder.join("절차관련/수신확인.txt").exists());

    // every step reported
    assert_eq!(ctx.reports.len(), 3);
    assert!(ctx.reports.iter().all(|r| r.errors.is_empty()));
}

#[tokio::test]
async fn test_extraction_with_mock_vision_api() {
    let case_dir = TempDir::new().unwrap();
    let case_folder = case_dir.path().join("2023가단5243_대여금");
    let original = case_folder.join("원본폴더");
    std::fs::create_dir_all(&original).unwrap();
    std::fs::write(
        original.join("8_제출서면_2023.10.13.자_답변서_피고.pdf"),
        b"pdf",
    )
    .unwrap();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/images:annotate")
            .query_param("key", "test-key");
        then.status(200)
            .json_body(vision_response("피고는 원고의 청구를 모두 기각한다는\n판결을 구합니다."));
    });

    let cfg = extraction_config(server.url("/v1/images:annotate"));
    let step = ExtractStep::new(
        VisionOcr::new(cfg.vision_endpoint.clone(), "test-key".to_string()),
        FakeRasterizer { pages: 2 },
        TemplateSet::new(&cfg, &naming_rules()).unwrap(),
        cfg.language_hints.clone(),
        cfg.max_concurrent_pages,
        "원본폴더".to_string(),
        false,
    );

    let runner = StepRunner::new(vec![Box::new(step)], Arc::new(RunEverything));
    let mut ctx = StepContext::with_case_folder(case_folder.clone());
    runner.run(&mut ctx).await.unwrap();

    // one request per page
    api_mock.assert_hits(2);

    let markdown = std::fs::read_to_string(
        case_folder.join("8_제출서면/8_제출서면_2023.10.13.자_답변서_피고.md"),
    )
    .unwrap();
    assert!(markdown.contains("# 8_제출서면_2023.10.13.자_답변서_피고"));
    assert!(markdown.contains("- 제출자: 피고"));
    assert!(markdown.contains("- 총 페이지: 2"));
    assert!(markdown.contains("[Page 1/2]"));
    assert!(markdown.contains("[Page 2/2]"));
    assert!(markdown.contains("피고는 원고의 청구를 모두 기각한다는 판결을 구합니다."));
}

#[tokio::test]
async fn test_extraction_skips_evidence_without_flag() {
    let case_dir = TempDir::new().unwrap();
    let case_folder = case_dir.path().join("case");
    let original = case_folder.join("원본폴더");
    std::fs::create_dir_all(&original).unwrap();
    std::fs::write(original.join("7_제출증거_(갑1)_계약서.pdf"), b"pdf").unwrap();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/images:annotate");
        then.status(200).json_body(vision_response("본문"));
    });

    let cfg = extraction_config(server.url("/v1/images:annotate"));
    let step = ExtractStep::new(
        VisionOcr::new(cfg.vision_endpoint.clone(), "k".to_string()),
        FakeRasterizer { pages: 1 },
        TemplateSet::new(&cfg, &naming_rules()).unwrap(),
        cfg.language_hints.clone(),
        cfg.max_concurrent_pages,
        "원본폴더".to_string(),
        false,
    );

    let mut ctx = StepContext::with_case_folder(case_folder.clone());
    let runner = StepRunner::new(vec![Box::new(step)], Arc::new(RunEverything));
    runner.run(&mut ctx).await.unwrap();

    api_mock.assert_hits(0);
    assert_eq!(ctx.reports[0].processed, 0);
}
