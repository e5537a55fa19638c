//! Step 5: OCR every PDF in the original folder into markdown.
//!
//! Each PDF is rasterized page by page, the pages go through OCR
//! concurrently, and the cleaned text lands in a markdown file under the
//! case subfolder matching the file's numbered prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::core::template::{folder_prefix, TemplateSet};
use crate::core::textproc::tidy_ocr_text;
use crate::domain::model::{DocKind, StepContext, StepId, StepReport, SUBMISSION_PREFIX};
use crate::domain::ports::{OcrEngine, PdfRasterizer, PipelineStep};
use crate::utils::error::{CasefilesError, Result};
use crate::utils::fs::list_files;

const EXTRACTION_FAILED_BODY: &str = "## 텍스트 추출 실패\n\n이 PDF 파일에서 텍스트를 추출하지 못했습니다. 파일이 스캔된 이미지일 수 있습니다.";

pub struct ExtractStep<O, R> {
    ocr: Arc<O>,
    rasterizer: Arc<R>,
    templates: TemplateSet,
    language_hints: Arc<Vec<String>>,
    max_concurrent_pages: usize,
    original_folder_name: String,
    process_evidence: bool,
}

impl<O, R> ExtractStep<O, R>
where
    O: OcrEngine + 'static,
    R: PdfRasterizer,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ocr: O,
        rasterizer: R,
        templates: TemplateSet,
        language_hints: Vec<String>,
        max_concurrent_pages: usize,
        original_folder_name: String,
        process_evidence: bool,
    ) -> Self {
        Self {
            ocr: Arc::new(ocr),
            rasterizer: Arc::new(rasterizer),
            templates,
            language_hints: Arc::new(language_hints),
            max_concurrent_pages: max_concurrent_pages.max(1),
            original_folder_name,
            process_evidence,
        }
    }

    fn pdf_files(&self, original_folder: &Path) -> Result<Vec<PathBuf>> {
        let mut pdfs = Vec::new();
        for path in list_files(original_folder)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_pdf = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
            if !is_pdf {
                continue;
            }
            if self.process_evidence || name.starts_with(SUBMISSION_PREFIX) {
                pdfs.push(path);
            }
        }
        Ok(pdfs)
    }

    /// OCR every page image, bounded by `max_concurrent_pages`, returning
    /// the cleaned page texts in page order. A failed page yields an
    /// inline note instead of aborting the document.
    async fn ocr_pages(&self, pages: Vec<PathBuf>, evidence: bool) -> Vec<String> {
        let total = pages.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_pages));
        let mut tasks: JoinSet<(usize, String)> = JoinSet::new();

        for (index, page) in pages.into_iter().enumerate() {
            let ocr = Arc::clone(&self.ocr);
            let hints = Arc::clone(&self.language_hints);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire().await;
                let page_no = index + 1;
                let text = match tokio::fs::read(&page).await {
                    Ok(image) => match ocr.annotate(&image, &hints).await {
                        Ok(text) => tidy_ocr_text(&text, evidence),
                        Err(e) => {
                            warn!("OCR failed on page {}/{}: {}", page_no, total, e);
                            format!("*페이지 {}에서 텍스트 추출 중 오류가 발생했습니다.*", page_no)
                        }
                    },
                    Err(e) => {
                        warn!("failed to read page image {}: {}", page.display(), e);
                        format!("*페이지 {}에서 텍스트 추출 중 오류가 발생했습니다.*", page_no)
                    }
                };
                (index, text)
            });
        }

        let mut results: Vec<(usize, String)> = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) => warn!("page OCR task panicked: {}", e),
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, text)| text).collect()
    }

    fn render_body(page_texts: &[String], evidence: bool) -> Option<String> {
        let total = page_texts.len();
        if page_texts.iter().all(|t| t.trim().is_empty()) {
            return None;
        }

        let mut sections = Vec::new();
        for (i, text) in page_texts.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            let header = if evidence {
                format!(
                    "---\n\n**<span style=\"color:blue; background-color:#E6F7FF;\">Page {}/{}</span>**",
                    i + 1,
                    total
                )
            } else {
                format!(
                    "---\n\n***<span style=\"color:blue; background-color:#A6F1E0;\"><big>[Page {}/{}]</big></span>***",
                    i + 1,
                    total
                )
            };
            sections.push(format!("{}\n\n{}", header, text));
        }
        Some(sections.join("\n\n"))
    }

    async fn process_pdf(&self, pdf_path: &Path, case_folder: &Path) -> Result<PathBuf> {
        let filename = pdf_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CasefilesError::StepFailed {
                step: StepId::Extract.to_string(),
                message: format!("non-unicode filename: {}", pdf_path.display()),
            })?;
        let stem = pdf_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        // markdown goes into the subfolder matching the numbered prefix
        let output_path = match folder_prefix(filename) {
            Some(prefix) => {
                let prefix_folder = case_folder.join(prefix);
                std::fs::create_dir_all(&prefix_folder)?;
                prefix_folder.join(format!("{}.md", stem))
            }
            None => case_folder.join(format!("{}.md", stem)),
        };

        let kind = self.templates.kind_for(filename);
        let header = self.templates.header_for(kind, filename, pdf_path);
        let evidence = kind == DocKind::Evidence;

        let page_dir = tempfile::tempdir()?;
        let pages = self.rasterizer.rasterize(pdf_path, page_dir.path()).await?;
        info!("rasterized {}: {} pages", filename, pages.len());

        let page_count = pages.len();
        let page_texts = self.ocr_pages(pages, evidence).await;

        let body = match Self::render_body(&page_texts, evidence) {
            Some(body) => body,
            None => {
                warn!("no text extracted from any page of {}", filename);
                EXTRACTION_FAILED_BODY.to_string()
            }
        };

        let header = header.replace("{page_count}", &page_count.to_string());
        std::fs::write(&output_path, format!("{}\n\n{}", header, body))?;
        info!("wrote {}", output_path.display());

        Ok(output_path)
    }
}

#[async_trait]
impl<O, R> PipelineStep for ExtractStep<O, R>
where
    O: OcrEngine + 'static,
    R: PdfRasterizer,
{
    fn id(&self) -> StepId {
        StepId::Extract
    }

    async fn run(&self, ctx: &mut StepContext) -> Result<StepReport> {
        let case_folder = ctx
            .case_folder
            .clone()
            .ok_or_else(|| CasefilesError::StepFailed {
                step: StepId::Extract.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        let original_folder = case_folder.join(&self.original_folder_name);
        if !original_folder.is_dir() {
            return Err(CasefilesError::StepFailed {
                step: StepId::Extract.to_string(),
                message: format!("original folder missing: {}", original_folder.display()),
            });
        }

        let pdfs = self.pdf_files(&original_folder)?;
        if pdfs.is_empty() {
            info!("no PDF files to extract");
            return Ok(StepReport::new(StepId::Extract));
        }
        info!(
            "extracting {} PDF files (evidence: {})",
            pdfs.len(),
            self.process_evidence
        );

        let mut report = StepReport::new(StepId::Extract);
        let mut outputs = Vec::new();
        for pdf in &pdfs {
            match self.process_pdf(pdf, &case_folder).await {
                Ok(path) => {
                    report.processed += 1;
                    outputs.push(serde_json::Value::String(path.display().to_string()));
                }
                Err(e) => {
                    report
                        .errors
                        .push(format!("extraction failed ({}): {}", pdf.display(), e));
                }
            }
        }

        info!(
            "extraction complete: {} files, {} errors",
            report.processed,
            report.errors.len()
        );
        Ok(report.with_metadata("outputs", serde_json::Value::Array(outputs)))
    }

    fn verify(&self, ctx: &StepContext) -> Result<()> {
        let case_folder = ctx
            .case_folder
            .as_ref()
            .ok_or_else(|| CasefilesError::VerificationFailed {
                step: StepId::Extract.to_string(),
                message: "no case folder selected".to_string(),
            })?;

        // markdown outputs from a prior run count; the report itself is
        // checked by the runner
        let original_folder = case_folder.join(&self.original_folder_name);
        let had_pdfs = !self.pdf_files(&original_folder)?.is_empty();
        if !had_pdfs {
            return Ok(());
        }

        let mut has_markdown = false;
        for entry in std::fs::read_dir(case_folder)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("md") {
                has_markdown = true;
                break;
            }
            if path.is_dir() {
                for sub in std::fs::read_dir(&path)? {
                    let sub = sub?.path();
                    if sub.extension().and_then(|e| e.to_str()) == Some("md") {
                        has_markdown = true;
                        break;
                    }
                }
            }
            if has_markdown {
                break;
            }
        }

        if !has_markdown {
            return Err(CasefilesError::VerificationFailed {
                step: StepId::Extract.to_string(),
                message: "no markdown output produced".to_string(),
            });
        }
        Ok(())
    }
}
