use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::model::{CaseEntry, StepContext, StepId, StepReport};
use crate::utils::error::Result;

/// Operator answer to a per-step prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run,
    Skip,
    Abort,
}

/// One stage of the case pipeline. Steps run in order and pass state
/// through the [`StepContext`].
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn id(&self) -> StepId;

    async fn run(&self, ctx: &mut StepContext) -> Result<StepReport>;

    /// Check the step's outcome on disk after a successful run. Failures
    /// here stop the sequence.
    fn verify(&self, ctx: &StepContext) -> Result<()>;
}

/// Operator interaction seam. The production implementation reads stdin;
/// tests substitute scripted answers.
pub trait Confirmer: Send + Sync {
    /// Ask whether to run, skip, or abort before a step executes.
    fn confirm_step(&self, step: StepId, case_folder: Option<&Path>) -> Result<Decision>;

    /// Offer the candidate case folders and return the chosen index, or
    /// `None` to enter a path manually.
    fn pick_case(&self, entries: &[CaseEntry]) -> Result<Option<usize>>;

    /// Ask whether the case path saved by a previous run should be reused.
    fn confirm_saved_path(&self, path: &Path) -> Result<bool>;

    /// Prompt for a case folder path typed by the operator.
    fn read_case_path(&self) -> Result<PathBuf>;

    /// Ask whether a missing directory should be created.
    fn confirm_create(&self, path: &Path) -> Result<bool>;

    /// Ask whether evidence PDFs should also go through extraction.
    fn confirm_extract_evidence(&self) -> Result<bool>;
}

/// Turns a page image into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn annotate(&self, image: &[u8], language_hints: &[String]) -> Result<String>;
}

/// Renders a PDF into one image per page.
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    /// Rasterize `pdf` into `out_dir`, returning the page images in page
    /// order.
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>>;
}
