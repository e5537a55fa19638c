//! PDF page rasterization via poppler's `pdftoppm`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::ports::PdfRasterizer;
use crate::utils::error::{CasefilesError, Result};

pub struct PopplerRasterizer {
    /// Directory holding the poppler binaries; `None` relies on `PATH`.
    poppler_path: Option<PathBuf>,
    dpi: u32,
}

impl PopplerRasterizer {
    pub fn new(poppler_path: Option<PathBuf>, dpi: u32) -> Self {
        Self { poppler_path, dpi }
    }

    fn pdftoppm(&self) -> PathBuf {
        match &self.poppler_path {
            Some(dir) => dir.join("pdftoppm"),
            None => PathBuf::from("pdftoppm"),
        }
    }

    /// Page number from a `page-07.jpg` style name; `pdftoppm` pads the
    /// index, so numeric order beats string order only for mixed widths.
    fn page_number(path: &Path) -> u32 {
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.rsplit('-').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PdfRasterizer for PopplerRasterizer {
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = out_dir.join("page");
        debug!("rasterizing {} at {} dpi", pdf.display(), self.dpi);

        let output = Command::new(self.pdftoppm())
            .arg("-jpeg")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| CasefilesError::RasterizeError {
                message: format!("failed to launch pdftoppm: {}", e),
            })?;

        if !output.status.success() {
            return Err(CasefilesError::RasterizeError {
                message: format!(
                    "pdftoppm failed on {}: {}",
                    pdf.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let mut pages: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("jpg"))
                    .unwrap_or(false)
            })
            .collect();
        pages.sort_by_key(|path| Self::page_number(path));

        if pages.is_empty() {
            return Err(CasefilesError::RasterizeError {
                message: format!("pdftoppm produced no pages for {}", pdf.display()),
            });
        }
        Ok(pages)
    }
}
