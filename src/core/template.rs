//! Markdown headers for extracted documents.
//!
//! Each document category carries a configurable metadata header; the
//! variables are filled from the filename and the extraction run.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::yaml_config::{FileNamingRules, TextExtractionConfig};
use crate::domain::model::{DocKind, EVIDENCE_PREFIX, JUDGMENT_PREFIX, SUBMISSION_PREFIX};
use crate::utils::error::{CasefilesError, Result};

static FOLDER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+_[^_]+)_").unwrap());
static DOTTED_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}\.\d{2}\.\d{2}").unwrap());

/// Numbered folder prefix of a classified filename, without the trailing
/// underscore (`7_제출증거_...` -> `7_제출증거`). Extracted markdown is
/// filed under the matching case subfolder.
pub fn folder_prefix(filename: &str) -> Option<&str> {
    FOLDER_PREFIX
        .captures(filename)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

struct CategoryTemplate {
    patterns: Vec<Regex>,
    header: String,
}

impl CategoryTemplate {
    fn compile(patterns: &[String], header: &str, field: &str) -> Result<Self> {
        let mut compiled = Vec::new();
        for raw in patterns {
            let regex =
                Regex::new(raw).map_err(|e| CasefilesError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
            compiled.push(regex);
        }
        Ok(Self {
            patterns: compiled,
            header: header.to_string(),
        })
    }

    fn matches(&self, filename: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(filename))
    }
}

/// Compiled category templates plus the naming-rule tables used as a
/// classification fallback.
pub struct TemplateSet {
    evidence: CategoryTemplate,
    submission: CategoryTemplate,
    judgment: CategoryTemplate,
    default_header: String,
    rule_patterns: Vec<(String, Vec<Regex>)>,
}

impl TemplateSet {
    pub fn new(cfg: &TextExtractionConfig, rules: &FileNamingRules) -> Result<Self> {
        let evidence = CategoryTemplate::compile(
            &cfg.evidence_template.patterns,
            &cfg.evidence_template.metadata_template,
            "text_extraction.evidence_template.patterns",
        )?;
        let submission = CategoryTemplate::compile(
            &cfg.submission_template.patterns,
            &cfg.submission_template.metadata_template,
            "text_extraction.submission_template.patterns",
        )?;
        let judgment = CategoryTemplate::compile(
            &cfg.judgment_template.patterns,
            &cfg.judgment_template.metadata_template,
            "text_extraction.judgment_template.patterns",
        )?;
        let default_header = cfg
            .default_template
            .as_ref()
            .map(|t| t.metadata_template.clone())
            .unwrap_or_default();

        let mut rule_patterns = Vec::new();
        for (prefix, patterns) in &rules.prefix_patterns {
            let mut compiled = Vec::new();
            for raw in patterns {
                let regex =
                    Regex::new(raw).map_err(|e| CasefilesError::InvalidConfigValueError {
                        field: format!("file_naming_rules.prefix_patterns.{}", prefix),
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
                compiled.push(regex);
            }
            rule_patterns.push((prefix.clone(), compiled));
        }

        Ok(Self {
            evidence,
            submission,
            judgment,
            default_header,
            rule_patterns,
        })
    }

    /// Classify a filename; template patterns first, naming-rule tables as
    /// fallback.
    pub fn kind_for(&self, filename: &str) -> DocKind {
        if self.evidence.matches(filename) {
            return DocKind::Evidence;
        }
        if self.submission.matches(filename) {
            return DocKind::Submission;
        }
        if self.judgment.matches(filename) {
            return DocKind::Judgment;
        }

        for (prefix, patterns) in &self.rule_patterns {
            if !patterns.iter().any(|p| p.is_match(filename)) {
                continue;
            }
            if prefix.starts_with(EVIDENCE_PREFIX) {
                return DocKind::Evidence;
            }
            if prefix.starts_with(SUBMISSION_PREFIX) {
                return DocKind::Submission;
            }
            if prefix.starts_with(JUDGMENT_PREFIX) {
                return DocKind::Judgment;
            }
        }

        DocKind::Other
    }

    /// Render the metadata header. `{page_count}` is left in place for the
    /// caller to fill once the page total is known.
    pub fn header_for(&self, kind: DocKind, filename: &str, pdf_path: &Path) -> String {
        let template = match kind {
            DocKind::Evidence => &self.evidence.header,
            DocKind::Submission => &self.submission.header,
            DocKind::Judgment => &self.judgment.header,
            DocKind::Other => &self.default_header,
        };

        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let path_str = pdf_path.to_string_lossy().to_string();
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("filename", stem.to_string());
        vars.insert("pdf_name_without_ext", stem.to_string());
        vars.insert("pdf_path", path_str.clone());
        vars.insert("extraction_date", now.clone());
        vars.insert("datetime", now);
        vars.insert("page_count", "{page_count}".to_string());
        vars.insert("total_pages", "{page_count}".to_string());
        vars.insert("original_file", path_str.clone());
        vars.insert("original_file_path", path_str);
        vars.insert("original_file_name", filename.to_string());

        fill_name_metadata(stem, kind, &mut vars);

        let mut rendered = template.clone();
        for (key, value) in &vars {
            let placeholder = format!("{{{}}}", key);
            if rendered.contains(&placeholder) {
                rendered = rendered.replace(&placeholder, value);
            }
        }
        rendered
    }
}

/// Pull date, document type, and submitter out of a classified filename
/// like `8_제출서면_2023.10.13.자_답변서_피고`.
fn fill_name_metadata(stem: &str, kind: DocKind, vars: &mut HashMap<&str, String>) {
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 3 {
        return;
    }

    let date = parts
        .iter()
        .find_map(|p| DOTTED_DATE.find(p).map(|m| m.as_str().to_string()));

    match kind {
        DocKind::Submission => {
            if let Some(date) = date {
                vars.insert("date", date);
            }
            if parts.len() >= 4 {
                vars.insert("document_type", parts[parts.len() - 2].to_string());
                vars.insert("submitter", parts[parts.len() - 1].to_string());
            }
        }
        DocKind::Evidence => {
            if let Some(date) = date {
                vars.insert("date", date.clone());
                vars.insert("evidence_date", date);
            }
            if parts.len() >= 4 {
                vars.insert("evidence_type", parts[parts.len() - 2].to_string());
                vars.insert("submitter", parts[parts.len() - 1].to_string());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml_config::DocumentTemplate;
    use std::collections::BTreeMap;

    fn extraction_config() -> TextExtractionConfig {
        TextExtractionConfig {
            google_credentials_path: None,
            vision_endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            poppler_path: None,
            dpi: 300,
            language_hints: vec!["ko".to_string()],
            max_concurrent_pages: 4,
            evidence_template: DocumentTemplate {
                patterns: vec!["^7_제출증거_".to_string()],
                metadata_template: "# {filename}\n- 추출일: {extraction_date}\n- 페이지: {page_count}\n".to_string(),
            },
            submission_template: DocumentTemplate {
                patterns: vec!["^8_제출서면_".to_string()],
                metadata_template: "# {filename}\n- 제출일: {date}\n- 서면: {document_type}\n- 제출자: {submitter}\n".to_string(),
            },
            judgment_template: DocumentTemplate {
                patterns: vec!["^9_판결_".to_string()],
                metadata_template: "# {filename}\n".to_string(),
            },
            default_template: None,
        }
    }

    fn templates() -> TemplateSet {
        TemplateSet::new(&extraction_config(), &FileNamingRules::default()).unwrap()
    }

    #[test]
    fn folder_prefix_extraction() {
        assert_eq!(folder_prefix("7_제출증거_(갑1)_계약서.pdf"), Some("7_제출증거"));
        assert_eq!(folder_prefix("계약서.pdf"), None);
    }

    #[test]
    fn kind_matches_template_patterns() {
        let t = templates();
        assert_eq!(t.kind_for("7_제출증거_(갑1)_계약서.pdf"), DocKind::Evidence);
        assert_eq!(
            t.kind_for("8_제출서면_2023.10.13.자_답변서_피고.pdf"),
            DocKind::Submission
        );
        assert_eq!(t.kind_for("9_판결_2024.01.15.자_판결문.pdf"), DocKind::Judgment);
        assert_eq!(t.kind_for("메모.pdf"), DocKind::Other);
    }

    #[test]
    fn kind_falls_back_to_naming_rules() {
        let mut prefix_patterns = BTreeMap::new();
        prefix_patterns.insert(JUDGMENT_PREFIX.to_string(), vec!["판결문".to_string()]);
        let rules = FileNamingRules { prefix_patterns };

        let t = TemplateSet::new(&extraction_config(), &rules).unwrap();
        assert_eq!(t.kind_for("2024.01.15.자_판결문.pdf"), DocKind::Judgment);
    }

    #[test]
    fn header_fills_filename_metadata() {
        let t = templates();
        let filename = "8_제출서면_2023.10.13.자_답변서_피고.pdf";
        let header = t.header_for(DocKind::Submission, filename, Path::new("/case/원본폴더").join(filename).as_path());

        assert!(header.contains("# 8_제출서면_2023.10.13.자_답변서_피고"));
        assert!(header.contains("- 제출일: 2023.10.13"));
        assert!(header.contains("- 서면: 답변서"));
        assert!(header.contains("- 제출자: 피고"));
    }

    #[test]
    fn page_count_placeholder_survives_rendering() {
        let t = templates();
        let header = t.header_for(
            DocKind::Evidence,
            "7_제출증거_(갑1)_계약서.pdf",
            Path::new("/case/원본폴더/7_제출증거_(갑1)_계약서.pdf"),
        );
        assert!(header.contains("- 페이지: {page_count}"));
    }
}
