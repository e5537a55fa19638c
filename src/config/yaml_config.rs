use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{CasefilesError, Result};
use crate::utils::validation::{self, Validate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub file_management: FileManagementConfig,
    #[serde(default)]
    pub file_naming_rules: FileNamingRules,
    pub text_extraction: TextExtractionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Roots whose subdirectories are offered as case folders during
    /// selection.
    pub case_roots: Vec<String>,
    /// Download folder whose files are imported into the case folder.
    pub source_folder: String,
    /// Preselected case folder; selection is skipped when set.
    pub case_folder: Option<String>,
    /// Where consumed downloads are moved; defaults to
    /// `<source_folder>_백업`.
    pub backup_folder: Option<String>,
}

impl GeneralConfig {
    pub fn backup_folder(&self) -> String {
        match &self.backup_folder {
            Some(folder) => folder.clone(),
            None => format!("{}_백업", self.source_folder),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileManagementConfig {
    #[serde(default = "default_original_folder")]
    pub original_folder_name: String,
    /// Destination for files the rename step could not classify.
    #[serde(default = "default_target_folder")]
    pub target_folder_name: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for FileManagementConfig {
    fn default() -> Self {
        Self {
            original_folder_name: default_original_folder(),
            target_folder_name: default_target_folder(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Keyword tables for prefix classification, keyed by the numbered prefix
/// (`"1_기본정보_"`, `"7_제출증거_"`, ...). BTreeMap keeps the numeric order
/// so lower-numbered rules win ties deterministically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileNamingRules {
    #[serde(default)]
    pub prefix_patterns: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextExtractionConfig {
    pub google_credentials_path: Option<String>,
    #[serde(default = "default_vision_endpoint")]
    pub vision_endpoint: String,
    /// Directory holding the poppler binaries; `pdftoppm` must be on PATH
    /// when unset.
    pub poppler_path: Option<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_language_hints")]
    pub language_hints: Vec<String>,
    #[serde(default = "default_max_concurrent_pages")]
    pub max_concurrent_pages: usize,
    pub evidence_template: DocumentTemplate,
    pub submission_template: DocumentTemplate,
    pub judgment_template: DocumentTemplate,
    /// Header for PDFs that match none of the category patterns.
    pub default_template: Option<DocumentTemplate>,
}

/// Per-category extraction template: filename patterns that select the
/// category plus the markdown header block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub patterns: Vec<String>,
    pub metadata_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub log_dir: Option<String>,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            file: None,
        }
    }
}

fn default_original_folder() -> String {
    crate::domain::model::ORIGINAL_FOLDER.to_string()
}

fn default_target_folder() -> String {
    crate::domain::model::PROCEDURAL_FOLDER.to_string()
}

fn default_chunk_size() -> usize {
    crate::utils::fs::DEFAULT_CHUNK_SIZE
}

fn default_vision_endpoint() -> String {
    "https://vision.googleapis.com/v1/images:annotate".to_string()
}

fn default_dpi() -> u32 {
    300
}

fn default_language_hints() -> Vec<String> {
    vec!["ko".to_string()]
}

fn default_max_concurrent_pages() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CasefilesError::IoError)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        serde_yaml::from_str(&processed).map_err(CasefilesError::YamlError)
    }

    /// Replace `${VAR_NAME}` occurrences with the environment variable's
    /// value; unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static regex");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.general.case_roots.is_empty() && self.general.case_folder.is_none() {
            return Err(CasefilesError::MissingConfigError {
                field: "general.case_roots".to_string(),
            });
        }
        for root in &self.general.case_roots {
            validation::validate_path("general.case_roots", root)?;
        }
        validation::validate_path("general.source_folder", &self.general.source_folder)?;
        if let Some(case_folder) = &self.general.case_folder {
            validation::validate_path("general.case_folder", case_folder)?;
        }

        validation::validate_non_empty_string(
            "file_management.original_folder_name",
            &self.file_management.original_folder_name,
        )?;
        validation::validate_non_empty_string(
            "file_management.target_folder_name",
            &self.file_management.target_folder_name,
        )?;
        validation::validate_positive_number("file_management.chunk_size", self.file_management.chunk_size, 1)?;

        for (prefix, patterns) in &self.file_naming_rules.prefix_patterns {
            validation::validate_patterns(
                &format!("file_naming_rules.prefix_patterns.{}", prefix),
                patterns,
            )?;
        }

        validation::validate_url("text_extraction.vision_endpoint", &self.text_extraction.vision_endpoint)?;
        validation::validate_positive_number("text_extraction.dpi", self.text_extraction.dpi as usize, 72)?;
        validation::validate_positive_number(
            "text_extraction.max_concurrent_pages",
            self.text_extraction.max_concurrent_pages,
            1,
        )?;
        for (name, template) in [
            ("evidence_template", &self.text_extraction.evidence_template),
            ("submission_template", &self.text_extraction.submission_template),
            ("judgment_template", &self.text_extraction.judgment_template),
        ] {
            validation::validate_patterns(
                &format!("text_extraction.{}.patterns", name),
                &template.patterns,
            )?;
            validation::validate_non_empty_string(
                &format!("text_extraction.{}.metadata_template", name),
                &template.metadata_template,
            )?;
        }

        Ok(())
    }

    /// Resolve the Vision API key: `GOOGLE_VISION_API_KEY` first, then the
    /// contents of the credentials file.
    pub fn vision_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("GOOGLE_VISION_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }
        if let Some(path) = &self.text_extraction.google_credentials_path {
            let key = std::fs::read_to_string(path).map_err(CasefilesError::IoError)?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }
        Err(CasefilesError::MissingConfigError {
            field: "text_extraction.google_credentials_path".to_string(),
        })
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        let file = self.logging.file.as_ref()?;
        match &self.logging.log_dir {
            Some(dir) => Some(Path::new(dir).join(file)),
            None => Some(PathBuf::from(file)),
        }
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_yaml() -> String {
        r##"
general:
  case_roots:
    - /mnt/f/Legalcases
  source_folder: /mnt/d/전자소송다운로드

text_extraction:
  evidence_template:
    patterns:
      - "7_제출증거_"
    metadata_template: "# {filename}\n"
  submission_template:
    patterns:
      - "8_제출서면_"
    metadata_template: "# {filename}\n"
  judgment_template:
    patterns:
      - "9_판결_"
    metadata_template: "# {filename}\n"
"##
        .to_string()
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = PipelineConfig::from_yaml_str(&minimal_yaml()).unwrap();

        assert_eq!(config.general.case_roots.len(), 1);
        assert_eq!(config.general.backup_folder(), "/mnt/d/전자소송다운로드_백업");
        assert_eq!(config.file_management.original_folder_name, "원본폴더");
        assert_eq!(config.file_management.target_folder_name, "절차관련");
        assert_eq!(config.text_extraction.dpi, 300);
        assert_eq!(config.text_extraction.language_hints, vec!["ko"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_CASE_SOURCE", "/tmp/downloads");

        let yaml = minimal_yaml().replace("/mnt/d/전자소송다운로드", "${TEST_CASE_SOURCE}");
        let config = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.general.source_folder, "/tmp/downloads");

        std::env::remove_var("TEST_CASE_SOURCE");
    }

    #[test]
    fn test_unset_env_var_left_in_place() {
        let yaml = minimal_yaml().replace("/mnt/d/전자소송다운로드", "${CASEFILES_UNSET_VAR}");
        let config = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.general.source_folder, "${CASEFILES_UNSET_VAR}");
    }

    #[test]
    fn test_invalid_prefix_pattern_rejected() {
        let yaml = format!(
            "{}\nfile_naming_rules:\n  prefix_patterns:\n    7_제출증거_:\n      - \"(unclosed\"\n",
            minimal_yaml()
        );
        let config = PipelineConfig::from_yaml_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(minimal_yaml().as_bytes()).unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.general.case_roots.len(), 1);
    }

    #[test]
    fn test_vision_api_key_from_credentials_file() {
        let mut cred_file = NamedTempFile::new().unwrap();
        cred_file.write_all(b"test-api-key\n").unwrap();

        let mut config = PipelineConfig::from_yaml_str(&minimal_yaml()).unwrap();
        config.text_extraction.google_credentials_path =
            Some(cred_file.path().to_string_lossy().to_string());

        assert_eq!(config.vision_api_key().unwrap(), "test-api-key");
    }

    #[test]
    fn test_log_file_path_joins_dir() {
        let mut config = PipelineConfig::from_yaml_str(&minimal_yaml()).unwrap();
        config.logging.log_dir = Some("logs".to_string());
        config.logging.file = Some("casefiles.log".to_string());

        assert_eq!(config.log_file_path(), Some(PathBuf::from("logs/casefiles.log")));
    }
}
