use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Standard subfolders of a case folder, in creation order. Names are the
/// fixed Korean convention used by the downstream knowledge base.
pub const STANDARD_FOLDERS: &[&str] = &[
    "0_INBOX",
    "1_기본정보",
    "2_사건개요",
    "3_사실관계",
    "4_기준판례",
    "5_관련법리",
    "6_논리구성",
    "7_제출증거",
    "8_제출서면",
    "9_판결",
    "원본폴더",
    "절차관련",
];

pub const ORIGINAL_FOLDER: &str = "원본폴더";
pub const PROCEDURAL_FOLDER: &str = "절차관련";

pub const BASIC_INFO_PREFIX: &str = "1_기본정보_";
pub const EVIDENCE_PREFIX: &str = "7_제출증거_";
pub const SUBMISSION_PREFIX: &str = "8_제출서면_";
pub const JUDGMENT_PREFIX: &str = "9_판결_";

/// Prefixes the classifier can emit; prefix application strips these
/// before re-classifying a file.
pub const KNOWN_PREFIXES: &[&str] = &[
    BASIC_INFO_PREFIX,
    EVIDENCE_PREFIX,
    SUBMISSION_PREFIX,
    JUDGMENT_PREFIX,
];

/// Side file holding the selected case folder path between invocations.
pub const CASE_PATH_FILE: &str = "case_path.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepId {
    Select,
    Scaffold,
    Import,
    Rename,
    Extract,
}

impl StepId {
    pub fn number(&self) -> u8 {
        match self {
            Self::Select => 1,
            Self::Scaffold => 2,
            Self::Import => 3,
            Self::Rename => 4,
            Self::Extract => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Scaffold => "scaffold",
            Self::Import => "import",
            Self::Rename => "rename",
            Self::Extract => "extract",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Select => "Select the case folder and persist its path",
            Self::Scaffold => "Create the standard subfolder structure in the case folder",
            Self::Import => "Copy downloaded files into the case folder and back up the originals",
            Self::Rename => "Rename imported files to the standard naming convention",
            Self::Extract => "Extract text from PDF files into markdown via OCR",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({})", self.number(), self.name())
    }
}

/// Document category used by the extraction templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Evidence,
    Submission,
    Judgment,
    Other,
}

/// A candidate case folder offered during selection.
#[derive(Debug, Clone)]
pub struct CaseEntry {
    /// Name of the root directory the entry came from.
    pub root_name: String,
    pub name: String,
    pub path: PathBuf,
}

/// Outcome of one executed step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: StepId,
    pub processed: usize,
    pub errors: Vec<String>,
    pub duration: Duration,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StepReport {
    pub fn new(step: StepId) -> Self {
        Self {
            step,
            processed: 0,
            errors: Vec::new(),
            duration: Duration::ZERO,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Mutable state threaded through the step sequence. The case folder is
/// the only value a step may hand to its successors.
#[derive(Debug, Default)]
pub struct StepContext {
    pub case_folder: Option<PathBuf>,
    pub reports: Vec<StepReport>,
}

impl StepContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case_folder(case_folder: PathBuf) -> Self {
        Self {
            case_folder: Some(case_folder),
            reports: Vec::new(),
        }
    }

    pub fn report_for(&self, step: StepId) -> Option<&StepReport> {
        self.reports.iter().find(|r| r.step == step)
    }
}
