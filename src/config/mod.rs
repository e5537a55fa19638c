pub mod yaml_config;

pub use yaml_config::PipelineConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "casefiles")]
#[command(about = "Legal case folder pipeline: import, rename, and OCR-extract case files")]
pub struct CliArgs {
    /// Case folder to operate on; skips interactive selection when given.
    pub case_folder: Option<PathBuf>,

    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Also run text extraction over evidence PDFs.
    #[arg(long)]
    pub evidence: bool,

    /// First step to run (1-5); earlier steps are skipped.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=5))]
    pub from_step: u8,

    /// Answer yes to every prompt (non-interactive mode).
    #[arg(short, long)]
    pub yes: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log CPU and memory usage per step.
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliArgs {
    /// Case folder preselected for this run. The positional argument wins
    /// over the configured value; both go through the same path cleanup
    /// (quote stripping, Windows path conversion).
    pub fn preset_case_folder(&self, config: &PipelineConfig) -> Option<PathBuf> {
        use crate::utils::fs::normalize_input_path;

        self.case_folder
            .as_ref()
            .map(|p| normalize_input_path(&p.to_string_lossy()))
            .or_else(|| config.general.case_folder.as_deref().map(normalize_input_path))
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn config_with_case_folder(case_folder: Option<&str>) -> PipelineConfig {
        let yaml = r##"
general:
  case_roots:
    - /mnt/f/Legalcases
  source_folder: /mnt/d/전자소송다운로드

text_extraction:
  evidence_template:
    patterns: ["7_제출증거_"]
    metadata_template: "# {filename}\n"
  submission_template:
    patterns: ["8_제출서면_"]
    metadata_template: "# {filename}\n"
  judgment_template:
    patterns: ["9_판결_"]
    metadata_template: "# {filename}\n"
"##;
        let mut config = PipelineConfig::from_yaml_str(yaml).unwrap();
        config.general.case_folder = case_folder.map(str::to_string);
        config
    }

    #[test]
    fn cli_case_folder_is_normalized() {
        let args = CliArgs::parse_from(["casefiles", "\"/tmp/사건폴더\""]);
        let preset = args.preset_case_folder(&config_with_case_folder(None));
        assert_eq!(preset, Some(PathBuf::from("/tmp/사건폴더")));
    }

    #[test]
    fn cli_case_folder_wins_over_config() {
        let args = CliArgs::parse_from(["casefiles", "/tmp/cli사건"]);
        let preset = args.preset_case_folder(&config_with_case_folder(Some("/tmp/config사건")));
        assert_eq!(preset, Some(PathBuf::from("/tmp/cli사건")));
    }

    #[test]
    fn config_case_folder_is_the_fallback() {
        let args = CliArgs::parse_from(["casefiles"]);
        let preset = args.preset_case_folder(&config_with_case_folder(Some("/tmp/config사건")));
        assert_eq!(preset, Some(PathBuf::from("/tmp/config사건")));
    }
}
