use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasefilesError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("OCR request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{step} failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("{step} verification failed: {message}")]
    VerificationFailed { step: String, message: String },

    #[error("OCR error: {message}")]
    OcrError { message: String },

    #[error("PDF rasterization failed: {message}")]
    RasterizeError { message: String },

    #[error("Pipeline aborted by operator")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, CasefilesError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Network,
    Configuration,
    Processing,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CasefilesError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Io,
            Self::ApiError(_) | Self::OcrError { .. } => ErrorCategory::Network,
            Self::YamlError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_)
            | Self::StepFailed { .. }
            | Self::VerificationFailed { .. }
            | Self::RasterizeError { .. } => ErrorCategory::Processing,
            Self::Aborted => ErrorCategory::Operator,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Aborted => ErrorSeverity::Low,
            Self::ApiError(_) | Self::OcrError { .. } => ErrorSeverity::Medium,
            Self::IoError(_)
            | Self::ZipError(_)
            | Self::SerializationError(_)
            | Self::StepFailed { .. }
            | Self::VerificationFailed { .. }
            | Self::RasterizeError { .. } => ErrorSeverity::High,
            Self::YamlError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::IoError(_) => {
                "Check that the folders exist and you have permission to write to them".to_string()
            }
            Self::ApiError(_) | Self::OcrError { .. } => {
                "Check network connectivity and the Vision API credentials, then rerun the step"
                    .to_string()
            }
            Self::YamlError(_) | Self::ConfigError { .. } => {
                "Fix the YAML configuration file and rerun".to_string()
            }
            Self::MissingConfigError { field } => {
                format!("Set `{}` in the config file or pass it on the command line", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the `{}` setting", field)
            }
            Self::StepFailed { step, .. } => {
                format!("Inspect the case folder, then rerun {}", step)
            }
            Self::VerificationFailed { step, .. } => format!(
                "The step ran but its output is incomplete; inspect the case folder and rerun {}",
                step
            ),
            Self::RasterizeError { .. } => {
                "Check that Poppler (pdftoppm) is installed and poppler_path points at it"
                    .to_string()
            }
            Self::SerializationError(_) => "Inspect the OCR response for malformed data".to_string(),
            Self::ZipError(_) => "Check free disk space and retry the packing".to_string(),
            Self::Aborted => "Rerun when ready".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Aborted => "Pipeline stopped at your request".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_critical() {
        let err = CasefilesError::MissingConfigError {
            field: "general.source_folder".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.recovery_suggestion().contains("general.source_folder"));
    }

    #[test]
    fn abort_is_low_severity() {
        assert_eq!(CasefilesError::Aborted.severity(), ErrorSeverity::Low);
    }
}
