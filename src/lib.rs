pub mod config;
pub mod core;
pub mod domain;
pub mod ocr;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::PipelineConfig;

pub use self::core::{
    ConsoleConfirmer, ExtractStep, ImportStep, RenameStep, ScaffoldStep, SelectStep, StepRunner,
};
pub use ocr::{PopplerRasterizer, VisionOcr};
pub use utils::error::{CasefilesError, Result};
