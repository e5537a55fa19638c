use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use casefiles::core::template::TemplateSet;
use casefiles::core::{
    naming::Renamer, ConsoleConfirmer, ExtractStep, ImportStep, RenameStep, ScaffoldStep,
    SelectStep, StepRunner,
};
use casefiles::domain::model::StepContext;
use casefiles::domain::ports::{Confirmer, PipelineStep};
use casefiles::ocr::{PopplerRasterizer, VisionOcr};
use casefiles::utils::fs::normalize_input_path;
use casefiles::utils::validation::Validate;
use casefiles::utils::{logger, monitor::SystemMonitor};
use casefiles::{CliArgs, PipelineConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config = match PipelineConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", args.config.display(), e);
            eprintln!("💡 건의: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    match config.log_file_path() {
        Some(log_file) => logger::init_logger_with_file(args.verbose, &log_file)?,
        None => logger::init_cli_logger(args.verbose),
    }

    tracing::info!("Starting casefiles pipeline");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let confirmer: Arc<dyn Confirmer> = Arc::new(ConsoleConfirmer::new(args.yes));

    let preset: Option<PathBuf> = args.preset_case_folder(&config);

    // decide up front whether evidence PDFs also get extracted
    let process_evidence = if args.evidence {
        true
    } else if args.from_step <= 5 && !args.yes {
        confirmer.confirm_extract_evidence()?
    } else {
        false
    };

    let steps = match build_steps(&config, preset.clone(), Arc::clone(&confirmer), process_evidence) {
        Ok(steps) => steps,
        Err(e) => {
            tracing::error!("❌ Failed to assemble pipeline: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let mut runner = StepRunner::new(steps, confirmer).from_step(args.from_step);
    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
        runner = runner.with_monitor(SystemMonitor::new(true));
    }

    let mut ctx = StepContext::new();
    if args.from_step > 1 {
        // selection is skipped, so the case folder must come from the
        // preset or a previous run
        match casefiles::core::select::resume_case_folder(preset) {
            Ok(case_folder) => {
                tracing::info!("resuming in case folder: {}", case_folder.display());
                ctx.case_folder = Some(case_folder);
            }
            Err(e) => {
                tracing::error!("❌ Cannot resume from step {}: {}", args.from_step, e);
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 건의: {}", e.recovery_suggestion());
                std::process::exit(1);
            }
        }
    }
    match runner.run(&mut ctx).await {
        Ok(()) => {
            tracing::info!("✅ All steps completed successfully!");
            if let Some(case_folder) = &ctx.case_folder {
                println!("✅ 작업이 완료되었습니다: {}", case_folder.display());
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 건의: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                casefiles::utils::error::ErrorSeverity::Low => 0,
                casefiles::utils::error::ErrorSeverity::Medium => 2,
                casefiles::utils::error::ErrorSeverity::High => 1,
                casefiles::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn build_steps(
    config: &PipelineConfig,
    preset: Option<PathBuf>,
    confirmer: Arc<dyn Confirmer>,
    process_evidence: bool,
) -> casefiles::Result<Vec<Box<dyn PipelineStep>>> {
    let case_roots = config
        .general
        .case_roots
        .iter()
        .map(|root| normalize_input_path(root))
        .collect();

    let renamer = Renamer::new(&config.file_naming_rules)?;
    let templates = TemplateSet::new(&config.text_extraction, &config.file_naming_rules)?;

    // credentials are only needed once extraction reaches the API
    let ocr = VisionOcr::with_key_lookup(config.text_extraction.vision_endpoint.clone(), {
        let config = config.clone();
        move || config.vision_api_key()
    });
    let rasterizer = PopplerRasterizer::new(
        config
            .text_extraction
            .poppler_path
            .as_deref()
            .map(normalize_input_path),
        config.text_extraction.dpi,
    );

    Ok(vec![
        Box::new(SelectStep::new(case_roots, preset, confirmer)),
        Box::new(ScaffoldStep::new()),
        Box::new(ImportStep::new(
            normalize_input_path(&config.general.source_folder),
            normalize_input_path(&config.general.backup_folder()),
            config.file_management.original_folder_name.clone(),
            config.file_management.chunk_size,
        )),
        Box::new(RenameStep::new(
            renamer,
            config.file_management.original_folder_name.clone(),
            config.file_management.target_folder_name.clone(),
        )),
        Box::new(ExtractStep::new(
            ocr,
            rasterizer,
            templates,
            config.text_extraction.language_hints.clone(),
            config.text_extraction.max_concurrent_pages,
            config.file_management.original_folder_name.clone(),
            process_evidence,
        )),
    ])
}
