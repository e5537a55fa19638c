//! Zip a case folder for handoff.
//!
//! Working directories (the inbox and the raw originals) stay out of the
//! archive unless asked for.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use zip::write::{SimpleFileOptions, ZipWriter};

use casefiles::utils::error::{CasefilesError, Result};
use casefiles::utils::fs::normalize_input_path;
use casefiles::utils::logger;

const EXCLUDED_FOLDERS: &[&str] = &["0_INBOX", "원본폴더"];

#[derive(Debug, Parser)]
#[command(name = "pack-case")]
#[command(about = "Pack a case folder into a zip archive")]
struct Args {
    /// Case folder to pack.
    case_folder: PathBuf,

    /// Output zip path; defaults to `<case name>.zip` next to the folder.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include the inbox and original-file folders.
    #[arg(long)]
    include_working_dirs: bool,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let case_folder = normalize_input_path(&args.case_folder.to_string_lossy());
    if !case_folder.is_dir() {
        eprintln!("❌ 사건 폴더를 찾을 수 없습니다: {}", case_folder.display());
        std::process::exit(1);
    }

    let case_name = case_folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "case".to_string());
    let output = args.output.unwrap_or_else(|| {
        case_folder
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("{}.zip", case_name))
    });

    match pack(&case_folder, &output, args.include_working_dirs) {
        Ok(count) => {
            tracing::info!("packed {} files into {}", count, output.display());
            println!("✅ {} ({} files)", output.display(), count);
        }
        Err(e) => {
            tracing::error!("packing failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    }
}

fn pack(case_folder: &Path, output: &Path, include_working_dirs: bool) -> Result<usize> {
    let file = File::create(output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let mut count = 0usize;
    let mut buffer = Vec::new();
    for path in collect_files(case_folder, case_folder, include_working_dirs)? {
        let relative = path
            .strip_prefix(case_folder)
            .map_err(|_| CasefilesError::ConfigError {
                message: format!("file outside case folder: {}", path.display()),
            })?;
        let name = relative.to_string_lossy().replace('\\', "/");

        zip.start_file(name, options)?;
        buffer.clear();
        File::open(&path)?.read_to_end(&mut buffer)?;
        zip.write_all(&buffer)?;
        count += 1;
    }
    zip.finish()?;
    Ok(count)
}

/// Files under `dir` in sorted order, skipping the working directories at
/// the case folder root.
fn collect_files(root: &Path, dir: &Path, include_working_dirs: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            let at_root = path.parent() == Some(root);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if at_root && !include_working_dirs && EXCLUDED_FOLDERS.contains(&name) {
                continue;
            }
            files.extend(collect_files(root, &path, include_working_dirs)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}
