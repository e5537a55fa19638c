use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::Result;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Files above this size are moved by copy-then-delete instead of rename.
pub const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

static DRIVE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]):[\\/]+(.*)$").unwrap());

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Drop surrounding quotes that Windows "copy as path" adds.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

fn running_under_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

/// Map a Windows drive path (`D:\foo\bar`) to its WSL mount
/// (`/mnt/d/foo/bar`). Non-drive paths pass through untouched, as do all
/// paths when not running under WSL.
pub fn to_native_path(raw: &str) -> String {
    convert_drive_path(raw, running_under_wsl())
}

fn convert_drive_path(raw: &str, under_wsl: bool) -> String {
    if !under_wsl {
        return raw.to_string();
    }
    match DRIVE_PATH.captures(raw) {
        Some(caps) => {
            let drive = caps[1].to_lowercase();
            let rest = caps[2].replace('\\', "/");
            let rest = rest.trim_end_matches('/');
            format!("/mnt/{}/{}", drive, rest)
        }
        None => raw.to_string(),
    }
}

/// Normalize an operator-entered path: strip quotes, convert a Windows
/// drive path when under WSL.
pub fn normalize_input_path(raw: &str) -> PathBuf {
    PathBuf::from(to_native_path(strip_quotes(raw)))
}

/// `name.ext` -> `name_<timestamp>.ext`
pub fn timestamped_name(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, timestamp(), ext),
        None => format!("{}_{}", stem, timestamp()),
    }
}

/// Return `target` unchanged if it is free, otherwise a sibling with a
/// timestamp suffix. Never clobbers an existing file.
pub fn collision_free(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    target.with_file_name(timestamped_name(name))
}

/// Chunked file copy for large downloads; creates the parent directory.
pub fn copy_chunked(src: &Path, dst: &Path, chunk_size: usize) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut reader = File::open(src)?;
    let mut writer = File::create(dst)?;
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total: u64 = 0;

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
        total += read as u64;
    }
    writer.flush()?;

    Ok(total)
}

/// Move a file, falling back to copy+delete for large files and for
/// cross-device renames.
pub fn move_file(src: &Path, dst: &Path, chunk_size: usize) -> Result<()> {
    let size = std::fs::metadata(src)?.len();
    if size <= LARGE_FILE_THRESHOLD {
        if std::fs::rename(src, dst).is_ok() {
            return Ok(());
        }
    }
    copy_chunked(src, dst, chunk_size)?;
    std::fs::remove_file(src)?;
    Ok(())
}

/// Regular files directly inside `dir`, sorted by name for deterministic
/// processing order.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
