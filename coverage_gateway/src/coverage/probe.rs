//! Read-only inspection of coverage artifacts on disk.
//!
//! Raw execution records are only checked for existence and size. Class
//! directories are walked recursively and every file ending in `.class`
//! is counted. A walk error is reported on the entry for that path and the
//! remaining paths are still probed.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

const CLASS_FILE_SUFFIX: &str = ".class";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecordProbe {
    pub path: PathBuf,
    pub exists: bool,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassDirProbe {
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_file_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn probe_record(path: &Path) -> RecordProbe {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => RecordProbe {
            path: path.to_path_buf(),
            exists: true,
            size: Some(metadata.len()),
        },
        _ => RecordProbe {
            path: path.to_path_buf(),
            exists: false,
            size: None,
        },
    }
}

pub fn probe_records(paths: &[PathBuf]) -> Vec<RecordProbe> {
    paths.iter().map(|path| probe_record(path)).collect()
}

pub fn probe_class_dir(path: &Path) -> ClassDirProbe {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => {
            return ClassDirProbe {
                path: path.to_path_buf(),
                exists: false,
                is_directory: None,
                class_file_count: None,
                error: None,
            }
        }
    };

    if !metadata.is_dir() {
        return ClassDirProbe {
            path: path.to_path_buf(),
            exists: true,
            is_directory: Some(false),
            class_file_count: None,
            error: None,
        };
    }

    match count_class_files(path) {
        Ok(count) => ClassDirProbe {
            path: path.to_path_buf(),
            exists: true,
            is_directory: Some(true),
            class_file_count: Some(count),
            error: None,
        },
        Err(err) => {
            debug!(path = %path.display(), error = %err, "class directory walk failed");
            ClassDirProbe {
                path: path.to_path_buf(),
                exists: true,
                is_directory: Some(true),
                class_file_count: None,
                error: Some(err.to_string()),
            }
        }
    }
}

pub fn probe_class_dirs(paths: &[PathBuf]) -> Vec<ClassDirProbe> {
    paths.iter().map(|path| probe_class_dir(path)).collect()
}

pub fn count_class_files(root: &Path) -> Result<usize, walkdir::Error> {
    let mut count = 0;
    for entry in WalkDir::new(root) {
        if is_class_file(&entry?) {
            count += 1;
        }
    }
    Ok(count)
}

/// Stops at the first `.class` file. An error met before that is returned.
pub fn contains_class_file(root: &Path) -> Result<bool, walkdir::Error> {
    for entry in WalkDir::new(root) {
        if is_class_file(&entry?) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Compares raw name bytes so non-UTF-8 file names still count.
fn is_class_file(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .file_name()
            .as_encoded_bytes()
            .ends_with(CLASS_FILE_SUFFIX.as_bytes())
}
