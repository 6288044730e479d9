use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use super::error::{CoverageError, CoverageResult};

/// Where a raw execution record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "File")]
    File,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Tcp => "TCP",
            SourceKind::File => "File",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Picks the record to build a report from.
///
/// The TCP dump always wins when it exists, regardless of age or size. The
/// file-mode record is only a fallback.
pub fn select_source(tcp_exec: &Path, file_exec: &Path) -> CoverageResult<SelectedSource> {
    let priority = [(SourceKind::Tcp, tcp_exec), (SourceKind::File, file_exec)];

    priority
        .iter()
        .find(|(_, path)| path.is_file())
        .map(|(kind, path)| SelectedSource {
            path: path.to_path_buf(),
            kind: *kind,
        })
        .ok_or_else(|| CoverageError::NoSourceAvailable {
            checked: priority.iter().map(|(_, path)| path.to_path_buf()).collect(),
        })
}
