use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;

/// Well-known entry file the report tool writes at the top of the HTML tree.
pub const REPORT_ENTRY_FILE: &str = "index.html";

/// URL prefix under which the report directory is served.
pub const REPORT_URL_PREFIX: &str = "/coverage/report-html/";

/// Network endpoint of the instrumented application's TCP agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEndpoint {
    pub host: String,
    pub port: u16,
}

/// Class directory currently used for report generation.
///
/// Readers clone the inner `Arc` and never observe a half-written value;
/// writers replace it in one step.
#[derive(Debug)]
pub struct ActiveClassPath {
    current: RwLock<Arc<PathBuf>>,
}

impl ActiveClassPath {
    pub fn new(initial: PathBuf) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn current(&self) -> Arc<PathBuf> {
        Arc::clone(&self.current.read())
    }

    /// Swaps in `path` and returns the value it replaced.
    pub fn replace(&self, path: PathBuf) -> Arc<PathBuf> {
        std::mem::replace(&mut *self.current.write(), Arc::new(path))
    }
}

#[derive(Debug)]
pub struct CoverageConfig {
    pub exec_file: PathBuf,
    pub tcp_exec_file: PathBuf,
    pub report_dir: PathBuf,
    pub class_path_candidates: Vec<PathBuf>,
    pub source_root: Option<PathBuf>,
    pub java_bin: PathBuf,
    pub jacoco_cli_jar: PathBuf,
    pub agent: AgentEndpoint,
    pub report_title: String,
    pub active_class_path: ActiveClassPath,
}

impl CoverageConfig {
    pub fn report_entry(&self) -> PathBuf {
        self.report_dir.join(REPORT_ENTRY_FILE)
    }

    pub fn report_entry_url(&self) -> String {
        format!("{REPORT_URL_PREFIX}{REPORT_ENTRY_FILE}")
    }

    /// Source tree passed to the report tool, only when it is really there.
    pub fn existing_source_root(&self) -> Option<&Path> {
        self.source_root
            .as_deref()
            .filter(|root| root.is_dir())
    }
}
