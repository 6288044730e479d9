//! Environment readiness snapshot for the `/health` route.
//!
//! Every check degrades to `false` instead of failing, so the snapshot can
//! always be produced.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{
    config::CoverageConfig,
    tool::{ToolInvocation, ToolOutcome, ToolRunner},
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    pub java_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_version: Option<String>,
    pub jacoco_cli: String,
    pub jacoco_cli_exists: bool,
    pub report_dir: String,
    pub report_dir_writable: bool,
}

impl HealthStatus {
    pub fn issues_count(&self) -> usize {
        [
            self.java_available,
            self.jacoco_cli_exists,
            self.report_dir_writable,
        ]
        .iter()
        .filter(|ok| !**ok)
        .count()
    }
}

pub async fn check_health(config: &CoverageConfig, tool: &dyn ToolRunner) -> HealthStatus {
    let (java_available, java_version) = match tool.run(&ToolInvocation::Version).await {
        ToolOutcome::Completed { stdout, stderr } => (true, first_line(&stderr, &stdout)),
        ToolOutcome::Failed { .. } | ToolOutcome::LaunchFailed { .. } => (false, None),
    };

    let jacoco_cli = tool.artifact();
    let report_root = writability_target(&config.report_dir);

    let mut status = HealthStatus {
        status: String::new(),
        java_available,
        java_path: which::which(&config.java_bin)
            .ok()
            .map(|path| path.display().to_string()),
        java_version,
        jacoco_cli: jacoco_cli.display().to_string(),
        jacoco_cli_exists: jacoco_cli.is_file(),
        report_dir: config.report_dir.display().to_string(),
        report_dir_writable: is_writable_dir(&report_root),
    };
    status.status = if status.issues_count() == 0 {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };
    status
}

/// The report directory may not exist yet; what matters is whether it can be
/// created, so the parent is checked.
fn writability_target(report_dir: &Path) -> PathBuf {
    report_dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn is_writable_dir(dir: &Path) -> bool {
    dir.is_dir() && tempfile::NamedTempFile::new_in(dir).is_ok()
}

fn first_line(primary: &str, fallback: &str) -> Option<String> {
    [primary, fallback]
        .iter()
        .filter_map(|text| text.lines().map(str::trim).find(|line| !line.is_empty()))
        .next()
        .map(str::to_string)
}
