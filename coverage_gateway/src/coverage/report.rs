use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use super::{
    config::CoverageConfig,
    error::{CoverageError, CoverageResult},
    fetch::{fetch_remote, remove_previous_output},
    selector::{select_source, SelectedSource, SourceKind},
    tool::{ToolInvocation, ToolOutcome, ToolRunner},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedReport {
    pub url: String,
    pub exec_file: PathBuf,
    pub file_type: SourceKind,
}

/// Builds the HTML report from whichever execution record is available.
///
/// The previous entry file is removed before the tool runs. Success requires
/// the tool to write a new one; its exit status alone is not trusted.
pub async fn generate_report(
    config: &CoverageConfig,
    tool: &dyn ToolRunner,
) -> CoverageResult<GeneratedReport> {
    ensure_report_dir(&config.report_dir).await?;

    let source = select_source(&config.tcp_exec_file, &config.exec_file)?;
    let class_files = config.active_class_path.current();
    let invocation = report_invocation(config, &source, &class_files);
    let entry = config.report_entry();
    remove_previous_output(&entry).await?;

    match tool.run(&invocation).await {
        ToolOutcome::Completed { .. } => {}
        ToolOutcome::Failed { diagnostics, .. } | ToolOutcome::LaunchFailed { diagnostics } => {
            error!(
                exec_file = %source.path.display(),
                diagnostics = %diagnostics,
                "Report generation failed",
            );
            return Err(CoverageError::tool(invocation.operation(), diagnostics));
        }
    }

    if !entry.is_file() {
        error!(entry = %entry.display(), "jacoco report exited cleanly but wrote no entry file");
        return Err(CoverageError::ReportNotProduced(entry));
    }

    info!(
        exec_file = %source.path.display(),
        file_type = %source.kind,
        class_files = %class_files.display(),
        "Coverage report generated",
    );

    Ok(GeneratedReport {
        url: config.report_entry_url(),
        exec_file: source.path,
        file_type: source.kind,
    })
}

/// Refreshes the TCP dump from the agent, then builds the report.
pub async fn fetch_and_generate_report(
    config: &CoverageConfig,
    tool: &dyn ToolRunner,
) -> CoverageResult<GeneratedReport> {
    fetch_remote(tool, &config.agent, &config.tcp_exec_file).await?;
    generate_report(config, tool).await
}

pub async fn ensure_report_dir(path: &Path) -> CoverageResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| CoverageError::io(path, err))
}

fn report_invocation(
    config: &CoverageConfig,
    source: &SelectedSource,
    class_files: &Path,
) -> ToolInvocation {
    ToolInvocation::Report {
        exec_file: source.path.clone(),
        class_files: class_files.to_path_buf(),
        source_files: config.existing_source_root().map(Path::to_path_buf),
        html_dir: config.report_dir.clone(),
        name: format!("{} ({})", config.report_title, source.kind),
    }
}
