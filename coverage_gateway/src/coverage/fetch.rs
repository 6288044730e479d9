use std::{
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info};

use super::{
    config::AgentEndpoint,
    error::{CoverageError, CoverageResult},
    probe::probe_record,
    tool::{ToolInvocation, ToolOutcome, ToolRunner},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedDump {
    pub file: PathBuf,
    pub size: u64,
}

/// Pulls execution data from the agent into `destination`.
///
/// Any previous dump at `destination` is removed first, so a tool that exits
/// cleanly without writing a new one fails with `NoOutputProduced`.
pub async fn fetch_remote(
    tool: &dyn ToolRunner,
    agent: &AgentEndpoint,
    destination: &Path,
) -> CoverageResult<FetchedDump> {
    let invocation = ToolInvocation::Dump {
        address: agent.host.clone(),
        port: agent.port,
        destfile: destination.to_path_buf(),
    };

    remove_previous_output(destination).await?;

    match tool.run(&invocation).await {
        ToolOutcome::Completed { .. } => {}
        ToolOutcome::Failed { diagnostics, .. } | ToolOutcome::LaunchFailed { diagnostics } => {
            return Err(CoverageError::tool(invocation.operation(), diagnostics));
        }
    }

    let probe = probe_record(destination);
    match probe.size {
        Some(size) if probe.exists => {
            info!(
                agent = %format!("{}:{}", agent.host, agent.port),
                file = %destination.display(),
                size,
                "Fetched coverage dump from agent",
            );
            Ok(FetchedDump {
                file: destination.to_path_buf(),
                size,
            })
        }
        _ => Err(CoverageError::NoOutputProduced(destination.to_path_buf())),
    }
}

/// Deletes a leftover artifact so post-run checks only see fresh output.
pub(crate) async fn remove_previous_output(path: &Path) -> CoverageResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed previous output");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(CoverageError::io(path, err)),
    }
}
