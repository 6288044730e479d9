//! Invocation of the JaCoCo command line tool.
//!
//! Callers describe what they want with [`ToolInvocation`] and get back a
//! [`ToolOutcome`]; exit codes and process plumbing stay in this module.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Output,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    /// `dump`: pull execution data from a running TCP agent.
    Dump {
        address: String,
        port: u16,
        destfile: PathBuf,
    },
    /// `report`: render an HTML report from one execution record.
    Report {
        exec_file: PathBuf,
        class_files: PathBuf,
        source_files: Option<PathBuf>,
        html_dir: PathBuf,
        name: String,
    },
    /// Version query of the runtime that hosts the tool.
    Version,
}

impl ToolInvocation {
    pub fn operation(&self) -> &'static str {
        match self {
            ToolInvocation::Dump { .. } => "dump",
            ToolInvocation::Report { .. } => "report",
            ToolInvocation::Version => "version",
        }
    }

    /// Arguments that follow `-jar <jacococli.jar>`.
    pub fn cli_args(&self) -> Vec<OsString> {
        match self {
            ToolInvocation::Dump {
                address,
                port,
                destfile,
            } => vec![
                "dump".into(),
                "--address".into(),
                address.into(),
                "--port".into(),
                port.to_string().into(),
                "--destfile".into(),
                destfile.into(),
            ],
            ToolInvocation::Report {
                exec_file,
                class_files,
                source_files,
                html_dir,
                name,
            } => {
                let mut args: Vec<OsString> = vec![
                    "report".into(),
                    exec_file.into(),
                    "--classfiles".into(),
                    class_files.into(),
                ];
                if let Some(source_files) = source_files {
                    args.push("--sourcefiles".into());
                    args.push(source_files.into());
                }
                args.push("--html".into());
                args.push(html_dir.into());
                args.push("--name".into());
                args.push(name.into());
                args
            }
            ToolInvocation::Version => vec!["-version".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Exited with status zero.
    Completed { stdout: String, stderr: String },
    /// Ran but exited non-zero or was killed by a signal.
    Failed {
        code: Option<i32>,
        diagnostics: String,
    },
    /// Could not be started at all.
    LaunchFailed { diagnostics: String },
}

impl ToolOutcome {
    pub fn from_output(output: Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            ToolOutcome::Completed { stdout, stderr }
        } else {
            ToolOutcome::Failed {
                code: output.status.code(),
                diagnostics: diagnostics_text(&stdout, &stderr, output.status.code()),
            }
        }
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> ToolOutcome;

    /// The jar (or other on-disk artifact) the tool needs to run.
    fn artifact(&self) -> &Path;
}

/// Runs `java -jar jacococli.jar ...` as a child process.
#[derive(Debug, Clone)]
pub struct JacocoCli {
    java: PathBuf,
    jar: PathBuf,
}

impl JacocoCli {
    pub fn new(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
        }
    }

    pub fn java(&self) -> &Path {
        &self.java
    }

    fn command(&self, invocation: &ToolInvocation) -> Command {
        let mut command = Command::new(&self.java);
        if !matches!(invocation, ToolInvocation::Version) {
            command.arg("-jar").arg(&self.jar);
        }
        command.args(invocation.cli_args());
        command.kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ToolRunner for JacocoCli {
    async fn run(&self, invocation: &ToolInvocation) -> ToolOutcome {
        debug!(
            java = %self.java.display(),
            operation = invocation.operation(),
            args = ?invocation.cli_args(),
            "Invoking jacoco cli",
        );

        match self.command(invocation).output().await {
            Ok(output) => {
                let outcome = ToolOutcome::from_output(output);
                if let ToolOutcome::Failed { code, .. } = &outcome {
                    warn!(operation = invocation.operation(), code = ?code, "jacoco cli exited with failure");
                }
                outcome
            }
            Err(err) => {
                warn!(
                    java = %self.java.display(),
                    error = %err,
                    "Failed to launch jacoco cli",
                );
                ToolOutcome::LaunchFailed {
                    diagnostics: format!("failed to launch {}: {err}", self.java.display()),
                }
            }
        }
    }

    fn artifact(&self) -> &Path {
        &self.jar
    }
}

fn diagnostics_text(stdout: &str, stderr: &str, code: Option<i32>) -> String {
    let stderr = stderr.trim();
    let stdout = stdout.trim();
    if !stderr.is_empty() {
        stderr.to_string()
    } else if !stdout.is_empty() {
        stdout.to_string()
    } else {
        match code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}
