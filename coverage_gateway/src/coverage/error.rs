use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("no coverage execution data found (checked {})", join_paths(.checked))]
    NoSourceAvailable { checked: Vec<PathBuf> },
    #[error("no class files found in any candidate path (checked {})", join_paths(.checked))]
    ClassPathNotFound { checked: Vec<PathBuf> },
    #[error("jacoco {operation} failed: {diagnostics}")]
    ToolInvocation {
        operation: &'static str,
        diagnostics: String,
    },
    #[error("jacoco dump completed but produced no file at {0:?}")]
    NoOutputProduced(PathBuf),
    #[error("report generation failed: {0:?} was not produced")]
    ReportNotProduced(PathBuf),
    #[error("background task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type CoverageResult<T> = Result<T, CoverageError>;

impl CoverageError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn tool(operation: &'static str, diagnostics: impl Into<String>) -> Self {
        Self::ToolInvocation {
            operation,
            diagnostics: diagnostics.into(),
        }
    }

    /// True for the "expected artifact is absent" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSourceAvailable { .. } | Self::ClassPathNotFound { .. }
        )
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn coverage_error__io_constructor__then_preserves_path_and_source() {
        let err = CoverageError::io(
            "/jacoco/report",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );

        match &err {
            CoverageError::Io { path, source } => {
                assert_eq!(path, &PathBuf::from("/jacoco/report"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn coverage_error__no_source__then_lists_checked_paths() {
        let err = CoverageError::NoSourceAvailable {
            checked: vec![
                PathBuf::from("/jacoco/jacoco-tcp.exec"),
                PathBuf::from("/jacoco/jacoco.exec"),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("/jacoco/jacoco-tcp.exec, /jacoco/jacoco.exec"));
        assert!(err.is_not_found());
    }

    #[test]
    fn coverage_error__report_not_produced__then_mentions_generation_failure() {
        let err = CoverageError::ReportNotProduced(PathBuf::from("/jacoco/report/index.html"));

        assert!(err.to_string().starts_with("report generation failed"));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn coverage_error__background_task_panics__then_internal_error() {
        let join_err = tokio::spawn(async { panic!("walk exploded") })
            .await
            .expect_err("task panics");

        let err = CoverageError::from(join_err);

        assert!(err.to_string().starts_with("background task failed"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn coverage_error__tool_constructor__then_formats_operation_and_diagnostics() {
        let err = CoverageError::tool("dump", "Connection refused");

        assert_eq!(err.to_string(), "jacoco dump failed: Connection refused");
    }
}
