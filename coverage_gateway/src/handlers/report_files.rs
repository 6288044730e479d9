//! Serves files from the generated report directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    coverage::config::{REPORT_ENTRY_FILE, REPORT_URL_PREFIX},
    server::{
        handler::{RouteHandler, RouteRequest, RouteResult},
        types::{ApiError, Reply},
        HttpServer,
    },
};

#[derive(Debug, Clone)]
pub struct ReportFilesHandler {
    root: PathBuf,
}

impl ReportFilesHandler {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn register(self, server: &HttpServer) {
        server
            .handler_registry()
            .register_prefix(REPORT_URL_PREFIX, self);
    }

    async fn read(&self, relative: &str) -> RouteResult {
        let Some(path) = resolve_under(&self.root, relative) else {
            return Err(ApiError::not_found(format!("{relative} not found")));
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Report file unavailable");
                return Err(ApiError::not_found(format!("{relative} not found")));
            }
        };

        Ok(Reply::File {
            content_type: mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string(),
            bytes,
        })
    }
}

#[async_trait]
impl RouteHandler for ReportFilesHandler {
    async fn call(&self, request: RouteRequest) -> RouteResult {
        let tail = request.tail.unwrap_or_default();
        let relative = if tail.is_empty() || tail.ends_with('/') {
            format!("{tail}{REPORT_ENTRY_FILE}")
        } else {
            tail
        };
        self.read(&relative).await
    }
}

/// Joins `relative` onto `root`, refusing anything that could leave `root`.
fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    resolved.is_file().then_some(resolved)
}
