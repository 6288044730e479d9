use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::types::{ApiError, Reply};

pub type RouteResult = Result<Reply, ApiError>;

/// What a handler sees of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub path: String,
    /// Remainder after the registered prefix, for prefix routes.
    pub tail: Option<String>,
}

#[async_trait]
pub trait RouteHandler: Send + Sync + 'static {
    async fn call(&self, request: RouteRequest) -> RouteResult;
}

struct SyncHandler<F> {
    func: F,
}

#[async_trait]
impl<F> RouteHandler for SyncHandler<F>
where
    F: Fn(RouteRequest) -> RouteResult + Send + Sync + 'static,
{
    async fn call(&self, request: RouteRequest) -> RouteResult {
        (self.func)(request)
    }
}

#[derive(Default)]
pub struct HandlerRegistry {
    exact: RwLock<HashMap<String, Arc<dyn RouteHandler>>>,
    prefixes: RwLock<Vec<(String, Arc<dyn RouteHandler>)>>,
}

impl HandlerRegistry {
    pub fn register_handler<H>(&self, path: impl Into<String>, handler: H)
    where
        H: RouteHandler,
    {
        self.exact.write().insert(path.into(), Arc::new(handler));
    }

    pub fn register_sync<F>(&self, path: impl Into<String>, func: F)
    where
        F: Fn(RouteRequest) -> RouteResult + Send + Sync + 'static,
    {
        self.register_handler(path, SyncHandler { func });
    }

    /// Routes every path starting with `prefix` to `handler`. Longer prefixes
    /// take precedence.
    pub fn register_prefix<H>(&self, prefix: impl Into<String>, handler: H)
    where
        H: RouteHandler,
    {
        let mut prefixes = self.prefixes.write();
        prefixes.push((prefix.into(), Arc::new(handler)));
        prefixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    pub fn lookup(&self, path: &str) -> Option<(Arc<dyn RouteHandler>, RouteRequest)> {
        if let Some(handler) = self.exact.read().get(path) {
            return Some((
                Arc::clone(handler),
                RouteRequest {
                    path: path.to_string(),
                    tail: None,
                },
            ));
        }

        self.prefixes
            .read()
            .iter()
            .find_map(|(prefix, handler)| {
                path.strip_prefix(prefix.as_str()).map(|tail| {
                    (
                        Arc::clone(handler),
                        RouteRequest {
                            path: path.to_string(),
                            tail: Some(tail.to_string()),
                        },
                    )
                })
            })
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.exact.read().keys().cloned().collect();
        paths.extend(
            self.prefixes
                .read()
                .iter()
                .map(|(prefix, _)| format!("{prefix}<path>")),
        );
        paths.sort();
        paths
    }
}
