use async_trait::async_trait;

use crate::{
    coverage::CoverageService,
    server::{
        handler::{RouteHandler, RouteRequest, RouteResult},
        types::Reply,
        HttpServer,
    },
};

pub const HEALTH_PATH: &str = "/health";

#[derive(Clone)]
pub struct HealthHandler {
    service: CoverageService,
}

impl HealthHandler {
    pub fn new(service: CoverageService) -> Self {
        Self { service }
    }

    pub fn register(self, server: &HttpServer) {
        server.handler_registry().register_handler(HEALTH_PATH, self);
    }
}

#[async_trait]
impl RouteHandler for HealthHandler {
    async fn call(&self, _request: RouteRequest) -> RouteResult {
        let status = self.service.health().await;
        Reply::serialized(&status)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::coverage::test_support::{config_with_root, ScriptedTool};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn health_handler__java_unavailable__then_still_200_and_degraded() {
        let root = tempdir().expect("tempdir");
        let service = CoverageService::new(
            Arc::new(config_with_root(root.path())),
            Arc::new(ScriptedTool::default().unlaunchable()),
        );
        let handler = HealthHandler::new(service);

        let reply = handler
            .call(RouteRequest {
                path: HEALTH_PATH.into(),
                tail: None,
            })
            .await
            .expect("health never fails");

        match reply {
            Reply::Json { status, body } => {
                assert_eq!(status, hyper::StatusCode::OK);
                assert_eq!(body["status"], "degraded");
                assert_eq!(body["java_available"], false);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
