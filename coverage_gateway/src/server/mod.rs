pub mod handler;
pub mod types;

use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use hyper::{
    server::conn::{AddrIncoming, AddrStream},
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server,
};
use thiserror::Error;
use tracing::{debug, info};

use self::{handler::HandlerRegistry, types::ApiError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: hyper::Error,
    },
    #[error("http server error: {0}")]
    Serve(#[from] hyper::Error),
}

/// Path-routed HTTP server answering GET requests.
#[derive(Clone, Default)]
pub struct HttpServer {
    registry: Arc<HandlerRegistry>,
}

impl HttpServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if method != Method::GET && method != Method::HEAD {
            debug!(%method, %path, "Rejected non-GET request");
            return ApiError::method_not_allowed().into_response();
        }

        let response = match self.registry.lookup(&path) {
            Some((handler, route)) => match handler.call(route).await {
                Ok(reply) => reply.into_response(),
                Err(err) => err.into_response(),
            },
            None => ApiError::not_found("not found").into_response(),
        };

        debug!(%method, %path, status = response.status().as_u16(), "Handled request");
        response
    }

    pub fn bind(&self, addr: SocketAddr) -> Result<BoundServer, ServerError> {
        let incoming =
            AddrIncoming::bind(&addr).map_err(|source| ServerError::Bind { addr, source })?;
        Ok(BoundServer {
            server: self.clone(),
            local_addr: incoming.local_addr(),
            incoming,
        })
    }

    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        self.bind(addr)?.serve_with_shutdown(signal).await
    }
}

/// A server whose listening socket is open but not yet accepting.
pub struct BoundServer {
    server: HttpServer,
    local_addr: SocketAddr,
    incoming: AddrIncoming,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let server = self.server;
        let make_service = make_service_fn(move |_conn: &AddrStream| {
            let server = server.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.dispatch(request).await) }
                }))
            }
        });

        info!(address = %self.local_addr, "HTTP server listening");
        Server::builder(self.incoming)
            .serve(make_service)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::server::types::Reply;
    use hyper::StatusCode;
    use serde_json::{json, Value};

    fn server_with_ping() -> HttpServer {
        let server = HttpServer::new();
        server
            .handler_registry()
            .register_sync("/ping", |_request| Ok(Reply::ok(json!({"status": "pong"}))));
        server
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn dispatch__registered_route__then_handler_reply() {
        let server = server_with_ping();
        let request = Request::get("/ping").body(Body::empty()).expect("request");

        let response = server.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "pong"}));
    }

    #[tokio::test]
    async fn dispatch__unknown_route__then_json_404() {
        let server = server_with_ping();
        let request = Request::get("/nope").body(Body::empty()).expect("request");

        let response = server.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "error": "not found"})
        );
    }

    #[tokio::test]
    async fn dispatch__post_request__then_method_not_allowed() {
        let server = server_with_ping();
        let request = Request::post("/ping").body(Body::empty()).expect("request");

        let response = server.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn dispatch__handler_error__then_error_status_and_body() {
        let server = HttpServer::new();
        server
            .handler_registry()
            .register_sync("/boom", |_request| Err(ApiError::internal("boom")));
        let request = Request::get("/boom").body(Body::empty()).expect("request");

        let response = server.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "error": "boom"})
        );
    }

    #[tokio::test]
    async fn bind__port_in_use__then_bind_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");

        let result = HttpServer::new().bind(addr);

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn serve_with_shutdown__client_request__then_served_and_stops() {
        let server = server_with_ping();
        let bound = server
            .bind("127.0.0.1:0".parse().expect("addr"))
            .expect("bind");
        let addr = bound.local_addr();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(bound.serve_with_shutdown(async {
            let _ = shutdown_rx.await;
        }));

        let client = hyper::Client::new();
        let uri: hyper::Uri = format!("http://{addr}/ping").parse().expect("uri");
        let response = client.get(uri).await.expect("request");
        assert_eq!(response.status(), StatusCode::OK);

        shutdown_tx.send(()).expect("signal shutdown");
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("server stopped")
            .expect("join")
            .expect("serve ok");
    }
}
