use serde_json::{json, Map, Value};

use crate::{
    coverage::config::REPORT_URL_PREFIX,
    handlers::{coverage::CoverageRoute, health::HEALTH_PATH},
    server::{types::Reply, HttpServer},
};

pub const INDEX_PATH: &str = "/";

/// Static description of every route the gateway serves.
pub fn route_listing() -> Value {
    let mut endpoints = Map::new();
    for route in CoverageRoute::ALL {
        endpoints.insert(route.path().to_string(), json!(route.description()));
    }
    endpoints.insert(
        format!("{REPORT_URL_PREFIX}<path>"),
        json!("Browse the generated HTML report"),
    );
    endpoints.insert(
        HEALTH_PATH.to_string(),
        json!("Check java, jacococli.jar and report directory readiness"),
    );

    json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    })
}

pub fn register(server: &HttpServer) {
    server
        .handler_registry()
        .register_sync(INDEX_PATH, |_request| Ok(Reply::ok(route_listing())));
}
