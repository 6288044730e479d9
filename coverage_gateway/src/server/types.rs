use hyper::{header, Body, Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

/// Successful outcome of a route.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json { status: StatusCode, body: Value },
    File { content_type: String, bytes: Vec<u8> },
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Reply::Json {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn serialized<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Reply::ok)
            .map_err(|err| ApiError::internal(format!("failed to serialize response: {err}")))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Json { status, .. } => *status,
            Reply::File { .. } => StatusCode::OK,
        }
    }

    pub fn into_response(self) -> Response<Body> {
        match self {
            Reply::Json { status, body } => json_response(status, &body),
            Reply::File {
                content_type,
                bytes,
            } => {
                let mut response = Response::new(Body::from(bytes));
                if let Ok(value) = header::HeaderValue::from_str(&content_type) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
                response
            }
        }
    }
}

/// Failed outcome of a route: an HTTP status plus a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `{"status": "error", "error": message}` with the given status code.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(
            status,
            json!({
                "status": "error",
                "error": message.into(),
            }),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::message(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::message(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    pub fn into_response(self) -> Response<Body> {
        json_response(self.status, &self.body)
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response<Body> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
