use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();

    if status.is_server_error() {
        warn!(method = %method, path = %path, status = status.as_u16(), duration_ms, "request failed");
    } else {
        info!(method = %method, path = %path, status = status.as_u16(), duration_ms, "request completed");
    }

    response
}
