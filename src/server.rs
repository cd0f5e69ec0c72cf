// mongobackup/src/server.rs
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::any;
use tokio::net::TcpListener;
use tracing::info;

pub const LIVENESS_MESSAGE: &str = "MongoDB Backup service is up...";

/// Liveness route only; it never looks at the backup pipeline.
pub fn build_router() -> Router {
    Router::new().route("/", any(liveness))
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// Binds `0.0.0.0:<port>` and serves until the process exits.
pub async fn serve(port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind HTTP listener on port {}", port))?;
    info!(port, "Server listening");
    axum::serve(listener, build_router())
        .await
        .context("HTTP server stopped unexpectedly")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_returns_fixed_message() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = build_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], LIVENESS_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_root_answers_any_method() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = build_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::builder()
            .uri("/status")
            .body(Body::empty())
            .unwrap();

        let response = build_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
