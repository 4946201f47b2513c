//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::state::AppState;

/// Liveness: the process is serving requests.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: the order store answers.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.orders().ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn test_health_ok() {
        let mut app = TestApp::new();
        let (status, _) = app.json("GET", "/health", None).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_readiness_reports_store_outage() {
        let mut app = TestApp::new();
        let (status, _) = app.json("GET", "/health/ready", None).await;
        assert_eq!(status, 200);

        app.store.set_unreachable();
        let (status, _) = app.json("GET", "/health/ready", None).await;
        assert_eq!(status, 503);
    }
}
