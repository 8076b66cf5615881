use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::init::AppState;

/// Prometheus text exposition of the node counters.
pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
}
