use crate::{
    metrics,
    snapshot::SnapshotStore,
};
use axum::{
    extract::State,
    http::{
        header,
        StatusCode,
    },
    response::{
        Html,
        IntoResponse,
        Response,
    },
    routing::get,
    Router,
};
use chrono::Utc;

#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Encoding the metrics failed: {0}")]
    Encoding(#[from] prometheus::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("{self}");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub fn create_router(store: SnapshotStore) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(
        "<html><head><title>Crafty Exporter</title></head><body><h1>Crafty Exporter</h1>\
         <p><a href=\"/metrics\">Metrics</a></p></body></html>",
    )
}

async fn healthz() -> &'static str {
    "ok"
}

/// Serves whatever snapshot is stored right now; never waits for or triggers a refresh.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let snapshot = state.store.latest();
    let body = metrics::render(snapshot.as_deref(), Utc::now())?;
    Ok(([(header::CONTENT_TYPE, metrics::TEXT_FORMAT)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use axum::body::to_bytes;

    async fn scrape(store: &SnapshotStore) -> (StatusCode, String) {
        let response = metrics_handler(State(AppState { store: store.clone() }))
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn scrape_before_first_refresh_is_empty() {
        let store = SnapshotStore::new();
        let (status, body) = scrape(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn scrape_reads_the_published_snapshot() {
        let store = SnapshotStore::new();
        store.publish(Snapshot::new(Utc::now()));

        let (status, body) = scrape(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("last_refresh_timestamp_seconds"));
    }
}
