use crate::errors::Result;
use crate::metrics;
use crate::session::DashboardState;
use crate::view::{self, DashboardView};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone)]
struct AppState {
    state: watch::Receiver<DashboardState>,
}

pub fn create_router(state: watch::Receiver<DashboardState>) -> Router {
    let state = AppState { state };

    Router::new()
        .route("/", get(get_page))
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_page(State(app): State<AppState>) -> String {
    view::render(&app.state.borrow())
}

async fn get_dashboard(State(app): State<AppState>) -> Json<DashboardView> {
    let view = DashboardView::from(&*app.state.borrow());
    Json(view)
}

async fn metrics_handler() -> std::result::Result<String, AppError> {
    metrics::gather_metrics().map_err(AppError)
}

struct AppError(crate::errors::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {}", self.0),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ConnectionStatus;

    #[test]
    fn test_handlers_read_latest_state() {
        tokio_test::block_on(async {
            let (tx, rx) = watch::channel(DashboardState::default());
            let app = AppState { state: rx };

            let page = get_page(State(app.clone())).await;
            assert!(page.contains("Status: Initializing..."));

            tx.send_modify(|s| s.status = ConnectionStatus::WaitingForDevice);

            let Json(view) = get_dashboard(State(app)).await;
            assert_eq!(
                view.status,
                "Waiting for ESP32 to publish data to Firestore..."
            );
            assert!(!view.data_available);
        });
    }
}
