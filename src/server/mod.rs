pub mod api;
pub mod auth;

use std::sync::Arc;

use log::info;
use tower_http::cors::{Any, CorsLayer};

use crate::error::AppError;
use crate::flows::Studio;
use crate::store::Store;

pub use self::auth::AuthConfig;

/// Everything a request handler needs, constructed once in `run` and
/// injected through axum state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub studio: Arc<Studio>,
    pub auth: Arc<AuthConfig>,
    pub quota_bytes: i64,
}

pub async fn serve(addr: &str, state: AppState) -> Result<(), AppError> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::routes(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting HTTP API server on: http://{}", addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
