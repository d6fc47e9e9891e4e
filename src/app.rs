use std::net::SocketAddr;

use axum::Router;

use crate::auth;
use crate::config::AppConfig;
use crate::layers::with_middleware;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();
    let router = Router::new()
        .nest("/api", Router::new().merge(auth::router()))
        .with_state(state);
    with_middleware(router, &config)
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on port {}", config.port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
