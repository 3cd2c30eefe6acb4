pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

use crate::application::GameService;
use crate::config::AppConfig;
use crate::infrastructure::oracle::PatternOracle;
use crate::infrastructure::persistence::InMemoryRoomStore;
use crate::infrastructure::transport::ChannelTransport;
use std::sync::Arc;
use tracing::info;

pub async fn start_server() {
    let config = AppConfig::load();
    let rooms = Arc::new(InMemoryRoomStore::new());
    let transport = Arc::new(ChannelTransport::new());
    let oracle = Arc::new(PatternOracle::new());
    let service = GameService::new(
        config.clone(),
        rooms.clone(),
        oracle,
        transport.clone(),
    );

    let app_state = state::AppState {
        service,
        transport,
        rooms,
    };
    let app = routes::app_router(app_state);

    let addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
