use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::rooms::create_room;
use crate::api::handlers::ws::room_channel;
use crate::api::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/:room_id/channel/:player_id", get(room_channel));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
