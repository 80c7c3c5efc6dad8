//! Axum router assembly for the owner-facing API.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::state::AppState;
use crate::http::ws;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/world/status", get(handlers::get_world_status))
        .route("/regions", get(handlers::list_regions))
        .route("/regions/{id}", get(handlers::get_region))
        .route("/species", get(handlers::list_species))
        .route("/species/{id}", get(handlers::get_species))
        .route("/characters/{id}", get(handlers::get_character))
        .route("/characters/{id}/actions", post(handlers::submit_action))
        .route("/characters/{id}/pacts", get(handlers::list_pacts).post(handlers::propose_pact))
        .route("/families/{id}", get(handlers::get_family_tree))
        .route("/families/{id}/share-intel", post(handlers::share_intel))
        .route("/families/{id}/intel-accuracy", post(handlers::record_intel_accuracy))
        .route("/characters/{id}/missions", post(handlers::start_mission))
        .route("/pacts/{id}/break", post(handlers::break_pact))
        .route("/families/{id}/heartland/{target_id}", get(handlers::knows_heartland))
        .route("/families/{id}/intel/{region_id}", get(handlers::get_intel))
        .route("/taxonomy/{rank}/{name}", get(handlers::get_taxonomy_node))
        .route("/ws", get(ws::ws_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
