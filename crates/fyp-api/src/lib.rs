pub mod error;
pub mod groups;
pub mod middleware;
pub mod requests;
pub mod state;
pub mod sync;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};

pub use state::{AppState, AppStateInner};

/// All routes with their auth layers applied. CORS and tracing layers are
/// added by the server binary.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/requests", post(requests::send_request).get(requests::list_requests))
        .route("/requests/{request_id}", get(requests::get_request))
        .route("/requests/{kind}/{request_id}/accept", post(requests::accept_request))
        .route("/requests/{kind}/{request_id}/reject", post(requests::reject_request))
        .route("/groups", get(groups::list_groups))
        .route("/groups/me", get(groups::my_group).patch(groups::update_group))
        .route("/groups/me/lock", post(groups::lock_group))
        .route("/groups/me/members/{student_id}", delete(groups::remove_member))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/sync/students/{student_id}", put(sync::upsert_student))
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
