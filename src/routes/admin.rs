//! Admin and moderation route definitions

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(admin_list_users))
        .route(
            "/api/admin/users/:id",
            put(admin_update_user).delete(admin_delete_user),
        )
        .route("/api/admin/users/:id/status", patch(admin_set_user_status))
        .route("/api/admin/content", get(admin_list_content))
        .route("/api/admin/content/:id", patch(admin_moderate_content))
        .route("/api/admin/dashboard/stats", get(admin_dashboard_stats))
        .route("/api/content/flags", post(flag_content))
}
