mod identities;
mod members;
mod sweep;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Identity routes
        .route("/identities", post(identities::create_identity))
        .route(
            "/identities/{id}",
            get(identities::get_identity).delete(identities::revoke_identity),
        )
        // User routes
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        // Membership routes, keyed by identity subject
        .route(
            "/subjects/{subject}/orgs/{org_id}",
            put(members::set_membership).delete(members::remove_membership),
        )
        // Maintenance
        .route("/sweep", post(sweep::run_sweep))
}
