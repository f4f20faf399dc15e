use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::engine::SecretsBackend;
use crate::request_span;

use super::handlers::{
    delete_config_handler, delete_role_handler, get_role_handler, health_handler,
    issue_credential_handler, list_roles_handler, patch_config_handler, read_config_handler,
    renew_lease_handler, revoke_lease_handler, rotate_config_handler, write_config_handler,
    write_role_handler,
};

#[derive(Clone)]
pub struct ApiState {
    pub backend: Arc<SecretsBackend>,
}

pub fn build_router(backend: Arc<SecretsBackend>) -> Router {
    let api_state = ApiState { backend };

    Router::new()
        .route(
            "/v1/config",
            post(write_config_handler)
                .patch(patch_config_handler)
                .get(read_config_handler)
                .delete(delete_config_handler),
        )
        .route("/v1/config/rotate", post(rotate_config_handler))
        .route("/v1/roles", get(list_roles_handler))
        .route(
            "/v1/roles/{name}",
            post(write_role_handler).get(get_role_handler).delete(delete_role_handler),
        )
        .route("/v1/creds/{name}", get(issue_credential_handler))
        .route("/v1/leases/renew", post(renew_lease_handler))
        .route("/v1/leases/revoke", post(revoke_lease_handler))
        .route("/health", get(health_handler))
        .with_state(api_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| request_span!(req.method(), req.uri().path())),
        )
}
