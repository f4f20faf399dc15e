//! Credential issuance and lease handlers.
//!
//! The issuance response is the only place a client secret ever leaves the
//! engine; it is not stored and cannot be read back.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::api::{
    dto::{CredentialResponse, LeaseRequest, LeaseResponse},
    error::ApiError,
    routes::ApiState,
};

#[instrument(skip(state), fields(role = %name))]
pub async fn issue_credential_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<CredentialResponse>, ApiError> {
    let issued = state.backend.issue_credential(&name).await?;
    Ok(Json(issued.into()))
}

#[instrument(skip(state, payload), fields(lease_id = %payload.lease.lease_id))]
pub async fn renew_lease_handler(
    State(state): State<ApiState>,
    Json(payload): Json<LeaseRequest>,
) -> Result<Json<LeaseResponse>, ApiError> {
    let lease = state.backend.renew_lease(&payload.lease).await?;
    Ok(Json(LeaseResponse { lease }))
}

#[instrument(skip(state, payload), fields(lease_id = %payload.lease.lease_id))]
pub async fn revoke_lease_handler(
    State(state): State<ApiState>,
    Json(payload): Json<LeaseRequest>,
) -> Result<StatusCode, ApiError> {
    state.backend.revoke_lease(&payload.lease).await?;
    Ok(StatusCode::NO_CONTENT)
}
