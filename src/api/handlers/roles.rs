//! Role handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::api::{
    dto::{ListResponse, RoleResponse, RoleWriteRequest},
    error::ApiError,
    routes::ApiState,
};

#[instrument(skip(state, payload), fields(role = %name))]
pub async fn write_role_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(payload): Json<RoleWriteRequest>,
) -> Result<StatusCode, ApiError> {
    let (ttl, max_ttl) = payload.ttls()?;
    state.backend.put_role(&name, &payload.role, ttl, max_ttl).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_role_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = state.backend.get_role(&name).await?;
    Ok(Json(role.into()))
}

#[instrument(skip(state), fields(role = %name))]
pub async fn delete_role_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.backend.delete_role(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_roles_handler(
    State(state): State<ApiState>,
) -> Result<Json<ListResponse>, ApiError> {
    let keys = state.backend.list_roles().await?;
    Ok(Json(ListResponse { keys }))
}
