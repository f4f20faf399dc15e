//! Root configuration and rotation handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::instrument;

use crate::api::{
    dto::{ConfigPatchRequest, ConfigWriteRequest, RotateResponse},
    error::ApiError,
    routes::ApiState,
};
use crate::engine::RootConfigView;

#[instrument(skip(state, payload), fields(organization = %payload.organization, project = %payload.project))]
pub async fn write_config_handler(
    State(state): State<ApiState>,
    Json(payload): Json<ConfigWriteRequest>,
) -> Result<StatusCode, ApiError> {
    state.backend.configure_root(payload.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn patch_config_handler(
    State(state): State<ApiState>,
    Json(payload): Json<ConfigPatchRequest>,
) -> Result<Json<RootConfigView>, ApiError> {
    Ok(Json(state.backend.patch_root(payload).await?))
}

pub async fn read_config_handler(
    State(state): State<ApiState>,
) -> Result<Json<RootConfigView>, ApiError> {
    Ok(Json(state.backend.read_root().await?))
}

#[instrument(skip(state))]
pub async fn delete_config_handler(State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
    state.backend.delete_root().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn rotate_config_handler(
    State(state): State<ApiState>,
) -> Result<Json<RotateResponse>, ApiError> {
    let report = state.backend.rotate_root().await?;
    Ok(Json(report.into()))
}
