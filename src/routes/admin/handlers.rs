use axum::{
    extract::{Path, State},
    Json,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::backend::models::ProfileUpdate;
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::account::validation;

use super::types::{FleetDevice, UpdateRoleRequest, UserSummary};

/// List all user profiles
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All user profiles", body = Vec<UserSummary>),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Admin privileges required"),
    ),
    tag = "admin"
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserSummary>>> {
    state.require_admin().await?;

    let profiles = state.backend.list_profiles().await?;
    let mut users: Vec<UserSummary> = profiles.into_iter().map(UserSummary::from).collect();
    users.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    Ok(Json(users))
}

/// Change a user's role
#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    params(
        ("user_id" = Uuid, Path, description = "Profile id"),
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserSummary),
        (status = 400, description = "Unknown role or own role change"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "Profile not found"),
    ),
    tag = "admin"
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> AppResult<Json<UserSummary>> {
    let admin = state.require_admin().await?;
    let role = validation::role(&request.role)?;

    if user_id == admin.user_id && role != admin.role {
        return Err(AppError::Validation(
            "Admins cannot change their own role".to_string(),
        ));
    }

    let update = ProfileUpdate {
        role: Some(role.as_str().to_string()),
        ..ProfileUpdate::default()
    };
    let profile = state.backend.update_profile(user_id, &update).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %user_id,
        role = role.as_str(),
        "Role updated"
    );

    Ok(Json(profile.into()))
}

/// Fleet-wide device table with owner names
#[utoipa::path(
    get,
    path = "/api/admin/devices",
    responses(
        (status = 200, description = "Fleet device table", body = Vec<FleetDevice>),
        (status = 403, description = "Admin privileges required"),
    ),
    tag = "admin"
)]
pub async fn list_devices(State(state): State<AppState>) -> AppResult<Json<Vec<FleetDevice>>> {
    state.require_admin().await?;

    let (devices, profiles) = tokio::try_join!(
        state.backend.list_devices(),
        state.backend.list_profiles()
    )?;

    let owners: HashMap<Uuid, Option<String>> = profiles
        .into_iter()
        .map(|p| (p.id, p.full_name))
        .collect();

    let response = devices
        .into_iter()
        .map(|d| FleetDevice {
            owner_name: d.user_id.and_then(|id| owners.get(&id).cloned().flatten()),
            owner_id: d.user_id,
            mac_address: d.mac_address,
            name: d.name,
            created_at: d.created_at,
        })
        .collect();

    Ok(Json(response))
}
