use axum::{extract::State, http::StatusCode, Json};

use crate::backend::models::{NewDevice, ProfileUpdate};
use crate::common::{Account, AppState};
use crate::error::{AppError, AppResult};
use crate::session::{Role, SessionSubject};

use super::types::{
    DeviceResponse, LinkDeviceRequest, SessionResponse, SignInRequest, SignUpRequest,
    SignUpResponse,
};
use super::validation;

/// Sign in and start the live session for the account
#[utoipa::path(
    post,
    path = "/api/session",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in, live session started", body = SessionResponse),
        (status = 400, description = "Malformed credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Admin login refused"),
        (status = 502, description = "Backend unavailable"),
    ),
    tag = "account"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> AppResult<Json<SessionResponse>> {
    let email = validation::email(&request.email)?;
    let password = validation::required("password", &request.password)?;

    let auth = state.backend.sign_in(email, password).await?;
    let profile = state.backend.get_profile(auth.user.id).await?;

    let role = profile
        .as_ref()
        .and_then(|p| p.role.as_deref())
        .map_or(Role::Operator, Role::from_str);

    let requested_admin = request.role.as_deref().map(Role::from_str) == Some(Role::Admin);
    if requested_admin && role != Role::Admin {
        tracing::warn!(user_id = %auth.user.id, "Admin login refused for non-admin account");
        if let Err(e) = state.backend.sign_out().await {
            tracing::warn!(error = %e, "Failed to revoke refused session");
        }
        return Err(AppError::Forbidden(
            "Account does not have admin privileges".to_string(),
        ));
    }

    let device_id = match role {
        Role::Operator => state
            .backend
            .find_device_for_user(auth.user.id)
            .await?
            .map(|d| d.mac_address),
        Role::Admin => None,
    };

    let account_email = auth.user.email.clone().unwrap_or_else(|| email.to_string());
    let name = profile
        .and_then(|p| p.full_name)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| {
            account_email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

    let account = Account {
        user_id: auth.user.id,
        email: account_email,
        name,
        role,
        device_id: device_id.clone(),
    };

    tracing::info!(
        user_id = %account.user_id,
        role = account.role.as_str(),
        device_id = ?account.device_id,
        "Starting session"
    );

    *state.account.write().await = Some(account.clone());
    state
        .session
        .start(SessionSubject::for_account(role, device_id))
        .await;

    Ok(Json(session_response(&state, account).await))
}

/// Current account and dashboard state
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Signed-in account and dashboard", body = SessionResponse),
        (status = 401, description = "Not signed in"),
    ),
    tag = "account"
)]
pub async fn current_session(State(state): State<AppState>) -> AppResult<Json<SessionResponse>> {
    let account = state.current_account().await?;
    Ok(Json(session_response(&state, account).await))
}

/// Sign out. The local session is torn down even if the backend call fails;
/// signing out with nobody signed in is a no-op.
#[utoipa::path(
    delete,
    path = "/api/session",
    responses(
        (status = 204, description = "Signed out"),
    ),
    tag = "account"
)]
pub async fn sign_out(State(state): State<AppState>) -> StatusCode {
    state.session.end().await;
    let previous = state.account.write().await.take();

    if let Some(account) = previous {
        tracing::info!(user_id = %account.user_id, "Signed out");
        if let Err(e) = state.backend.sign_out().await {
            tracing::warn!(error = %e, "Backend sign-out failed");
        }
    }

    StatusCode::NO_CONTENT
}

/// Register a new operator account
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account registered", body = SignUpResponse),
        (status = 400, description = "Missing or rejected fields"),
        (status = 502, description = "Backend unavailable"),
    ),
    tag = "account"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SignUpResponse>)> {
    let email = validation::email(&request.email)?;
    let password = validation::required("password", &request.password)?;
    let full_name = validation::required("full_name", &request.full_name)?;
    let phone = validation::required("phone", &request.phone)?;
    let address = validation::required("address", &request.address)?;

    let created = state.backend.sign_up(email, password, full_name).await?;
    let user = created.user();

    match (&user, created.access_token.as_deref()) {
        (Some(user), Some(access_token)) => {
            let update = ProfileUpdate {
                full_name: Some(full_name.to_string()),
                phone: Some(phone.to_string()),
                address: Some(address.to_string()),
                ..ProfileUpdate::default()
            };
            // The account exists either way; contact details can be filled in later.
            if let Err(e) = state
                .backend
                .update_profile_as(access_token, user.id, &update)
                .await
            {
                tracing::warn!(error = %e, user_id = %user.id, "Failed to store profile details");
            }
        }
        (Some(user), None) => {
            tracing::info!(user_id = %user.id, "No session until email is confirmed, profile details not stored");
        }
        (None, _) => {}
    }

    tracing::info!(email, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: user.map(|u| u.id),
            email: email.to_string(),
        }),
    ))
}

/// Link a sensor to the signed-in account and re-point the live session at it
#[utoipa::path(
    post,
    path = "/api/device",
    request_body = LinkDeviceRequest,
    responses(
        (status = 200, description = "Device was already linked to this account", body = DeviceResponse),
        (status = 201, description = "Device linked", body = DeviceResponse),
        (status = 400, description = "Invalid id or device owned by another account"),
        (status = 401, description = "Not signed in"),
    ),
    tag = "account"
)]
pub async fn link_device(
    State(state): State<AppState>,
    Json(request): Json<LinkDeviceRequest>,
) -> AppResult<(StatusCode, Json<DeviceResponse>)> {
    let account = state.current_account().await?;
    let mac_address = validation::mac_address(&request.mac_address)?;
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| format!("Sensor {mac_address}"), ToString::to_string);

    let (status, device) = match state.backend.find_device(&mac_address).await? {
        Some(existing) if existing.user_id == Some(account.user_id) => (StatusCode::OK, existing),
        Some(_) => {
            return Err(AppError::Validation(format!(
                "Device {mac_address} is already linked to another account"
            )));
        }
        None => {
            let created = state
                .backend
                .link_device(&NewDevice {
                    mac_address: &mac_address,
                    user_id: account.user_id,
                    name: &name,
                })
                .await?;
            (StatusCode::CREATED, created)
        }
    };

    tracing::info!(user_id = %account.user_id, mac_address = %mac_address, "Device linked");

    if let Some(current) = state.account.write().await.as_mut() {
        current.device_id = Some(mac_address.clone());
    }

    if account.role == Role::Operator {
        state
            .session
            .change_subject(SessionSubject::Device(mac_address))
            .await;
    }

    Ok((status, Json(device.into())))
}

async fn session_response(state: &AppState, account: Account) -> SessionResponse {
    SessionResponse {
        account,
        subject: state.session.subject().await,
        dashboard: state.session.snapshot(),
    }
}
