use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::backend::models::{
    AuthSession, BackendErrorBody, DeviceRecord, NewDevice, ProfileRecord,
    ProfileUpdate, RawReading, SignUpResponse,
};
use crate::backend::realtime::{RealtimeClient, Subscription};
use crate::backend::ReadingsBackend;
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Client for the hosted Supabase project: PostgREST rows, GoTrue auth, and
/// the realtime socket.
///
/// Holds the access token of the signed-in account; requests fall back to the
/// anon key when nobody is signed in.
pub struct SupabaseClient {
    http_client: Client,
    base_url: String,
    anon_key: String,
    readings_table: String,
    devices_table: String,
    profiles_table: String,
    heartbeat: Duration,
    access_token: RwLock<Option<String>>,
}

impl SupabaseClient {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            readings_table: config.readings_table.clone(),
            devices_table: config.devices_table.clone(),
            profiles_table: config.profiles_table.clone(),
            heartbeat: Duration::from_secs(config.realtime_heartbeat_seconds),
            access_token: RwLock::new(None),
        }
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorized_as(request, &self.bearer())
    }

    fn authorized_as(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    /// Fetch the newest `limit` readings, newest first, optionally for one device.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request fails or returns an error status.
    pub async fn latest_readings(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<RawReading>> {
        let limit = limit.to_string();
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit),
        ];
        if let Some(device_id) = device_id {
            query.push(("device_id", format!("eq.{device_id}")));
        }

        let request = self
            .http_client
            .get(self.rest_url(&self.readings_table))
            .query(&query);

        self.send_json(self.authorized(request), "readings").await
    }

    /// Sign in with email and password and keep the issued access token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` on rejected credentials and
    /// `AppError::Transport` if the auth service cannot be reached.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {e}")))?;

        let session: AuthSession = parse_json(check_auth_response(response).await?).await?;
        self.set_access_token(Some(session.access_token.clone()));

        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    /// Register a new account. The full name travels as user metadata so the
    /// profile trigger can pick it up. The returned token belongs to the new
    /// account and is never stored on the client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the auth service rejects the sign-up.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> AppResult<SignUpResponse> {
        let url = format!("{}/auth/v1/signup", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {e}")))?;

        if response.status().is_client_error() {
            let body: BackendErrorBody = response.json().await.unwrap_or_default();
            return Err(AppError::Validation(
                body.message().unwrap_or("Sign-up rejected").to_string(),
            ));
        }

        parse_json(check_response(response).await?).await
    }

    /// Revoke the current session. The local token is dropped even if the
    /// backend call fails.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the logout request fails.
    pub async fn sign_out(&self) -> AppResult<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let request = self.authorized(self.http_client.post(&url));
        self.set_access_token(None);

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {e}")))?;
        check_response(response).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request fails.
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<ProfileRecord>> {
        let request = self
            .http_client
            .get(self.rest_url(&self.profiles_table))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{user_id}"))]);

        let rows: Vec<ProfileRecord> = self.send_json(self.authorized(request), "profiles").await?;
        Ok(rows.into_iter().next())
    }

    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request fails.
    pub async fn list_profiles(&self) -> AppResult<Vec<ProfileRecord>> {
        let request = self
            .http_client
            .get(self.rest_url(&self.profiles_table))
            .query(&[("select", "*")]);

        self.send_json(self.authorized(request), "profiles").await
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no profile row matched and
    /// `AppError::Transport` if the request fails.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<ProfileRecord> {
        self.update_profile_as(&self.bearer(), user_id, update).await
    }

    /// Same as [`Self::update_profile`], authorized as `access_token` instead of
    /// the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no profile row matched and
    /// `AppError::Transport` if the request fails.
    pub async fn update_profile_as(
        &self,
        access_token: &str,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<ProfileRecord> {
        let request = self
            .http_client
            .patch(self.rest_url(&self.profiles_table))
            .query(&[("id", format!("eq.{user_id}"))])
            .header("Prefer", "return=representation")
            .json(update);

        let rows: Vec<ProfileRecord> = self
            .send_json(self.authorized_as(request, access_token), "profiles")
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Profile '{user_id}' not found")))
    }

    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request fails.
    pub async fn find_device_for_user(&self, user_id: Uuid) -> AppResult<Option<DeviceRecord>> {
        let request = self
            .http_client
            .get(self.rest_url(&self.devices_table))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ]);

        let rows: Vec<DeviceRecord> = self.send_json(self.authorized(request), "devices").await?;
        Ok(rows.into_iter().next())
    }

    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request fails.
    pub async fn find_device(&self, mac_address: &str) -> AppResult<Option<DeviceRecord>> {
        let request = self
            .http_client
            .get(self.rest_url(&self.devices_table))
            .query(&[
                ("select", "*".to_string()),
                ("mac_address", format!("eq.{mac_address}")),
            ]);

        let rows: Vec<DeviceRecord> = self.send_json(self.authorized(request), "devices").await?;
        Ok(rows.into_iter().next())
    }

    /// # Errors
    ///
    /// Returns `AppError::Transport` if the insert fails.
    pub async fn link_device(&self, device: &NewDevice<'_>) -> AppResult<DeviceRecord> {
        let request = self
            .http_client
            .post(self.rest_url(&self.devices_table))
            .header("Prefer", "return=representation")
            .json(device);

        let rows: Vec<DeviceRecord> = self.send_json(self.authorized(request), "devices").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Transport("Device insert returned no row".to_string()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request fails.
    pub async fn list_devices(&self) -> AppResult<Vec<DeviceRecord>> {
        let request = self
            .http_client
            .get(self.rest_url(&self.devices_table))
            .query(&[("select", "*"), ("order", "created_at.desc")]);

        self.send_json(self.authorized(request), "devices").await
    }

    /// Realtime client bound to the current credentials.
    #[must_use]
    pub fn realtime(&self) -> RealtimeClient {
        RealtimeClient::new(
            &self.base_url,
            &self.anon_key,
            self.access_token
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            self.heartbeat,
        )
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> AppResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Request failed: {e}")))?;

        let response = check_response(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                table = what,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            AppError::Transport(format!("Failed to parse response: {e}"))
        })
    }
}

#[async_trait]
impl ReadingsBackend for SupabaseClient {
    async fn fetch_latest_readings(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<RawReading>> {
        self.latest_readings(device_id, limit).await
    }

    fn subscribe_readings(&self) -> Subscription {
        self.realtime().subscribe_inserts(&self.readings_table)
    }
}

async fn check_response(response: Response) -> AppResult<Response> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::Transport("Rate limited (429)".to_string()));
    }

    if !response.status().is_success() {
        return Err(AppError::Transport(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )));
    }

    Ok(response)
}

async fn check_auth_response(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        let body: BackendErrorBody = response.json().await.unwrap_or_default();
        return Err(AppError::Unauthorized(
            body.message().unwrap_or("Invalid credentials").to_string(),
        ));
    }
    check_response(response).await
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    response
        .json()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to parse response: {e}")))
}
