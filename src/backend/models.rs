use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A row from the readings table as delivered by PostgREST or the realtime feed.
///
/// Every field is optional and untyped: sensors have been seen posting numbers
/// as strings, and older rows may be missing columns entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "deviceId", alias = "mac_address")]
    pub device_id: Option<Value>,
    #[serde(default)]
    pub ph: Option<Value>,
    #[serde(default)]
    pub tds: Option<Value>,
    /// Turbidity, stored under its Spanish column name
    #[serde(default, alias = "turbidity")]
    pub turbidez: Option<Value>,
    #[serde(default, alias = "is_potable")]
    pub es_potable: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
}

/// Row from the devices table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub id: Option<Value>,
    pub mac_address: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for inserting a device row
#[derive(Debug, Clone, Serialize)]
pub struct NewDevice<'a> {
    pub mac_address: &'a str,
    pub user_id: Uuid,
    pub name: &'a str,
}

/// Row from the profiles table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Partial profile update; `None` fields are omitted from the PATCH body
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Response from `/auth/v1/token?grant_type=password`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response from `/auth/v1/signup`.
///
/// With email confirmation enabled the user object comes back at the top level
/// and no session is issued; otherwise it is nested next to the tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    /// The new account's own token, absent until the email is confirmed
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SignUpResponse {
    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.user.clone().or_else(|| {
            self.id.map(|id| AuthUser {
                id,
                email: self.email.clone(),
            })
        })
    }
}

/// Error body returned by GoTrue / PostgREST
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl BackendErrorBody {
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
    }
}
