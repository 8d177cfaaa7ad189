use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::backend::models::DeviceRecord;
use crate::common::Account;
use crate::session::{DashboardSnapshot, SessionSubject};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Role the user asked to sign in as; an admin login is refused for operators
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignUpResponse {
    pub user_id: Option<Uuid>,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkDeviceRequest {
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub account: Account,
    pub subject: Option<SessionSubject>,
    pub dashboard: DashboardSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceResponse {
    pub mac_address: String,
    pub name: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<DeviceRecord> for DeviceResponse {
    fn from(d: DeviceRecord) -> Self {
        Self {
            mac_address: d.mac_address,
            name: d.name,
            user_id: d.user_id,
            created_at: d.created_at,
        }
    }
}
