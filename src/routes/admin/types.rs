use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::backend::models::ProfileRecord;
use crate::session::Role;

/// Row of the admin user table
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
}

impl From<ProfileRecord> for UserSummary {
    fn from(p: ProfileRecord) -> Self {
        Self {
            id: p.id,
            role: p.role.as_deref().map_or(Role::Operator, Role::from_str),
            full_name: p.full_name,
            email: p.email,
            phone: p.phone,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// Row of the fleet device table
#[derive(Debug, Serialize, ToSchema)]
pub struct FleetDevice {
    pub mac_address: String,
    pub name: Option<String>,
    pub owner_id: Option<Uuid>,
    /// Owner's full name, when the profile is visible
    pub owner_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
