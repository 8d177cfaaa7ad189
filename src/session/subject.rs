use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Operator,
    Admin,
}

impl Role {
    /// Unknown or missing roles fall back to operator.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Self::Admin,
            _ => Self::Operator,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Admin => "admin",
        }
    }
}

/// Whose readings the live window tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "device_id", rename_all = "snake_case")]
pub enum SessionSubject {
    /// Operator with a linked sensor
    Device(String),
    /// Operator who has not linked a sensor yet
    Unlinked,
    /// Admin fleet view
    AllDevices,
}

impl SessionSubject {
    #[must_use]
    pub fn for_account(role: Role, linked_device: Option<String>) -> Self {
        match (role, linked_device) {
            (Role::Admin, _) => Self::AllDevices,
            (Role::Operator, Some(device_id)) => Self::Device(device_id),
            (Role::Operator, None) => Self::Unlinked,
        }
    }

    /// Ownership filter for realtime events.
    #[must_use]
    pub fn accepts(&self, device_id: &str) -> bool {
        match self {
            Self::AllDevices => true,
            Self::Device(own) => own == device_id,
            Self::Unlinked => false,
        }
    }

    /// Row filter for bulk fetches; `None` means every device.
    #[must_use]
    pub fn device_filter(&self) -> Option<&str> {
        match self {
            Self::Device(id) => Some(id),
            Self::Unlinked | Self::AllDevices => None,
        }
    }
}
