mod handlers;
mod types;

pub use handlers::{list_devices, list_users, update_role};
pub use types::{FleetDevice, UpdateRoleRequest, UserSummary};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_list_devices, __path_list_users, __path_update_role};
