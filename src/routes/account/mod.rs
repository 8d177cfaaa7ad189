mod handlers;
mod types;
pub mod validation;

pub use handlers::{current_session, link_device, sign_in, sign_out, sign_up};
pub use types::{
    DeviceResponse, LinkDeviceRequest, SessionResponse, SignInRequest, SignUpRequest,
    SignUpResponse,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_current_session, __path_link_device, __path_sign_in, __path_sign_out, __path_sign_up,
};
