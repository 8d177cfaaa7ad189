pub mod account;
pub mod admin;
pub mod dashboard;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        dashboard::dashboard_page,
        dashboard::get_dashboard,
        dashboard::stream_dashboard,
        dashboard::refresh,
        account::sign_in,
        account::current_session,
        account::sign_out,
        account::sign_up,
        account::link_device,
        admin::list_users,
        admin::update_role,
        admin::list_devices,
    ),
    components(
        schemas(
            crate::session::DashboardSnapshot,
            crate::pipeline::DashboardView,
            dashboard::RefreshResponse,
            account::SignInRequest,
            account::SignUpRequest,
            account::SignUpResponse,
            account::SessionResponse,
            account::LinkDeviceRequest,
            account::DeviceResponse,
            admin::UserSummary,
            admin::UpdateRoleRequest,
            admin::FleetDevice,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "dashboard", description = "Live readings view-model and stream"),
        (name = "account", description = "Sign-in, registration and device linking"),
        (name = "admin", description = "User roles and fleet devices"),
    ),
    info(
        title = "Water Monitor API",
        description = "Live water-quality dashboard backed by Supabase",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let dashboard_routes = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/dashboard/stream", get(dashboard::stream_dashboard))
        .route("/refresh", post(dashboard::refresh));

    let account_routes = Router::new()
        .route(
            "/session",
            get(account::current_session)
                .post(account::sign_in)
                .delete(account::sign_out),
        )
        .route("/signup", post(account::sign_up))
        .route("/device", post(account::link_device));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{user_id}/role", put(admin::update_role))
        .route("/devices", get(admin::list_devices));

    let api_routes = Router::new()
        .merge(dashboard_routes)
        .merge(account_routes)
        .nest("/admin", admin_routes)
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    // Health check and page routes
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/", get(dashboard::dashboard_page));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .merge(docs_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}
