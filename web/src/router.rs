use crate::{controller::health_check_controller, AppState};
use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::controller::{oauth_controller, session_controller};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "OIDC Login Service"
        ),
        paths(
            health_check_controller::health_check,
            oauth_controller::login_provider,
            oauth_controller::callback,
            oauth_controller::logout,
            session_controller::success_login,
        ),
        components(
            schemas(
                session_controller::SessionView,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "oidc_login", description = "OpenID Connect authorization code login")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Documents the session_id cookie set by a successful callback.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "session_id",
                    "Session id set by the /callback redirect",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let request_timeout = app_state.settings.request_timeout;
    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(session_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/login-provider", get(oauth_controller::login_provider))
        .route("/callback", get(oauth_controller::callback))
        .route("/logout", get(oauth_controller::logout))
        .with_state(app_state)
}

fn session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/success-login", get(session_controller::success_login))
        .with_state(app_state)
}
