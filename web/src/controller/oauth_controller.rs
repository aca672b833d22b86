//! Controller for the OpenID Connect login and logout round trips.
//!
//! These endpoints are reached through browser redirects, so errors are plain JSON bodies
//! and successes are redirects.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::CookieJar;
use log::*;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::cookies;
use crate::{AppState, Error};

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// State token issued by `/login-provider`.
    pub state: Option<String>,
    /// Authorization code to exchange.
    pub code: Option<String>,
    /// Set by the provider instead of `code` when the login did not happen.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn found(location: &str) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())])
}

/// GET /login-provider
///
/// Starts a login by redirecting the browser to the provider's authorization endpoint.
#[utoipa::path(
    get,
    path = "/login-provider",
    responses(
        (status = 302, description = "Redirect to the provider authorization endpoint"),
        (status = 500, description = "State could not be issued"),
    )
)]
pub async fn login_provider(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let url = app_state.flow.begin_authorization().await?;
    Ok(found(&url))
}

/// GET /callback
///
/// Completes a login. Sets the session cookies and redirects to the success page.
#[utoipa::path(
    get,
    path = "/callback",
    params(CallbackParams),
    responses(
        (status = 307, description = "Login complete, cookies set, redirect to the success page"),
        (status = 500, description = "Missing parameters, or state, code exchange or identity token verification failed"),
        (status = 408, description = "The login did not complete within the request timeout"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, Error> {
    if let Some(provider_error) = params.error.as_deref() {
        warn!(
            "Provider returned error {provider_error}: {}",
            params.error_description.as_deref().unwrap_or("")
        );
    }

    let outcome = app_state
        .flow
        .handle_callback(params.state.as_deref(), params.code.as_deref())
        .await?;

    debug!("Setting login cookies for subject {}", outcome.subject);
    let jar = cookies::add_login_cookies(jar, &outcome, &app_state.settings);
    Ok((
        jar,
        Redirect::temporary(&app_state.settings.success_redirect_path),
    ))
}

/// GET /logout
///
/// Ends the local session, clears the login cookies and, when the browser still holds an
/// identity token, sends it on to the provider's end-session endpoint.
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Redirect to the provider end-session endpoint or to /"),
        (status = 500, description = "End-session URL could not be built"),
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, Error> {
    let session_id = cookies::value(&jar, cookies::SESSION_ID);
    let id_token = cookies::value(&jar, cookies::ID_TOKEN);

    let redirect = app_state
        .flow
        .logout(session_id.as_deref(), id_token.as_deref())
        .await?;

    Ok((cookies::clear_login_cookies(jar), found(redirect.location())))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use domain::gateway::StateStore;
    use domain::SessionStore;

    fn cookie<'a>(set_cookies: &'a [String], name: &str) -> &'a str {
        set_cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .unwrap_or_else(|| panic!("no {name} cookie in {set_cookies:?}"))
    }

    #[tokio::test]
    async fn test_login_provider_redirects_with_fresh_state() {
        let app = TestApp::new();

        let response = app.get("/login-provider", None).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.starts_with(AUTHORIZATION_ENDPOINT));
        let state = location.split("state=").nth(1).unwrap();
        assert_eq!(
            app.states.get_state(state).await.unwrap().as_deref(),
            Some(state)
        );
    }

    #[tokio::test]
    async fn test_callback_scenario_sets_cookies_and_session() {
        let app = TestApp::new();
        app.states.set_state("abc123").await.unwrap();

        let response = app
            .get("/callback?state=abc123&code=validcode", None)
            .await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/success-login");

        let set_cookies = set_cookies(&response);
        assert!(cookie(&set_cookies, "session_id").starts_with("session_id=u1;"));
        assert!(cookie(&set_cookies, "user_name").starts_with("user_name=Jane;"));
        assert!(cookie(&set_cookies, "user_nric").starts_with("user_nric=S1234567A;"));
        assert!(cookie(&set_cookies, "idToken").starts_with(&format!("idToken={ID_TOKEN};")));
        for set_cookie in &set_cookies {
            assert!(set_cookie.contains("HttpOnly"), "{set_cookie}");
            assert!(set_cookie.contains("Secure"), "{set_cookie}");
            assert!(set_cookie.contains("SameSite=Lax"), "{set_cookie}");
            assert!(set_cookie.contains("Path=/"), "{set_cookie}");
            assert!(set_cookie.contains("Max-Age=3600"), "{set_cookie}");
        }

        let record = app.sessions.get_session("u1").await.unwrap().unwrap();
        assert_eq!(record.profile.name, "Jane");
        assert_eq!(record.profile.national_id, "S1234567A");
    }

    #[tokio::test]
    async fn test_callback_replay_fails() {
        let app = TestApp::new();
        app.states.set_state("abc123").await.unwrap();

        let first = app
            .get("/callback?state=abc123&code=validcode", None)
            .await;
        assert_eq!(first.status(), StatusCode::TEMPORARY_REDIRECT);

        let second = app
            .get("/callback?state=abc123&code=validcode", None)
            .await;
        assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookies(&second).is_empty());
    }

    #[tokio::test]
    async fn test_callback_missing_code_is_server_error() {
        let app = TestApp::new();
        app.states.set_state("abc123").await.unwrap();

        let response = app.get("/callback?state=abc123", None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing state or code parameter");
        assert!(app.states.get_state("abc123").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_callback_unknown_state_is_server_error() {
        let app = TestApp::new();

        let response = app
            .get("/callback?state=forged&code=validcode", None)
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "Invalid or expired state"
        );
        assert!(app.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_callback_rejected_code_is_server_error() {
        let app = TestApp::new();
        app.states.set_state("abc123").await.unwrap();

        let response = app.get("/callback?state=abc123&code=usedcode", None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(app.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_callback_provider_error_leaves_state_alone() {
        let app = TestApp::new();
        app.states.set_state("abc123").await.unwrap();

        let response = app
            .get(
                "/callback?state=abc123&error=access_denied&error_description=cancelled",
                None,
            )
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "Missing state or code parameter"
        );
        assert!(app.states.get_state("abc123").await.unwrap().is_some());
        assert!(app.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_logout_without_id_token_goes_home() {
        let app = TestApp::new();

        let response = app.get("/logout", None).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_logout_with_id_token_ends_provider_session() {
        let app = TestApp::new();
        app.states.set_state("abc123").await.unwrap();
        app.get("/callback?state=abc123&code=validcode", None).await;

        let response = app
            .get(
                "/logout",
                Some(&format!("session_id=u1; idToken={ID_TOKEN}")),
            )
            .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.starts_with(END_SESSION_ENDPOINT));
        assert!(location.contains(&format!("id_token_hint={ID_TOKEN}")));
        assert!(location.contains(POST_LOGOUT_REDIRECT_URI));

        let set_cookies = set_cookies(&response);
        for name in ["session_id", "user_name", "user_nric", "idToken"] {
            assert!(cookie(&set_cookies, name).contains("Max-Age=0"));
        }
        assert!(app.sessions.get_session("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_without_end_session_endpoint_goes_home() {
        let app = TestApp::with_provider(FakeProvider {
            end_session: false,
            ..FakeProvider::default()
        });

        let response = app
            .get("/logout", Some(&format!("idToken={ID_TOKEN}")))
            .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }
}
