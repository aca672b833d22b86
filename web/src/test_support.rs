//! Router wired to an in-process provider double.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use domain::gateway::oauth::MemoryStateStore;
use domain::gateway::{AuthorizationRequest, Provider, Tokens, VerifiedIdToken};
use domain::{FlowController, FlowSettings, MemorySessionStore};
use oidc_auth::error::{id_token_error, oauth_error, Error, IdTokenErrorKind, OAuthErrorKind};
use oidc_auth::oauth::token::TokenResponse;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{router, AppState, WebSettings};

pub(crate) const AUTHORIZATION_ENDPOINT: &str = "https://id.example.com/auth";
pub(crate) const END_SESSION_ENDPOINT: &str = "https://id.example.com/logout";
pub(crate) const POST_LOGOUT_REDIRECT_URI: &str = "http://localhost:8081";
pub(crate) const VALID_CODE: &str = "validcode";
pub(crate) const ID_TOKEN: &str = "raw.id.token";

/// Accepts [`VALID_CODE`] and [`ID_TOKEN`]; rejects everything else.
pub(crate) struct FakeProvider {
    pub end_session: bool,
    /// Stall the code exchange this long before answering.
    pub exchange_delay: Option<Duration>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            end_session: true,
            exchange_delay: None,
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn authorization_url(&self, state: &str) -> Result<AuthorizationRequest, Error> {
        Ok(AuthorizationRequest {
            url: format!("{AUTHORIZATION_ENDPOINT}?client_id=login-service&state={state}"),
            state: state.to_string(),
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        if let Some(delay) = self.exchange_delay {
            tokio::time::sleep(delay).await;
        }
        if code != VALID_CODE {
            return Err(oauth_error(OAuthErrorKind::InvalidGrant, "invalid_grant"));
        }
        Ok(TokenResponse {
            access_token: "at-1".to_string(),
            token_type: Some("Bearer".to_string()),
            refresh_token: Some("rt-1".to_string()),
            expires_in: Some(300),
            scope: None,
            id_token: Some(ID_TOKEN.to_string()),
        }
        .into())
    }

    async fn verify_id_token(&self, raw_id_token: &str) -> Result<VerifiedIdToken, Error> {
        if raw_id_token != ID_TOKEN {
            return Err(id_token_error(IdTokenErrorKind::InvalidSignature, "forged"));
        }
        let Value::Object(claims) = json!({"sub": "u1", "name": "Jane", "nric": "S1234567A"})
        else {
            unreachable!()
        };
        Ok(VerifiedIdToken { claims, kid: None })
    }

    fn end_session_url(
        &self,
        id_token_hint: &str,
        post_logout_redirect_uri: &str,
    ) -> Result<Option<String>, Error> {
        Ok(self.end_session.then(|| {
            format!(
                "{END_SESSION_ENDPOINT}?id_token_hint={id_token_hint}&post_logout_redirect_uri={post_logout_redirect_uri}"
            )
        }))
    }
}

pub(crate) struct TestApp {
    pub router: Router,
    pub states: MemoryStateStore,
    pub sessions: MemorySessionStore,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(FakeProvider::default())
    }

    pub fn with_provider(provider: FakeProvider) -> Self {
        Self::with_provider_and_timeout(provider, Duration::from_secs(30))
    }

    pub fn with_provider_and_timeout(provider: FakeProvider, request_timeout: Duration) -> Self {
        let states = MemoryStateStore::new();
        let sessions = MemorySessionStore::new();
        let flow = FlowController::new(
            Arc::new(provider),
            Arc::new(states.clone()),
            Arc::new(sessions.clone()),
            FlowSettings {
                provider_timeout: Duration::from_secs(5),
                session_ttl: Duration::from_secs(3600),
                post_logout_redirect_uri: POST_LOGOUT_REDIRECT_URI.to_string(),
            },
        );
        let settings = WebSettings {
            secure_cookies: true,
            cookie_ttl: Duration::from_secs(3600),
            success_redirect_path: "/success-login".to_string(),
            request_timeout,
        };

        Self {
            router: router::define_routes(AppState::new(Arc::new(flow), settings)),
            states,
            sessions,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub(crate) fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

pub(crate) fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

pub(crate) async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
