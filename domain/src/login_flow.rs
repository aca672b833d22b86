//! The authorization code login flow.
//!
//! [`FlowController`] turns the two browser round trips of an OIDC login into a session:
//! `begin_authorization` issues a state token and the provider URL, `handle_callback`
//! checks the state, exchanges the code, verifies the identity token and saves the session.
//! Every check is a hard stop; nothing after a failed step runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use service::config::Config;
use tokio::time::{timeout_at, Instant};

use crate::claims;
use crate::error::{
    external_error, flow_error, internal_error, Error, ExternalErrorKind, FlowErrorKind,
    InternalErrorKind,
};
use crate::gateway::oauth::generate_state;
use crate::gateway::{Provider, StateStore, Tokens, VerifiedIdToken};
use crate::session::{Profile, SessionRecord, SessionStore};

/// Tunables of the login flow.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Deadline for code exchange plus identity token verification.
    pub provider_timeout: Duration,
    /// Lifetime of a session created by a successful callback.
    pub session_ttl: Duration,
    /// Sent to the provider's end-session endpoint.
    pub post_logout_redirect_uri: String,
}

impl From<&Config> for FlowSettings {
    fn from(config: &Config) -> Self {
        Self {
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            session_ttl: Duration::from_secs(config.session_ttl_secs),
            post_logout_redirect_uri: config.post_logout_redirect_uri.clone(),
        }
    }
}

/// Result of a successful callback.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub subject: String,
    /// Value for the session cookie. Currently the subject itself.
    pub session_id: String,
    pub profile: Profile,
    /// Raw identity token, kept by the browser as the logout hint.
    pub id_token: SecretString,
}

/// Where to send the browser after logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutRedirect {
    Home,
    EndSession(String),
}

impl LogoutRedirect {
    pub fn location(&self) -> &str {
        match self {
            LogoutRedirect::Home => "/",
            LogoutRedirect::EndSession(url) => url,
        }
    }
}

pub struct FlowController {
    provider: Arc<dyn Provider>,
    state_store: Arc<dyn StateStore>,
    session_store: Arc<dyn SessionStore>,
    settings: FlowSettings,
}

impl FlowController {
    pub fn new(
        provider: Arc<dyn Provider>,
        state_store: Arc<dyn StateStore>,
        session_store: Arc<dyn SessionStore>,
        settings: FlowSettings,
    ) -> Self {
        Self {
            provider,
            state_store,
            session_store,
            settings,
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Issue a fresh state token and return the provider authorization URL carrying it.
    ///
    /// The state is stored only once the URL exists, so a failure leaves nothing behind.
    pub async fn begin_authorization(&self) -> Result<String, Error> {
        let state = generate_state().inspect_err(|e| error!("State generation failed: {e:?}"))?;
        let request = self.provider.authorization_url(&state)?;

        self.state_store
            .set_state(&request.state)
            .await
            .inspect_err(|e| error!("Failed to persist state: {e:?}"))?;

        debug!("Issued authorization request");
        Ok(request.url)
    }

    /// Complete a login from the provider's callback parameters.
    pub async fn handle_callback(
        &self,
        state: Option<&str>,
        code: Option<&str>,
    ) -> Result<LoginOutcome, Error> {
        let (Some(state), Some(code)) = (non_empty(state), non_empty(code)) else {
            warn!("Callback without state or code");
            return Err(flow_error(
                FlowErrorKind::InvalidInput,
                "state and code are required",
            ));
        };

        self.verify_state(state).await?;

        let deadline = Instant::now() + self.settings.provider_timeout;
        let tokens = self.exchange_code(code, deadline).await?;
        let id_token = tokens.id_token.clone().ok_or_else(|| {
            warn!("Token response carried no id_token");
            external_error(ExternalErrorKind::Protocol, "token response without id_token")
        })?;
        let verified = self
            .verify_id_token(id_token.expose_secret(), deadline)
            .await?;
        let identity =
            claims::extract(&verified).inspect_err(|e| warn!("Unusable identity claims: {e:?}"))?;

        let profile = identity.profile();
        let record = self.session_record(&identity.sub, tokens, profile.clone())?;
        self.session_store
            .save_session(&identity.sub, record)
            .await
            .inspect_err(|e| error!("Failed to save session: {e:?}"))?;

        info!("Login completed for subject {}", identity.sub);
        Ok(LoginOutcome {
            session_id: identity.sub.clone(),
            subject: identity.sub,
            profile,
            id_token,
        })
    }

    /// End the local session and work out where the browser goes next.
    ///
    /// Session removal failures are logged and do not block the redirect.
    pub async fn logout(
        &self,
        session_id: Option<&str>,
        id_token: Option<&str>,
    ) -> Result<LogoutRedirect, Error> {
        if let Some(subject) = non_empty(session_id) {
            if let Err(e) = self.session_store.delete_session(subject).await {
                warn!("Failed to delete session on logout: {e:?}");
            }
        }

        let Some(id_token) = non_empty(id_token) else {
            debug!("Logout without identity token");
            return Ok(LogoutRedirect::Home);
        };

        match self
            .provider
            .end_session_url(id_token, &self.settings.post_logout_redirect_uri)?
        {
            Some(url) => Ok(LogoutRedirect::EndSession(url)),
            None => {
                debug!("Provider publishes no end-session endpoint");
                Ok(LogoutRedirect::Home)
            }
        }
    }

    /// The live session for `session_id`, if any.
    pub async fn current_session(
        &self,
        session_id: Option<&str>,
    ) -> Result<Option<SessionRecord>, Error> {
        match non_empty(session_id) {
            Some(subject) => self.session_store.get_session(subject).await,
            None => Ok(None),
        }
    }

    /// Drop expired state tokens and sessions. Returns how many of each were removed.
    pub async fn purge_expired(&self) -> Result<(usize, usize), Error> {
        let states = self.state_store.purge_expired().await?;
        let sessions = self.session_store.purge_expired().await?;
        Ok((states, sessions))
    }

    async fn verify_state(&self, state: &str) -> Result<(), Error> {
        match self.state_store.take_state(state).await? {
            Some(stored) if stored == state => Ok(()),
            Some(_) => {
                warn!("State value mismatch");
                Err(flow_error(FlowErrorKind::InvalidState, "state mismatch"))
            }
            None => {
                warn!("Unknown, expired or reused state");
                Err(flow_error(FlowErrorKind::InvalidState, "unknown state"))
            }
        }
    }

    async fn exchange_code(&self, code: &str, deadline: Instant) -> Result<Tokens, Error> {
        timeout_at(deadline, self.provider.exchange_code(code))
            .await
            .map_err(|_| provider_timeout())?
            .map_err(|e| {
                warn!("Code exchange failed: {e:?}");
                e.into()
            })
    }

    async fn verify_id_token(
        &self,
        raw_id_token: &str,
        deadline: Instant,
    ) -> Result<VerifiedIdToken, Error> {
        timeout_at(deadline, self.provider.verify_id_token(raw_id_token))
            .await
            .map_err(|_| provider_timeout())?
            .map_err(|e| {
                warn!("Identity token rejected: {e:?}");
                e.into()
            })
    }

    fn session_record(
        &self,
        subject: &str,
        tokens: Tokens,
        profile: Profile,
    ) -> Result<SessionRecord, Error> {
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(self.settings.session_ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                error!("Session TTL {:?} is out of range", self.settings.session_ttl);
                internal_error(InternalErrorKind::Config, "session ttl out of range")
            })?;
        Ok(SessionRecord {
            subject: subject.to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            profile,
            created_at,
            expires_at,
        })
    }
}

fn provider_timeout() -> Error {
    warn!("Provider did not answer in time");
    external_error(ExternalErrorKind::Network, "provider timed out")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
