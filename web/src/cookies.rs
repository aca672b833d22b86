//! Login cookies set by the callback and cleared on logout.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use domain::LoginOutcome;
use secrecy::ExposeSecret;
use time::Duration;

use crate::WebSettings;

pub(crate) const SESSION_ID: &str = "session_id";
pub(crate) const USER_NAME: &str = "user_name";
pub(crate) const USER_NRIC: &str = "user_nric";
pub(crate) const ID_TOKEN: &str = "idToken";

const LOGIN_COOKIES: [&str; 4] = [SESSION_ID, USER_NAME, USER_NRIC, ID_TOKEN];

fn login_cookie(name: &'static str, value: String, settings: &WebSettings) -> Cookie<'static> {
    let max_age = Duration::try_from(settings.cookie_ttl).unwrap_or(Duration::MAX);
    Cookie::build((name, value))
        .http_only(true)
        .secure(settings.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Add the cookies of a completed login to `jar`.
pub(crate) fn add_login_cookies(
    jar: CookieJar,
    outcome: &LoginOutcome,
    settings: &WebSettings,
) -> CookieJar {
    jar.add(login_cookie(SESSION_ID, outcome.session_id.clone(), settings))
        .add(login_cookie(USER_NAME, outcome.profile.name.clone(), settings))
        .add(login_cookie(
            USER_NRIC,
            outcome.profile.national_id.clone(),
            settings,
        ))
        .add(login_cookie(
            ID_TOKEN,
            outcome.id_token.expose_secret().clone(),
            settings,
        ))
}

/// Expire every login cookie, whether or not the browser sent it.
pub(crate) fn clear_login_cookies(jar: CookieJar) -> CookieJar {
    LOGIN_COOKIES.iter().fold(jar, |jar, name| {
        jar.add(
            Cookie::build((*name, ""))
                .path("/")
                .max_age(Duration::ZERO)
                .build(),
        )
    })
}

pub(crate) fn value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
