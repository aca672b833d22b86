use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::controller::ApiResponse;
use crate::cookies;
use crate::{AppState, Error};

/// Profile of the logged-in user.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub subject: String,
    pub name: String,
    pub national_id: String,
}

/// GET the profile of the current login session
#[utoipa::path(
    get,
    path = "/success-login",
    responses(
        (status = 200, description = "Profile of the current session", body = SessionView),
        (status = 401, description = "No live session for the session_id cookie"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn success_login(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, Error> {
    let session_id = cookies::value(&jar, cookies::SESSION_ID);

    match app_state.flow.current_session(session_id.as_deref()).await? {
        Some(record) => {
            let view = SessionView {
                subject: record.subject,
                name: record.profile.name,
                national_id: record.profile.national_id,
            };
            Ok(Json(ApiResponse::new(StatusCode::OK.into(), view)).into_response())
        }
        None => Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not logged in" })),
        )
            .into_response()),
    }
}
