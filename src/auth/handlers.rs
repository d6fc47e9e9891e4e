use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        extractors::JsonBody,
        jwt::JwtKeys,
        services,
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<RegisterResponse>), Response> {
    let payload = RegisterRequest::from(&body);

    match services::register(state.users.as_ref(), payload).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok((StatusCode::CREATED, Json(RegisterResponse { user })))
        }
        Err(e) => {
            if let AuthError::Internal(source) = &e {
                error!(error = ?source, "error at user registration");
            }
            Err(e.into_response())
        }
    }
}

// Internal failures are not logged here; the trace layer still records the 500.
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<LoginResponse>, Response> {
    let payload = LoginRequest::from(&body);

    let keys = JwtKeys::from_ref(&state);
    let token = services::login(state.users.as_ref(), &keys, payload)
        .await
        .map_err(IntoResponse::into_response)?;

    info!("user logged in");
    Ok(Json(LoginResponse { token }))
}
