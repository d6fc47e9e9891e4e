use serde::Serialize;

use crate::auth::{extractors::JsonBody, repo_types::User};

/// Request body for user registration.
///
/// Fields are optional so a missing or non-string one reaches the controller
/// instead of being rejected by the JSON parser.
#[derive(Debug, Default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<&JsonBody> for RegisterRequest {
    fn from(body: &JsonBody) -> Self {
        Self {
            email: body.string("email"),
            password: body.string("password"),
        }
    }
}

/// Request body for login.
#[derive(Debug, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl From<&JsonBody> for LoginRequest {
    fn from(body: &JsonBody) -> Self {
        Self {
            email: body.string("email"),
            password: body.string("password"),
        }
    }
}

/// Response returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}
