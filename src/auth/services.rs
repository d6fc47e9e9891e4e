use anyhow::anyhow;
use tracing::{debug, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password_async, verify_password_async},
        repo::UserRepository,
        repo_types::User,
    },
    error::AuthError,
};

/// Create an account for an unused email.
///
/// The existence check and the insert are not atomic. A concurrent duplicate
/// is caught by the store's uniqueness guarantee and comes back as
/// [`AuthError::Internal`].
pub async fn register(users: &dyn UserRepository, req: RegisterRequest) -> Result<User, AuthError> {
    let email = req.email.ok_or_else(|| anyhow!("email is required"))?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::UserExists);
    }

    let password = req.password.ok_or_else(|| anyhow!("password is required"))?;
    let hash = hash_password_async(password).await?;
    let user = users.create(&email, &hash).await?;

    debug!(user_id = %user.id, "user created");
    Ok(user)
}

/// Check credentials and issue a one-hour token.
pub async fn login(
    users: &dyn UserRepository,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<String, AuthError> {
    let email = req.email.ok_or_else(|| anyhow!("email is required"))?;

    let Some(user) = users.find_by_email(&email).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    let password = req.password.ok_or_else(|| anyhow!("password is required"))?;
    if !verify_password_async(password, user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(keys.sign(user.id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::InMemoryUserRepository,
        config::{JwtConfig, TOKEN_TTL},
    };

    fn keys() -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            ttl: TOKEN_TTL,
        })
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn register_stores_hashed_password() {
        let repo = InMemoryUserRepository::new();
        let user = register(&repo, register_req("a@b.com", "pw")).await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_ne!(user.password_hash, "pw");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn register_twice_is_rejected_without_second_row() {
        let repo = InMemoryUserRepository::new();
        register(&repo, register_req("a@b.com", "pw")).await.unwrap();
        let err = register(&repo, register_req("a@b.com", "pw")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserExists));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn register_without_password_creates_nothing() {
        let repo = InMemoryUserRepository::new();
        let req = RegisterRequest {
            email: Some("a@b.com".into()),
            password: None,
        };
        let err = register(&repo, req).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn register_without_email_is_internal() {
        let repo = InMemoryUserRepository::new();
        let err = register(&repo, RegisterRequest::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let repo = InMemoryUserRepository::new();
        register(&repo, register_req("a@b.com", "pw")).await.unwrap();

        let wrong_pw = login(&repo, &keys(), login_req("a@b.com", "wrong"))
            .await
            .unwrap_err();
        let unknown = login(&repo, &keys(), login_req("nobody@b.com", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn login_issues_token_for_user() {
        let repo = InMemoryUserRepository::new();
        let user = register(&repo, register_req("a@b.com", "pw")).await.unwrap();

        let token = login(&repo, &keys(), login_req("a@b.com", "pw")).await.unwrap();
        let claims = keys().verify(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn login_without_password_is_internal() {
        let repo = InMemoryUserRepository::new();
        register(&repo, register_req("a@b.com", "pw")).await.unwrap();
        let req = LoginRequest {
            email: Some("a@b.com".into()),
            password: None,
        };
        let err = login(&repo, &keys(), req).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
