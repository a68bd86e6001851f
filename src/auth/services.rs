use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    repo_types::NewUser,
};
use crate::{error::AppError, state::AppState};

const MIN_PASSWORD_LEN: usize = 6;
const BAD_CREDENTIALS: &str = "Invalid email or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks presence and shape of the email as sent, then normalizes it.
/// Surrounding whitespace fails the shape check.
fn validated_email(raw: &str) -> Result<String, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !is_valid_email(raw) {
        return Err(AppError::validation("Please provide a valid email address"));
    }
    Ok(normalize_email(raw))
}

pub async fn register(st: &AppState, req: RegisterRequest) -> Result<AuthResponse, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    let email = validated_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User with this email already exists".into()));
    }

    let password_hash = st.hasher.hash_async(&req.password).await?;
    let user = st
        .users
        .create(NewUser {
            id: Uuid::new_v4(),
            email,
            name: name.to_string(),
            password_hash,
        })
        .await?
        // lost a race against a concurrent registration of the same email
        .ok_or_else(|| AppError::Conflict("User with this email already exists".into()))?;

    let token = st.jwt.issue(user.id, &user.email)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

/// Unknown email and wrong password fail identically.
pub async fn login(st: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    let email = validated_email(&req.email)?;
    if req.password.trim().is_empty() {
        return Err(AppError::validation("Password is required"));
    }

    let Some(user) = st.users.find_by_email(&email).await? else {
        st.hasher.verify_dummy_async(&req.password).await;
        warn!("login rejected");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !st
        .hasher
        .verify_async(&req.password, &user.password_hash)
        .await?
    {
        warn!(user_id = %user.id, "login rejected");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = st.jwt.issue(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        user: user.into(),
        token,
    })
}

/// A valid token whose user no longer exists is treated as an invalid token.
pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    st.users
        .find_by_id(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or(AppError::InvalidToken)
}
