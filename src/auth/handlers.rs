use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{AuthEnvelope, LoginRequest, MeResponse, RegisterRequest},
    extractors::AuthUser,
    services,
};
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthEnvelope>), AppError> {
    let Json(payload) = payload?;
    let auth = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthEnvelope::new("User registered successfully", auth)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthEnvelope>, AppError> {
    let Json(payload) = payload?;
    let auth = services::login(&state, payload).await?;
    Ok(Json(AuthEnvelope::new("Login successful", auth)))
}

#[instrument(skip(state, user), fields(user_id = %user.id, email = %user.email))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = services::current_user(&state, user.id).await?;
    Ok(Json(MeResponse {
        success: true,
        user,
    }))
}
