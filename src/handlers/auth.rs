use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Host, Session};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::ids;
use crate::utils::response::{created, empty_success, success};
use crate::utils::validate::normalize_email;

/// The authenticated host, re-derived from session state on every
/// host-scoped request. Rejects with 401 when no valid session is
/// presented and 404 when the session points at a deleted host.
pub struct CurrentHost(pub Host);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentHost {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

        let host_id = state
            .store
            .session_host_id(&token)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid session".to_string()))?;

        let host = state
            .store
            .host_by_id(host_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Host not found".to_string()))?;

        Ok(CurrentHost(host))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub whatsapp_number: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
struct HostPayload {
    id: Uuid,
    email: String,
    name: String,
    whatsapp_number: String,
}

impl From<&Host> for HostPayload {
    fn from(host: &Host) -> Self {
        Self {
            id: host.id,
            email: host.email.clone(),
            name: host.name.clone(),
            whatsapp_number: host.whatsapp_number.clone(),
        }
    }
}

#[derive(Serialize)]
struct AuthPayload {
    host: HostPayload,
    token: String,
}

async fn open_session(state: &AppState, host_id: Uuid) -> Result<String, AppError> {
    let session = Session {
        token: ids::new_session_token(),
        host_id,
        created_at: Utc::now(),
    };
    state.store.create_session(&session).await?;
    Ok(session.token)
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Response, AppError> {
    let (Some(email), Some(password), Some(name), Some(whatsapp_number)) =
        (req.email, req.password, req.name, req.whatsapp_number)
    else {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    };
    if password.is_empty() || name.is_empty() || whatsapp_number.is_empty() {
        return Err(AppError::ValidationError(
            "Missing required fields".to_string(),
        ));
    }

    let email = normalize_email(&email)
        .ok_or_else(|| AppError::ValidationError("Invalid email format".to_string()))?;

    if state.store.host_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let salt: [u8; 16] = rand::thread_rng().gen();
    let password_hash = argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {e}")))?;

    let host = Host {
        id: Uuid::new_v4(),
        email,
        name,
        whatsapp_number,
        password_hash,
        created_at: Utc::now(),
    };
    // The unique constraint backs up the pre-check against racing signups
    state.store.create_host(&host).await?;

    let token = open_session(&state, host.id).await?;

    Ok(created(
        AuthPayload {
            host: HostPayload::from(&host),
            token,
        },
        "Account created successfully",
    )
    .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(AppError::ValidationError(
            "Email and password required".to_string(),
        ));
    };

    // One message for unknown email and wrong password alike
    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let email = normalize_email(&email).ok_or_else(invalid)?;
    let host = state.store.host_by_email(&email).await?.ok_or_else(invalid)?;

    if !argon2::verify_encoded(&host.password_hash, password.as_bytes()).unwrap_or(false) {
        return Err(invalid());
    }

    let token = open_session(&state, host.id).await?;

    Ok(success(
        AuthPayload {
            host: HostPayload::from(&host),
            token,
        },
        "Login successful",
    )
    .into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.store.delete_session(&token).await?;
    }
    Ok(empty_success("Logged out successfully").into_response())
}

pub async fn me(CurrentHost(host): CurrentHost) -> Result<Response, AppError> {
    Ok(success(HostPayload::from(&host), "Authenticated").into_response())
}
