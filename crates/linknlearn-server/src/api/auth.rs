//! Sign-up, email verification, sign-in, sign-out.
//!
//! Credential handling stays at boundary altitude: passwords are stored as
//! a keyed BLAKE3 digest and compared in constant time, and the
//! verification token is returned to the caller so the deployment can wire
//! whatever delivery channel it likes. There is no password reset, rate
//! limiting, or lockout here.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use linknlearn_shared::{email, UserId};
use linknlearn_store::{Credentials, Profile};

use crate::api::profiles::ProfileDto;
use crate::api::AppState;
use crate::error::ApiError;

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: UserId,
    /// One-shot token to present at `/auth/verify`.
    pub verification_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub token: String,
    pub profile: ProfileDto,
}

/// Create an account for an institutional email address.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, ApiError> {
    let address = email::validate(&req.email).map_err(|_| {
        ApiError::BadRequest(
            "Use your institutional email, like 23eg105b04@anurag.edu.in".to_string(),
        )
    })?;

    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let user_id = UserId::parse(&Uuid::new_v4().simple().to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let verification_token = Uuid::new_v4().to_string();
    let digest = password_digest(&state.config.password_key, &req.password);

    let profile = Profile {
        id: user_id.clone(),
        full_name: req.full_name.unwrap_or_default(),
        email: address.clone(),
        photo_url: None,
        department: None,
        college_name: None,
        graduation_year: None,
        bio: None,
        achievements: None,
        created_at: Utc::now(),
    };

    {
        let db = state.db();
        if db.email_taken(&address)? {
            return Err(ApiError::Conflict("Account already exists".to_string()));
        }
        db.create_profile(&profile)?;
        db.create_credentials(&Credentials {
            user_id: user_id.clone(),
            email: address.clone(),
            password_digest: digest,
            verified: false,
            verification_token: Some(verification_token.clone()),
        })?;
    }

    tracing::info!(user = %user_id, "account created, verification pending");

    Ok(Json(SignupResponse {
        user_id,
        verification_token,
    }))
}

/// Mark an account's email address as verified.
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = req.email.trim().to_ascii_lowercase();
    let ok = state.db().verify_email(&address, &req.token)?;
    if !ok {
        return Err(ApiError::BadRequest(
            "Unknown account or wrong verification token".to_string(),
        ));
    }
    Ok(Json(serde_json::json!({ "verified": true })))
}

/// Exchange credentials for a bearer session token.
pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> Result<Json<SigninResponse>, ApiError> {
    let address = req.email.trim().to_ascii_lowercase();

    let (creds, profile) = {
        let db = state.db();
        let creds = db
            .get_credentials_by_email(&address)
            .map_err(|_| ApiError::Unauthorized)?;
        let profile = db.get_profile(&creds.user_id)?;
        (creds, profile)
    };

    let digest = password_digest(&state.config.password_key, &req.password);
    if !digests_match(&digest, &creds.password_digest) {
        return Err(ApiError::Unauthorized);
    }

    if !creds.verified {
        return Err(ApiError::Forbidden(
            "Verify your email before signing in".to_string(),
        ));
    }

    let token = state.sessions.issue(creds.user_id.clone());
    tracing::info!(user = %creds.user_id, "signed in");

    Ok(Json(SigninResponse {
        token,
        profile: ProfileDto::from(profile),
    }))
}

/// Tear the session down. Idempotent.
pub async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    if let Some(token) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.sessions.revoke(token);
    }
    Json(serde_json::json!({ "signedOut": true }))
}

fn password_digest(key: &[u8; 32], password: &str) -> String {
    blake3::keyed_hash(key, password.as_bytes())
        .to_hex()
        .to_string()
}

fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && a.ct_eq(b).unwrap_u8() == 1
}
