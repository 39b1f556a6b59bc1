// libs/auth-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_models::auth::Role;
use shared_models::error::AppError;

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Patient
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

// ==============================================================================
// RESPONSES AND RECORDS
// ==============================================================================

/// Session returned by the password grant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Value,
}

/// Row of the `users` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    pub phone_number: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PatientRecord {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub date_of_birth: Option<String>,
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub medical_history: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfessionalRecord {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub license_number: String,
    pub practice_address: Option<String>,
    pub years_of_experience: Option<i32>,
    pub education: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Everything the portal needs to know about the signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct PortalProfile {
    pub user: UserProfile,
    pub patient: Option<PatientRecord>,
    pub professional: Option<ProfessionalRecord>,
    /// True when the `users` row could not be read or created and the profile
    /// was built from token claims.
    pub degraded: bool,
    pub landing_route: &'static str,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many attempts, please try again later")]
    RateLimited,

    #[error("This email is already registered")]
    EmailAlreadyRegistered,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication provider error: {0}")]
    Provider(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials => AppError::Auth(message),
            AuthError::RateLimited => AppError::TooManyRequests(message),
            AuthError::EmailAlreadyRegistered => AppError::Conflict(message),
            AuthError::Validation(_) => AppError::ValidationError(message),
            AuthError::Provider(_) => AppError::ExternalService(message),
        }
    }
}
