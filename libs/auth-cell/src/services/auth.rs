// libs/auth-cell/src/services/auth.rs
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use regex::Regex;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{ApiError, SupabaseClient};
use shared_models::auth::{Role, User};
use shared_utils::access::landing_route;

use crate::models::{
    AuthError, AuthSession, PatientRecord, PortalProfile, ProfessionalRecord, SignUpRequest, UserProfile,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Which call failed, for translating provider messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthOperation {
    SignIn,
    SignUp,
    SignOut,
    ResetPassword,
}

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    let valid = match email_pattern() {
        Some(pattern) => pattern.is_match(email),
        None => email.contains('@'),
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation(format!("Invalid email address: {}", email)))
    }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Map a failed provider call to what the user is told.
fn translate(err: anyhow::Error, operation: AuthOperation) -> AuthError {
    let Some(api_error) = err.downcast_ref::<ApiError>() else {
        error!("{:?} failed before reaching the provider: {}", operation, err);
        return AuthError::Provider(err.to_string());
    };

    if api_error.is_rate_limited() {
        return AuthError::RateLimited;
    }

    match operation {
        AuthOperation::SignIn if api_error.message == "Invalid login credentials" => AuthError::InvalidCredentials,
        AuthOperation::SignUp if api_error.message.contains("already registered") => {
            AuthError::EmailAlreadyRegistered
        }
        _ => AuthError::Provider(api_error.message.clone()),
    }
}

pub struct AuthService {
    supabase: SupabaseClient,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            supabase: SupabaseClient::new(&config),
            config,
        }
    }

    fn redirect_query(&self) -> String {
        format!("redirect_to={}", urlencoding::encode(&self.config.auth_redirect_url()))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        debug!("Signing in {}", email);
        validate_email(email)?;
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        let session: AuthSession = self
            .supabase
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                None,
                Some(json!({ "email": email.trim(), "password": password })),
            )
            .await
            .map_err(|e| translate(e, AuthOperation::SignIn))?;

        info!("User {} signed in", email);
        Ok(session)
    }

    /// Register an account; the provider emails a confirmation link back to
    /// the portal's login page.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<Value, AuthError> {
        debug!("Signing up {} as {}", request.email, request.role);
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let path = format!("/auth/v1/signup?{}", self.redirect_query());
        let body = json!({
            "email": request.email.trim(),
            "password": request.password,
            "data": {
                "first_name": request.first_name,
                "last_name": request.last_name,
                "role": request.role,
            }
        });

        let user: Value = self
            .supabase
            .request(Method::POST, &path, None, Some(body))
            .await
            .map_err(|e| translate(e, AuthOperation::SignUp))?;

        info!("Registered {}", request.email);
        Ok(user)
    }

    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.supabase
            .request_no_content(Method::POST, "/auth/v1/logout", Some(token), None)
            .await
            .map_err(|e| translate(e, AuthOperation::SignOut))
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;

        let path = format!("/auth/v1/recover?{}", self.redirect_query());
        self.supabase
            .request_no_content(Method::POST, &path, None, Some(json!({ "email": email.trim() })))
            .await
            .map_err(|e| translate(e, AuthOperation::ResetPassword))?;

        info!("Password reset requested for {}", email);
        Ok(())
    }

    async fn first_row<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<Option<T>> {
        let mut rows: Vec<T> = self.supabase.request(Method::GET, path, Some(token), None).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    async fn fetch_user_row(&self, user_id: &str, token: &str) -> Result<Option<UserProfile>> {
        self.first_row(&format!("/rest/v1/users?id=eq.{}&select=*", user_id), token).await
    }

    /// Create the `users` row and the role-specific row through the
    /// provisioning RPCs.
    async fn provision_profile(&self, fallback: &UserProfile, token: &str) -> Result<()> {
        self.supabase
            .rpc(
                "create_user_profile",
                token,
                json!({
                    "user_id": fallback.id,
                    "user_email": fallback.email,
                    "user_first_name": fallback.first_name,
                    "user_last_name": fallback.last_name,
                    "user_role": fallback.role,
                }),
            )
            .await?;

        match fallback.role {
            Role::Patient => {
                self.supabase
                    .rpc("create_patient_profile", token, json!({ "user_id": fallback.id }))
                    .await?;
            }
            Role::Professional => {
                self.supabase
                    .rpc(
                        "create_professional_profile",
                        token,
                        json!({
                            "user_id": fallback.id,
                            "prof_specialty": "",
                            "prof_license_number": "",
                        }),
                    )
                    .await?;
            }
            Role::Admin => {}
        }

        info!("Provisioned {} profile for {}", fallback.role, fallback.id);
        Ok(())
    }

    /// Load the portal profile, creating the database rows on first login.
    ///
    /// Failures past the initial lookup degrade instead of failing: a missing
    /// row that cannot be created is replaced by one built from the token's
    /// claims, and a missing patient/professional row by an empty record.
    pub async fn load_profile(&self, user: &User, token: &str) -> Result<PortalProfile, AuthError> {
        let fallback = profile_from_claims(user);

        let existing = self
            .fetch_user_row(&user.id, token)
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let (profile, degraded) = match existing {
            Some(profile) => (profile, false),
            None => {
                warn!("No users row for {}, creating one", user.id);
                let created = match self.provision_profile(&fallback, token).await {
                    Ok(()) => self.fetch_user_row(&user.id, token).await.ok().flatten(),
                    Err(e) => {
                        error!("Error creating user profile for {}: {}", user.id, e);
                        None
                    }
                };
                match created {
                    Some(profile) => (profile, false),
                    None => (fallback, true),
                }
            }
        };

        let (patient, professional) = match profile.role {
            Role::Patient => {
                let record = self
                    .first_row::<PatientRecord>(&format!("/rest/v1/patients?user_id=eq.{}&select=*", user.id), token)
                    .await
                    .unwrap_or_else(|e| {
                        error!("Error loading patient data for {}: {}", user.id, e);
                        None
                    })
                    .unwrap_or_else(|| PatientRecord {
                        user_id: user.id.clone(),
                        ..Default::default()
                    });
                (Some(record), None)
            }
            Role::Professional => {
                let record = self
                    .first_row::<ProfessionalRecord>(
                        &format!("/rest/v1/professionals?user_id=eq.{}&select=*", user.id),
                        token,
                    )
                    .await
                    .unwrap_or_else(|e| {
                        error!("Error loading professional data for {}: {}", user.id, e);
                        None
                    })
                    .unwrap_or_else(|| ProfessionalRecord {
                        user_id: user.id.clone(),
                        ..Default::default()
                    });
                (None, Some(record))
            }
            Role::Admin => (None, None),
        };

        let landing_route = landing_route(profile.role).path();
        Ok(PortalProfile {
            user: profile,
            patient,
            professional,
            degraded,
            landing_route,
        })
    }
}

/// Profile built from the token alone, used to provision and as a last resort.
pub fn profile_from_claims(user: &User) -> UserProfile {
    let metadata_field = |key: &str| {
        user.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    UserProfile {
        id: user.id.clone(),
        email: user.email.clone().unwrap_or_default(),
        first_name: metadata_field("first_name"),
        last_name: metadata_field("last_name"),
        role: user.portal_role(),
        phone_number: None,
        profile_image_url: None,
        created_at: user.created_at,
    }
}
