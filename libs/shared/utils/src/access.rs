//! Role-gated route table for the portal.
//!
//! Every page the single-page UI can show is listed in [`PortalRoute`]. A route
//! either requires a specific role or is open to any signed-in user; the
//! public ones (home, login) need no session at all.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use shared_models::auth::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalRoute {
    Home,
    Login,
    Dashboard,
    Appointments,
    Results,
    Profile,
    HomeService,
    Telehealth,
    Imaging,
    Professional,
    ProfessionalAppointments,
    ProfessionalPatients,
    ProfessionalConsultations,
    ProfessionalMessages,
    ProfessionalBilling,
    ProfessionalSettings,
}

impl PortalRoute {
    pub const ALL: [PortalRoute; 16] = [
        PortalRoute::Home,
        PortalRoute::Login,
        PortalRoute::Dashboard,
        PortalRoute::Appointments,
        PortalRoute::Results,
        PortalRoute::Profile,
        PortalRoute::HomeService,
        PortalRoute::Telehealth,
        PortalRoute::Imaging,
        PortalRoute::Professional,
        PortalRoute::ProfessionalAppointments,
        PortalRoute::ProfessionalPatients,
        PortalRoute::ProfessionalConsultations,
        PortalRoute::ProfessionalMessages,
        PortalRoute::ProfessionalBilling,
        PortalRoute::ProfessionalSettings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            PortalRoute::Home => "/",
            PortalRoute::Login => "/login",
            PortalRoute::Dashboard => "/dashboard",
            PortalRoute::Appointments => "/appointments",
            PortalRoute::Results => "/results",
            PortalRoute::Profile => "/profile",
            PortalRoute::HomeService => "/home-service",
            PortalRoute::Telehealth => "/telehealth",
            PortalRoute::Imaging => "/imaging",
            PortalRoute::Professional => "/professional",
            PortalRoute::ProfessionalAppointments => "/professional/appointments",
            PortalRoute::ProfessionalPatients => "/professional/patients",
            PortalRoute::ProfessionalConsultations => "/professional/consultations",
            PortalRoute::ProfessionalMessages => "/professional/messages",
            PortalRoute::ProfessionalBilling => "/professional/billing",
            PortalRoute::ProfessionalSettings => "/professional/settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Self::ALL.iter().copied().find(|route| route.path() == trimmed)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, PortalRoute::Home | PortalRoute::Login)
    }

    /// `None` means any signed-in user may open the route.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            PortalRoute::Home | PortalRoute::Login | PortalRoute::Profile => None,
            PortalRoute::Dashboard
            | PortalRoute::Appointments
            | PortalRoute::Results
            | PortalRoute::HomeService
            | PortalRoute::Telehealth
            | PortalRoute::Imaging => Some(Role::Patient),
            PortalRoute::Professional
            | PortalRoute::ProfessionalAppointments
            | PortalRoute::ProfessionalPatients
            | PortalRoute::ProfessionalConsultations
            | PortalRoute::ProfessionalMessages
            | PortalRoute::ProfessionalBilling
            | PortalRoute::ProfessionalSettings => Some(Role::Professional),
        }
    }
}

/// Where a user lands after sign-in or after being bounced from a route.
pub fn landing_route(role: Role) -> PortalRoute {
    match role {
        Role::Patient => PortalRoute::Dashboard,
        Role::Professional | Role::Admin => PortalRoute::Professional,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Redirect(PortalRoute),
}

pub fn check_access(role: Option<Role>, route: PortalRoute) -> AccessDecision {
    if route.is_public() {
        return AccessDecision::Allow;
    }

    let Some(role) = role else {
        return AccessDecision::Redirect(PortalRoute::Login);
    };

    match route.required_role() {
        None => AccessDecision::Allow,
        Some(_) if role == Role::Admin => AccessDecision::Allow,
        Some(required) if required == role => AccessDecision::Allow,
        Some(_) => AccessDecision::Redirect(landing_route(role)),
    }
}

/// Middleware gating an API sub-tree on the caller's portal role. Must run
/// after `auth_middleware` so the `User` extension is present.
pub async fn role_guard(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Response {
    let role = request.extensions().get::<User>().map(User::portal_role);

    let allowed = match role {
        Some(Role::Admin) => true,
        Some(role) => role == required,
        None => false,
    };

    if allowed {
        return next.run(request).await;
    }

    let redirect = match role {
        Some(role) => landing_route(role),
        None => PortalRoute::Login,
    };
    debug!("Role guard rejected {:?} for {} routes, redirecting to {}", role, required, redirect.path());

    let status = if role.is_some() { StatusCode::FORBIDDEN } else { StatusCode::UNAUTHORIZED };
    (
        status,
        Json(json!({
            "error": format!("This area requires the {} role", required),
            "redirect": redirect.path(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestUser;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_route_table_round_trips_paths() {
        for route in PortalRoute::ALL {
            assert_eq!(PortalRoute::from_path(route.path()), Some(route));
        }
        assert_eq!(PortalRoute::from_path("/professional/billing/"), Some(PortalRoute::ProfessionalBilling));
        assert_eq!(PortalRoute::from_path("/nowhere"), None);
    }

    #[test]
    fn test_check_access_rules() {
        assert_eq!(check_access(None, PortalRoute::Home), AccessDecision::Allow);
        assert_eq!(check_access(None, PortalRoute::Appointments), AccessDecision::Redirect(PortalRoute::Login));
        assert_eq!(check_access(Some(Role::Patient), PortalRoute::Appointments), AccessDecision::Allow);
        assert_eq!(
            check_access(Some(Role::Professional), PortalRoute::Appointments),
            AccessDecision::Redirect(PortalRoute::Professional)
        );
        assert_eq!(
            check_access(Some(Role::Patient), PortalRoute::ProfessionalBilling),
            AccessDecision::Redirect(PortalRoute::Dashboard)
        );
        assert_eq!(check_access(Some(Role::Professional), PortalRoute::Profile), AccessDecision::Allow);
        assert_eq!(check_access(Some(Role::Admin), PortalRoute::Dashboard), AccessDecision::Allow);
    }

    fn guarded(required: Role, user: Option<User>) -> Router {
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(required, role_guard));

        match user {
            Some(user) => router.layer(axum::Extension(user)),
            None => router,
        }
    }

    #[tokio::test]
    async fn test_role_guard_middleware() {
        let patient = TestUser::patient("p@example.com").to_user();
        let professional = TestUser::professional("d@example.com").to_user();

        let response = guarded(Role::Patient, Some(patient.clone()))
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = guarded(Role::Patient, Some(professional))
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = guarded(Role::Professional, None)
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
