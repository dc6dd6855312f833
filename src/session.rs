use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Profile, Role};
use crate::services::AppState;

// ============================================================================
// ROLES
// ============================================================================

/// Top-level areas of a role's client experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Home,
    Search,
    Bookmarks,
    Deals,
    Profile,
    Dashboard,
    Businesses,
    Users,
    Content,
}

impl Role {
    pub fn sections(self) -> &'static [Section] {
        match self {
            Role::NormalUser => &[
                Section::Home,
                Section::Search,
                Section::Bookmarks,
                Section::Deals,
                Section::Profile,
            ],
            Role::BusinessOwner => &[
                Section::Dashboard,
                Section::Businesses,
                Section::Deals,
                Section::Profile,
            ],
            Role::Admin => &[
                Section::Dashboard,
                Section::Users,
                Section::Businesses,
                Section::Content,
                Section::Profile,
            ],
        }
    }

    pub fn can_moderate(self) -> bool {
        match self {
            Role::Admin => true,
            Role::NormalUser | Role::BusinessOwner => false,
        }
    }
}

// ============================================================================
// SESSION CONTEXT
// ============================================================================

/// Caller identity resolved once per request and handed to the services.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub access_token: String,
}

impl SessionContext {
    pub fn from_profile(profile: &Profile, access_token: impl Into<String>) -> Self {
        Self {
            user_id: profile.id,
            email: profile.email.clone(),
            role: profile.role,
            access_token: access_token.into(),
        }
    }

    pub fn require_admin(&self) -> ServiceResult<()> {
        if self.role.can_moderate() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Admin privileges required"))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionOverview {
    pub profile: Profile,
    pub role: Role,
    pub sections: &'static [Section],
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for SessionContext {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                log::error!("Application state missing while resolving session");
                ServiceError::Unauthorized("session unavailable".into())
            })?;
            let token = token
                .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;
            state.auth.resolve_session(&token).await
        })
    }
}

// ============================================================================
// AUTH EVENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { user_id: Uuid },
    SignedOut { user_id: Uuid },
}

/// Fan-out of sign-in/sign-out events. Dropping a receiver unsubscribes it.
#[derive(Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
