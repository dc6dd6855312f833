use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::db_error;
use crate::clients::{AuthApi, AuthSession, AuthUser, FunctionInvoker, SignUpPayload, SignUpResult};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    Profile, ResetPasswordRequest, Role, SignInRequest, SignUpRequest, SuccessFlag,
    UpdateProfileRequest,
};
use crate::session::{AuthEvent, AuthEvents, SessionContext, SessionOverview};
use crate::store::Store;

const UPDATE_ROLE_FUNCTION: &str = "update-user-role";

pub struct AuthService {
    store: Arc<dyn Store>,
    api: Arc<dyn AuthApi>,
    functions: Arc<dyn FunctionInvoker>,
    events: AuthEvents,
    reset_redirect: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        api: Arc<dyn AuthApi>,
        functions: Arc<dyn FunctionInvoker>,
        events: AuthEvents,
        reset_redirect: String,
    ) -> Self {
        Self {
            store,
            api,
            functions,
            events,
            reset_redirect,
        }
    }

    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    /// Registers with the auth provider, then creates the matching profile
    /// row. Role and display name also travel as user metadata. Admin
    /// accounts cannot be self-registered.
    pub async fn sign_up(&self, request: SignUpRequest) -> ServiceResult<SignUpResult> {
        match request.role {
            Role::NormalUser | Role::BusinessOwner => {}
            Role::Admin => {
                return Err(ServiceError::validation(
                    "Admin accounts cannot be created through sign-up",
                ))
            }
        }

        let payload = SignUpPayload {
            email: request.email.trim().to_lowercase(),
            password: request.password,
            role: request.role,
            display_name: request.display_name,
        };

        let result = self.api.sign_up(&payload).await.map_err(|err| {
            log::error!("Error signing up {}: {err}", payload.email);
            ServiceError::from(err)
        })?;

        self.store
            .insert_profile(Profile {
                id: result.user.id,
                email: payload.email.clone(),
                display_name: payload.display_name.clone(),
                phone: None,
                avatar_url: None,
                role: payload.role,
                is_active: true,
                deactivation_reason: None,
                deactivated_at: None,
                created_at: Utc::now(),
            })
            .await
            .map_err(db_error("Error creating profile for new user"))?;

        if result.session.is_some() {
            self.events.publish(AuthEvent::SignedIn {
                user_id: result.user.id,
            });
        }
        log::info!("User {} signed up as {:?}", result.user.id, payload.role);
        Ok(result)
    }

    pub async fn sign_in(&self, request: SignInRequest) -> ServiceResult<AuthSession> {
        let session = self
            .api
            .sign_in(request.email.trim(), &request.password)
            .await
            .map_err(|err| {
                log::error!("Error signing in: {err}");
                ServiceError::from(err)
            })?;

        self.events.publish(AuthEvent::SignedIn {
            user_id: session.user.id,
        });
        Ok(session)
    }

    pub async fn sign_out(&self, session: &SessionContext) -> ServiceResult<()> {
        self.api
            .sign_out(&session.access_token)
            .await
            .map_err(|err| {
                log::error!("Error signing out {}: {err}", session.user_id);
                ServiceError::from(err)
            })?;

        self.events.publish(AuthEvent::SignedOut {
            user_id: session.user_id,
        });
        Ok(())
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<SuccessFlag> {
        self.api
            .reset_password(request.email.trim(), &self.reset_redirect)
            .await
            .map_err(|err| {
                log::error!("Error resetting password: {err}");
                ServiceError::from(err)
            })?;
        Ok(SuccessFlag { success: true })
    }

    /// Lookup failures read as "no user".
    pub async fn current_user(&self, access_token: &str) -> Option<AuthUser> {
        match self.api.current_user(access_token).await {
            Ok(user) => Some(user),
            Err(err) => {
                log::warn!("Error getting current user: {err}");
                None
            }
        }
    }

    /// Bearer token -> auth user -> profile row.
    pub async fn resolve_session(&self, access_token: &str) -> ServiceResult<SessionContext> {
        let user = self
            .current_user(access_token)
            .await
            .ok_or_else(|| ServiceError::Unauthorized("invalid or expired session".into()))?;

        let profile = self
            .store
            .get_profile(user.id)
            .await
            .map_err(db_error("Failed to load profile for session"))?
            .ok_or_else(|| ServiceError::Unauthorized("no profile for this account".into()))?;

        if !profile.is_active {
            return Err(ServiceError::forbidden("This account has been deactivated"));
        }

        Ok(SessionContext::from_profile(&profile, access_token))
    }

    pub async fn overview(&self, session: &SessionContext) -> ServiceResult<SessionOverview> {
        let profile = self.get_profile(session.user_id).await?;
        Ok(SessionOverview {
            role: profile.role,
            sections: profile.role.sections(),
            profile,
        })
    }

    pub async fn get_profile(&self, user_id: Uuid) -> ServiceResult<Profile> {
        self.store
            .get_profile(user_id)
            .await
            .map_err(db_error("Error fetching user profile"))?
            .ok_or(ServiceError::NotFound("Profile"))
    }

    pub async fn update_profile(
        &self,
        session: &SessionContext,
        request: UpdateProfileRequest,
    ) -> ServiceResult<Profile> {
        let mut profile = self.get_profile(session.user_id).await?;
        request.apply_to_existing(&mut profile);
        self.store
            .update_profile(profile)
            .await
            .map_err(db_error("Error updating user profile"))
    }

    /// Updates the auth provider's claims first, then the profile row. A
    /// failure in the second step leaves the claims changed.
    pub async fn change_user_role(
        &self,
        admin: &SessionContext,
        user_id: Uuid,
        role: Role,
    ) -> ServiceResult<SuccessFlag> {
        admin.require_admin()?;
        let mut profile = self.get_profile(user_id).await?;

        self.functions
            .invoke(
                &admin.access_token,
                UPDATE_ROLE_FUNCTION,
                json!({ "userId": user_id, "role": role }),
            )
            .await
            .map_err(|err| {
                log::error!("Error changing role claims for {user_id}: {err}");
                ServiceError::from(err)
            })?;

        profile.role = role;
        self.store
            .update_profile(profile)
            .await
            .map_err(db_error("Error changing user role"))?;

        log::info!("Admin {} changed role of {} to {:?}", admin.user_id, user_id, role);
        Ok(SuccessFlag { success: true })
    }
}
