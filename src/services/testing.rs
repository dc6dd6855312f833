//! Fakes shared by the service tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::clients::{
    AuthApi, AuthSession, AuthUser, ClientError, FunctionInvoker, ObjectStorage, SignUpPayload,
    SignUpResult,
};
use crate::models::{
    Business, BusinessRequest, Deal, DealRequest, DealStatus, ModerationStatus, NewReview, Profile,
    Review,
};
use crate::config::AppConfig;
use crate::services::AppState;
use crate::session::{AuthEvents, SessionContext};
use crate::store::memory::MemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub bucket: String,
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

/// In-process stand-in for the hosted backend's auth, storage and functions.
#[derive(Default)]
pub struct FakeBackend {
    tokens: Mutex<HashMap<String, AuthUser>>,
    pub resets: Mutex<Vec<(String, String)>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub invocations: Mutex<Vec<(String, Value)>>,
    pub fail_functions: bool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_functions() -> Arc<Self> {
        Arc::new(Self {
            fail_functions: true,
            ..Self::default()
        })
    }

    /// Registers `token` as a live session for `profile`.
    pub fn grant(&self, token: &str, profile: &Profile) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            AuthUser {
                id: profile.id,
                email: Some(profile.email.clone()),
                user_metadata: Value::Null,
            },
        );
    }

    fn session_for(&self, user: AuthUser) -> AuthSession {
        let token = format!("token-{}", user.id);
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), user.clone());
        AuthSession {
            access_token: token,
            refresh_token: Some("refresh".into()),
            expires_in: Some(3600),
            token_type: Some("bearer".into()),
            user,
        }
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn sign_up(&self, payload: &SignUpPayload) -> Result<SignUpResult, ClientError> {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(payload.email.clone()),
            user_metadata: json!({
                "role": payload.role,
                "display_name": payload.display_name,
            }),
        };
        let session = self.session_for(user.clone());
        Ok(SignUpResult {
            user,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        if password == "wrong-password" {
            return Err(ClientError::Rejected {
                status: 400,
                message: "Invalid login credentials".into(),
            });
        }
        let existing = self
            .tokens
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned();
        let user = existing.unwrap_or(AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: Value::Null,
        });
        Ok(self.session_for(user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError> {
        self.tokens.lock().unwrap().remove(access_token);
        Ok(())
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), ClientError> {
        self.resets
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, ClientError> {
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(ClientError::Rejected {
                status: 401,
                message: "invalid JWT".into(),
            })
    }
}

#[async_trait]
impl ObjectStorage for FakeBackend {
    async fn upload(
        &self,
        _access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ClientError> {
        self.uploads.lock().unwrap().push(Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://backend.test/storage/v1/object/public/{bucket}/{path}")
    }
}

#[async_trait]
impl FunctionInvoker for FakeBackend {
    async fn invoke(
        &self,
        _access_token: &str,
        name: &str,
        body: Value,
    ) -> Result<Value, ClientError> {
        if self.fail_functions {
            return Err(ClientError::Rejected {
                status: 500,
                message: "function crashed".into(),
            });
        }
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), body));
        Ok(json!({ "success": true }))
    }
}

pub fn session_for(profile: &Profile) -> SessionContext {
    SessionContext::from_profile(profile, format!("token-{}", profile.id))
}

pub fn new_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn business_request(name: &str) -> BusinessRequest {
    BusinessRequest {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        address: "12 Main Street, Springfield".into(),
        phone: None,
        email: None,
        website: None,
        category_id: None,
        logo_url: None,
        cover_image: None,
    }
}

pub fn deal_request(start: DateTime<Utc>, end: DateTime<Utc>) -> DealRequest {
    DealRequest {
        title: "Half price coffee".into(),
        description: None,
        discount_value: 50.0,
        conditions: None,
        start_date: start,
        end_date: end,
    }
}

/// Inserts a business for `owner` straight into the store with `status`.
pub fn seed_business(
    store: &MemoryStore,
    owner: &Profile,
    name: &str,
    status: ModerationStatus,
) -> Business {
    let mut business: Business = business_request(name).into_new_business(owner.id).into();
    business.status = status;
    store.put_business(business.clone());
    business
}

pub fn seed_deal(
    store: &MemoryStore,
    business: &Business,
    request: DealRequest,
    status: DealStatus,
) -> Deal {
    let mut deal: Deal = request.into_new_deal(business.id).into();
    deal.status = status;
    store.put_deal(deal.clone());
    deal
}

pub fn seed_review(
    store: &MemoryStore,
    author: &Profile,
    business: &Business,
    rating: i16,
    status: ModerationStatus,
) -> Review {
    let review: Review = NewReview {
        id: Uuid::new_v4(),
        business_id: business.id,
        user_id: author.id,
        rating,
        comment: Some(format!("{rating} stars")),
        photos: Vec::new(),
        status,
        created_at: Utc::now(),
    }
    .into();
    store.put_review(review.clone());
    review
}

/// Application state over `store` with `backend` standing in for every
/// hosted surface.
pub fn app_state(store: Arc<MemoryStore>, backend: Arc<FakeBackend>) -> AppState {
    let config = AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "postgres://unused".into(),
        backend_url: "https://backend.test".into(),
        backend_anon_key: "anon".into(),
        password_reset_redirect: "directory://reset-password".into(),
        review_photo_bucket: "review-photos".into(),
    };
    AppState::new(
        store,
        backend.clone(),
        backend.clone(),
        backend,
        AuthEvents::new(16),
        &config,
    )
}
