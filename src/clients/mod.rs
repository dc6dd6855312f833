//! Clients for the hosted backend's HTTP surfaces (auth, storage, functions).
//!
//! Each surface is a trait so the services can run against fakes in tests;
//! [`backend::BackendClient`] implements all three over reqwest.

pub mod backend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// User record owned by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user: AuthUser,
}

/// Sign-up outcome; `session` is absent while email confirmation is pending.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignUpResult {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpPayload {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, payload: &SignUpPayload) -> Result<SignUpResult, ClientError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ClientError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError>;
    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), ClientError>;
    async fn current_user(&self, access_token: &str) -> Result<AuthUser, ClientError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ClientError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(
        &self,
        access_token: &str,
        name: &str,
        body: Value,
    ) -> Result<Value, ClientError>;
}
