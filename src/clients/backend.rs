use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};

use super::{
    AuthApi, AuthSession, AuthUser, ClientError, FunctionInvoker, ObjectStorage, SignUpPayload,
    SignUpResult,
};

/// reqwest client for the hosted backend
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(&base_url),
            api_key,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn request(&self, builder: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.api_key);
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        Err(ClientError::Rejected {
            status,
            message: error_message(&text),
        })
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, ClientError> {
        let response = self.send(builder).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AuthApi for BackendClient {
    async fn sign_up(&self, payload: &SignUpPayload) -> Result<SignUpResult, ClientError> {
        let body = json!({
            "email": payload.email,
            "password": payload.password,
            "data": {
                "role": payload.role,
                "display_name": payload.display_name,
            }
        });
        let builder = self.client.post(self.auth_url("signup")).json(&body);
        let value = self.send_json(self.request(builder, None)).await?;
        parse_sign_up(value)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let builder = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let value = self.send_json(self.request(builder, None)).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError> {
        let builder = self.client.post(self.auth_url("logout"));
        self.send(self.request(builder, Some(access_token))).await?;
        Ok(())
    }

    async fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), ClientError> {
        let builder = self
            .client
            .post(self.auth_url("recover"))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));
        self.send(self.request(builder, None)).await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, ClientError> {
        let builder = self.client.get(self.auth_url("user"));
        let value = self.send_json(self.request(builder, Some(access_token))).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for BackendClient {
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ClientError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(self.request(builder, Some(access_token))).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}

#[async_trait]
impl FunctionInvoker for BackendClient {
    async fn invoke(
        &self,
        access_token: &str,
        name: &str,
        body: Value,
    ) -> Result<Value, ClientError> {
        let url = format!("{}/functions/v1/{}", self.base_url, name);
        let builder = self.client.post(&url).json(&body);
        self.send_json(self.request(builder, Some(access_token))).await
    }
}

/// Sign-up returns a session when confirmation is disabled and a bare user
/// otherwise.
fn parse_sign_up(value: Value) -> Result<SignUpResult, ClientError> {
    if value.get("access_token").is_some() {
        let session: AuthSession =
            serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))?;
        return Ok(SignUpResult {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = match value.get("user") {
        Some(user) => user.clone(),
        None => value,
    };
    let user: AuthUser =
        serde_json::from_value(user_value).map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(SignUpResult {
        user,
        session: None,
    })
}

fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn normalize_base_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn sign_up_with_session() {
        let id = Uuid::new_v4();
        let value = json!({
            "access_token": "token",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": id, "email": "a@example.com", "user_metadata": { "role": "admin" } }
        });
        let result = parse_sign_up(value).unwrap();
        assert_eq!(result.user.id, id);
        assert_eq!(result.session.unwrap().access_token, "token");
    }

    #[test]
    fn sign_up_pending_confirmation_returns_bare_user() {
        let id = Uuid::new_v4();
        let result = parse_sign_up(json!({ "id": id, "email": "b@example.com" })).unwrap();
        assert_eq!(result.user.id, id);
        assert!(result.session.is_none());
        assert_eq!(result.user.user_metadata, Value::Null);
    }

    #[test]
    fn error_message_prefers_description() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn public_url_points_at_bucket() {
        let client = BackendClient::new("https://project.example.co/".into(), "anon".into());
        assert_eq!(
            client.public_url("review-photos", "review-photos/u/1.jpg"),
            "https://project.example.co/storage/v1/object/public/review-photos/review-photos/u/1.jpg"
        );
    }
}
