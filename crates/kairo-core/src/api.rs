//! Auth records and error bodies shared with the Kairo backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred";
pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

/// Error body every endpoint returns on failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Field name to validation messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiErrorResponse {
    /// `None` unless `body` is a JSON object with a string `message`.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

impl fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code.as_deref() {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiErrorResponse {}

/// The backend's message from an error body, or `fallback` when the body has
/// none.
pub fn error_message(body: &str, fallback: &str) -> String {
    ApiErrorResponse::from_body(body)
        .map(|resp| resp.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Message to show for any failure: backend errors keep their own message,
/// other errors show their top-level description.
pub fn user_message(err: &anyhow::Error) -> String {
    if let Some(resp) = err.downcast_ref::<ApiErrorResponse>() {
        if resp.message.is_empty() {
            return DEFAULT_ERROR_MESSAGE.to_string();
        }
        return resp.message.clone();
    }
    let message = err.to_string();
    if message.is_empty() {
        DEFAULT_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

/// Requests to these paths are never retried after a token refresh.
pub fn is_auth_endpoint(path: &str) -> bool {
    path.contains(REFRESH_PATH) || path.contains(LOGIN_PATH)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub last_completed_date: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDto {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenDto {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl AuthResponse {
    pub fn tokens(&self) -> AuthTokens {
        AuthTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn recognizes_error_bodies() {
        let full = r#"{"message":"Validation failed","code":"VALIDATION","errors":{"name":["required"]}}"#;
        let resp = ApiErrorResponse::from_body(full).expect("error body");
        assert_eq!(resp.code.as_deref(), Some("VALIDATION"));
        assert_eq!(resp.errors.expect("errors")["name"], vec!["required"]);

        assert!(ApiErrorResponse::from_body(r#"{"message":"x"}"#).is_some());
        assert!(ApiErrorResponse::from_body("null").is_none());
        assert!(ApiErrorResponse::from_body(r#"{"message":42}"#).is_none());
        assert!(ApiErrorResponse::from_body(r#"{"error":"nope"}"#).is_none());
        assert!(ApiErrorResponse::from_body("<html>").is_none());
    }

    #[test]
    fn message_falls_back() {
        assert_eq!(
            error_message(r#"{"message":"Day already exists"}"#, DEFAULT_ERROR_MESSAGE),
            "Day already exists"
        );
        assert_eq!(error_message(r#"{"message":""}"#, "fallback"), "fallback");
        assert_eq!(error_message("", DEFAULT_ERROR_MESSAGE), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let backend = anyhow::Error::new(ApiErrorResponse {
            message: "Token expired".to_string(),
            code: Some("AUTH".to_string()),
            errors: None,
        });
        assert_eq!(user_message(&backend), "Token expired");
        assert_eq!(user_message(&anyhow!("disk full")), "disk full");
    }

    #[test]
    fn auth_paths_are_excluded_from_retry() {
        assert!(is_auth_endpoint("/auth/refresh"));
        assert!(is_auth_endpoint("https://api.example.test/auth/login"));
        assert!(!is_auth_endpoint("/days"));
        assert!(!is_auth_endpoint(ME_PATH));
    }

    #[test]
    fn auth_response_shape() {
        let raw = r#"{
            "accessToken": "a1",
            "refreshToken": "r1",
            "user": {"id": "u1", "email": "a@b.c", "name": "Ana", "currentStreak": 3, "longestStreak": 9, "lastCompletedDate": null}
        }"#;
        let resp: AuthResponse = serde_json::from_str(raw).expect("auth response");
        assert_eq!(resp.user.longest_streak, 9);
        assert_eq!(resp.tokens().refresh_token, "r1");
        let body = serde_json::to_value(RefreshTokenDto {
            refresh_token: "r1".to_string(),
        })
        .expect("json");
        assert_eq!(body, serde_json::json!({"refreshToken": "r1"}));
    }
}
