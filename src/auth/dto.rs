use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};
use crate::users::repo_types::PublicUser;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Empty or whitespace-only optional strings are treated as absent.
fn normalize_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub district: Option<String>,
    #[serde(default)]
    pub is_representative: bool,
    pub position: Option<String>,
    pub party: Option<String>,
}

impl RegisterRequest {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.name = self.name.trim().to_string();
        self.phone = normalize_opt(self.phone.take());
        self.district = normalize_opt(self.district.take());
        self.position = normalize_opt(self.position.take());
        self.party = normalize_opt(self.party.take());
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();
        if !is_valid_email(&self.email) {
            details.push(FieldError::new("email", "Invalid email format"));
        }
        if self.password.len() < 6 {
            details.push(FieldError::new(
                "password",
                "Password must be at least 6 characters",
            ));
        }
        if self.name.is_empty() {
            details.push(FieldError::new("name", "Name is required"));
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(details))
        }
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();
        if !is_valid_email(&self.email) {
            details.push(FieldError::new("email", "Invalid email format"));
        }
        if self.password.is_empty() {
            details.push(FieldError::new("password", "Password is required"));
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(details))
        }
    }
}

/// Request body for OAuth login or account creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OauthLoginRequest {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub verified: Option<bool>,
}

impl OauthLoginRequest {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.name = self.name.trim().to_string();
        self.phone = normalize_opt(self.phone.take());
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();
        if self.provider.trim().is_empty() {
            details.push(FieldError::new("provider", "Provider is required"));
        }
        if self.provider_id.trim().is_empty() {
            details.push(FieldError::new("providerId", "Provider id is required"));
        }
        if !is_valid_email(&self.email) {
            details.push(FieldError::new("email", "Invalid email format"));
        }
        if self.name.is_empty() {
            details.push(FieldError::new("name", "Name is required"));
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(details))
        }
    }
}

/// Request body for password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.new_password.len() < 6 {
            return Err(AppError::Validation(vec![FieldError::new(
                "newPassword",
                "Password must be at least 6 characters",
            )]));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Response returned after register, login or OAuth login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct RepresentativesResponse {
    pub representatives: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            email: "a@x.com".into(),
            password: "secret1".into(),
            name: "A".into(),
            phone: None,
            district: None,
            is_representative: false,
            position: None,
            party: None,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register_request().validate().is_ok());
    }

    #[test]
    fn invalid_email_is_a_field_error() {
        let mut req = register_request();
        req.email = "not-an-email".into();
        match req.validate() {
            Err(AppError::Validation(details)) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "email");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn short_password_and_missing_name_are_both_reported() {
        let mut req = register_request();
        req.password = "ab".into();
        req.name = "".into();
        match req.validate() {
            Err(AppError::Validation(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["password", "name"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn normalize_lowercases_email_and_drops_empty_optionals() {
        let mut req = register_request();
        req.email = "  A@X.Com ".into();
        req.phone = Some("   ".into());
        req.district = Some(" Central ".into());
        req.normalize();
        assert_eq!(req.email, "a@x.com");
        assert_eq!(req.phone, None);
        assert_eq!(req.district.as_deref(), Some("Central"));
    }

    #[test]
    fn oauth_requires_provider_and_id() {
        let mut req = OauthLoginRequest {
            provider: "".into(),
            provider_id: " ".into(),
            email: "a@x.com".into(),
            name: "A".into(),
            phone: None,
            verified: None,
        };
        req.normalize();
        match req.validate() {
            Err(AppError::Validation(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["provider", "providerId"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn change_password_rejects_short_new_password() {
        let req = ChangePasswordRequest {
            current_password: "old-password".into(),
            new_password: "abc".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_request_accepts_camel_case_body() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"rep@x.com","password":"secret1","name":"Rep",
                "isRepresentative":true,"position":"Mayor","party":"Green"}"#,
        )
        .unwrap();
        assert!(req.is_representative);
        assert_eq!(req.position.as_deref(), Some("Mayor"));
    }
}
