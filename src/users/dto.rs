use serde::{Deserialize, Serialize};

use crate::auth::dto::is_valid_email;
use crate::error::{AppError, FieldError};
use crate::users::repo::UserChanges;
use crate::users::repo_types::PublicUser;

/// Partial update of a user. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub district: Option<String>,
    pub position: Option<String>,
    pub party: Option<String>,
}

impl UpdateUserRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.take().map(|e| e.trim().to_lowercase());
        for field in [
            &mut self.name,
            &mut self.phone,
            &mut self.district,
            &mut self.position,
            &mut self.party,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();
        if let Some(name) = &self.name {
            if name.len() < 2 {
                details.push(FieldError::new("name", "Name must be at least 2 characters"));
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                details.push(FieldError::new("email", "Invalid email format"));
            }
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(details))
        }
    }

    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            name: self.name,
            email: self.email,
            phone: self.phone,
            district: self.district,
            position: self.position,
            party: self.party,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<PublicUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request() -> UpdateUserRequest {
        UpdateUserRequest {
            name: None,
            email: None,
            phone: None,
            district: None,
            position: None,
            party: None,
        }
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(empty_request().validate().is_ok());
    }

    #[test]
    fn short_name_is_rejected() {
        let mut req = empty_request();
        req.name = Some("x".into());
        match req.validate() {
            Err(AppError::Validation(details)) => {
                assert_eq!(details[0].field, "name");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut req = empty_request();
        req.email = Some("nope".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn normalize_drops_blank_fields() {
        let mut req = empty_request();
        req.phone = Some("  ".into());
        req.name = Some(" Alice ".into());
        req.email = Some(" B@X.Com ".into());
        req.normalize();
        assert_eq!(req.phone, None);
        assert_eq!(req.name.as_deref(), Some("Alice"));
        assert_eq!(req.email.as_deref(), Some("b@x.com"));
    }
}
