use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization role. Assigned at creation and never self-escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Representative,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Representative => write!(f, "REPRESENTATIVE"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Full user row. Never serialized to the wire; handlers convert to
/// [`PublicUser`] before responding.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub district: Option<String>,
    pub verified: bool,
    pub is_representative: bool,
    pub role: Role,
    pub position: Option<String>,
    pub party: Option<String>,
    pub rating: Option<f64>,
    pub balance: i32,
    pub last_activity: Option<OffsetDateTime>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Sanitized projection of a [`User`]: the password hash and OAuth
/// linkage columns never leave the service boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub district: Option<String>,
    pub verified: bool,
    pub is_representative: bool,
    pub role: Role,
    pub position: Option<String>,
    pub party: Option<String>,
    pub rating: Option<f64>,
    pub balance: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_activity: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            district: user.district,
            verified: user.verified,
            is_representative: user.is_representative,
            role: user.role,
            position: user.position,
            party: user.party,
            rating: user.rating,
            balance: user.balance,
            last_activity: user.last_activity,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields for inserting a new user row.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub district: Option<String>,
    pub is_representative: bool,
    pub role: Role,
    pub position: Option<String>,
    pub party: Option<String>,
    pub verified: bool,
    pub balance: i32,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$abc$def".into()),
            name: "A".into(),
            phone: None,
            district: None,
            verified: false,
            is_representative: false,
            role: Role::User,
            position: None,
            party: None,
            rating: None,
            balance: 10,
            last_activity: None,
            oauth_provider: None,
            oauth_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"USER\"");
        assert_eq!(
            serde_json::to_string(&Role::Representative).unwrap(),
            "\"REPRESENTATIVE\""
        );
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }

    #[test]
    fn role_displays_uppercase() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!(Role::Representative.to_string(), "REPRESENTATIVE");
    }

    #[test]
    fn sanitized_user_never_contains_password_or_oauth_fields() {
        let public = PublicUser::from(sample_user());
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("oauth"));
    }

    #[test]
    fn sanitized_user_uses_camel_case_keys() {
        let public = PublicUser::from(sample_user());
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("isRepresentative").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["role"], "USER");
        assert_eq!(json["balance"], 10);
    }
}
