use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::state::UserCache;
use crate::users::repo_types::{NewUser, PublicUser, User};

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, district, verified, \
     is_representative, role, position, party, rating, balance, last_activity, \
     oauth_provider, oauth_id, created_at, updated_at";

/// Partial update applied to a user row. `None` leaves a column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub district: Option<String>,
    pub position: Option<String>,
    pub party: Option<String>,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_phone(db: &PgPool, phone: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &PgPool, new: &NewUser) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, phone, district,
                               is_representative, role, position, party, verified,
                               balance, oauth_provider, oauth_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.phone)
        .bind(&new.district)
        .bind(new.is_representative)
        .bind(new.role)
        .bind(&new.position)
        .bind(&new.party)
        .bind(new.verified)
        .bind(new.balance)
        .bind(&new.oauth_provider)
        .bind(&new.oauth_id)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, id: Uuid, changes: &UserChanges) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name       = COALESCE($2, name),
                email      = COALESCE($3, email),
                phone      = COALESCE($4, phone),
                district   = COALESCE($5, district),
                position   = COALESCE($6, position),
                party      = COALESCE($7, party),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.district)
        .bind(&changes.position)
        .bind(&changes.party)
        .fetch_optional(db)
        .await
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_verified(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET verified = TRUE, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Stamp a representative's activity timestamp.
    pub async fn touch_last_activity(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET last_activity = now(), updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Delete a row, returning how many rows were removed.
    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(db)
        .await
    }

    /// Representatives ordered by rating, best first, unrated last.
    pub async fn representatives(db: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE is_representative = TRUE
            ORDER BY rating DESC NULLS LAST, created_at
            "#
        ))
        .fetch_all(db)
        .await
    }
}

pub fn user_cache_key(id: Uuid) -> String {
    format!("user:{id}")
}

/// Overwrite the cache entry for a user. Called after every write so
/// readers never observe a projection older than the last commit.
pub fn cache_user(cache: &UserCache, user: &PublicUser) {
    cache.set(&user_cache_key(user.id), user.clone());
}

pub fn evict_user(cache: &UserCache, id: Uuid) {
    cache.del(&user_cache_key(id));
}

/// Read-through lookup of the sanitized projection: cache first, then
/// the store of record, populating the cache on a hit.
pub async fn find_public_by_id(
    db: &PgPool,
    cache: &UserCache,
    id: Uuid,
) -> AppResult<Option<PublicUser>> {
    let key = user_cache_key(id);
    if let Some(user) = cache.get(&key) {
        return Ok(Some(user));
    }
    let Some(user) = User::find_by_id(db, id).await? else {
        return Ok(None);
    };
    let public = PublicUser::from(user);
    cache.set(&key, public.clone());
    Ok(Some(public))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_prefixed_by_user() {
        let id = Uuid::new_v4();
        assert_eq!(user_cache_key(id), format!("user:{id}"));
    }
}
