use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::dto::{MessageResponse, UserResponse},
    auth::extractors::{AdminUser, CurrentUser},
    error::{is_unique_violation, AppError, AppResult},
    state::AppState,
    users::{
        dto::{UpdateUserRequest, UsersResponse},
        repo,
        repo_types::{PublicUser, Role, User},
    },
};

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<UsersResponse>> {
    let users = User::list_all(&state.db)
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = repo::find_public_by_id(&state.db, &state.cache, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(UserResponse { user }))
}

#[instrument(skip(state, caller, payload), fields(caller_id = %caller.0.id))]
pub async fn update_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let CurrentUser(caller) = caller;
    if caller.role != Role::Admin && caller.id != id {
        warn!(caller_id = %caller.id, target = %id, "update denied");
        return Err(AppError::Forbidden(
            "You can only update your own profile".into(),
        ));
    }
    let user = apply_user_update(&state, id, payload).await?;
    Ok(Json(UserResponse { user }))
}

#[instrument(skip(state, admin), fields(caller_id = %admin.0.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let AdminUser(admin) = admin;
    if admin.id == id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".into(),
        ));
    }

    let removed = User::delete(&state.db, id).await?;
    if removed == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }
    repo::evict_user(&state.cache, id);

    info!(user_id = %id, deleted_by = %admin.id, "user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}

/// Shared update path for `PUT /api/auth/profile` and `PUT /api/users/:id`:
/// validate, pre-check phone uniqueness, persist, overwrite the cache.
pub(crate) async fn apply_user_update(
    state: &AppState,
    id: Uuid,
    mut payload: UpdateUserRequest,
) -> AppResult<PublicUser> {
    payload.normalize();
    payload.validate()?;

    if let Some(phone) = &payload.phone {
        if let Some(holder) = User::find_by_phone(&state.db, phone).await? {
            if holder.id != id {
                warn!(user_id = %id, "phone already in use");
                return Err(AppError::Conflict("Phone number already in use".into()));
            }
        }
    }

    let updated = match User::update(&state.db, id, &payload.into_changes()).await {
        Ok(row) => row.ok_or_else(|| AppError::NotFound("User not found".into()))?,
        // Racing updates on a unique column surface as a conflict.
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("Resource already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let user = PublicUser::from(updated);
    repo::cache_user(&state.cache, &user);
    info!(user_id = %user.id, "user updated");
    Ok(user)
}
