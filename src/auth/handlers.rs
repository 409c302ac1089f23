use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            MessageResponse, OauthLoginRequest, RegisterRequest, RepresentativesResponse,
            UserResponse,
        },
        extractors::CurrentUser,
        password::{hash_password, verify_password},
    },
    error::{is_unique_violation, AppError, AppResult},
    state::AppState,
    users::{
        dto::UpdateUserRequest,
        handlers::apply_user_update,
        repo,
        repo_types::{NewUser, PublicUser, Role, User},
    },
};

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.normalize();
    payload.validate()?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }
    if let Some(phone) = &payload.phone {
        if User::find_by_phone(&state.db, phone).await?.is_some() {
            warn!(email = %payload.email, "phone already registered");
            return Err(AppError::Conflict("Phone number already in use".into()));
        }
    }

    let password_hash = hash_password(&payload.password)?;
    let role = if payload.is_representative {
        Role::Representative
    } else {
        Role::User
    };
    let new = NewUser {
        email: payload.email,
        password_hash: Some(password_hash),
        name: payload.name,
        phone: payload.phone,
        district: payload.district,
        is_representative: payload.is_representative,
        role,
        position: payload.position,
        party: payload.party,
        verified: false,
        // Ordinary users get starting credits, representatives none.
        balance: if payload.is_representative { 0 } else { 10 },
        oauth_provider: None,
        oauth_id: None,
    };

    // A concurrent registration racing on the same email loses here on
    // the unique constraint rather than corrupting state.
    let user = match User::create(&state.db, &new).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("User already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let user = PublicUser::from(user);
    repo::cache_user(&state.cache, &user);
    let token = state.jwt.sign(&user)?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.normalize();
    payload.validate()?;

    // Unknown email, OAuth-only account and wrong password are
    // indistinguishable to the caller.
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "login attempt on oauth-only account");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };
    if !verify_password(&payload.password, hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let user = stamp_activity_if_representative(&state, user).await?;

    let token = state.jwt.sign(&user)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse { user, token }))
}

#[instrument(skip(state, payload))]
pub async fn oauth_login(
    State(state): State<AppState>,
    Json(mut payload): Json<OauthLoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.normalize();
    payload.validate()?;

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(existing) => {
            info!(user_id = %existing.id, provider = %payload.provider, "oauth login on existing account");
            stamp_activity_if_representative(&state, existing).await?
        }
        None => {
            let new = NewUser {
                email: payload.email,
                password_hash: None,
                name: payload.name,
                phone: payload.phone,
                district: None,
                is_representative: false,
                role: Role::User,
                position: None,
                party: None,
                verified: payload.verified.unwrap_or(true),
                balance: 10,
                oauth_provider: Some(payload.provider.clone()),
                oauth_id: Some(payload.provider_id.clone()),
            };
            let user = match User::create(&state.db, &new).await {
                Ok(user) => user,
                Err(e) if is_unique_violation(&e) => {
                    return Err(AppError::Conflict("Resource already exists".into()));
                }
                Err(e) => return Err(e.into()),
            };
            info!(user_id = %user.id, provider = %payload.provider, "oauth account created");
            let user = PublicUser::from(user);
            repo::cache_user(&state.cache, &user);
            user
        }
    };

    let token = state.jwt.sign(&user)?;
    Ok(Json(AuthResponse { user, token }))
}

/// Representatives get `last_activity` stamped on every login; the cache
/// entry is overwritten with the returned row before responding.
async fn stamp_activity_if_representative(
    state: &AppState,
    user: User,
) -> AppResult<PublicUser> {
    if !user.is_representative {
        return Ok(PublicUser::from(user));
    }
    let updated = User::touch_last_activity(&state.db, user.id)
        .await?
        .unwrap_or(user);
    let public = PublicUser::from(updated);
    repo::cache_user(&state.cache, &public);
    Ok(public)
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse { user })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated = apply_user_update(&state, user.id, payload).await?;
    Ok(Json(UserResponse { user: updated }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    payload.validate()?;

    // The cache only holds sanitized projections; the hash requires the
    // full row.
    let full = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let current_ok = full
        .password_hash
        .as_deref()
        .map(|hash| verify_password(&payload.current_password, hash))
        .unwrap_or(false);
    if !current_ok {
        warn!(user_id = %user.id, "change password with wrong current password");
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &new_hash).await?;
    // updated_at changed; drop the stale projection.
    repo::evict_user(&state.cache, user.id);

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully".into(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn verify_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let updated = User::set_verified(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let user = PublicUser::from(updated);
    repo::cache_user(&state.cache, &user);
    info!(user_id = %user.id, "user verified");
    Ok(Json(UserResponse { user }))
}

/// Always answers 200 so callers cannot probe which emails exist. Only
/// logs the request; no reset email is sent.
#[instrument(skip_all)]
pub async fn forgot_password(
    Json(payload): Json<ForgotPasswordRequest>,
) -> Json<MessageResponse> {
    info!(email = %payload.email, "password reset requested");
    Json(MessageResponse {
        message: "Password reset email sent if account exists".into(),
    })
}

pub async fn reset_password() -> AppResult<Json<MessageResponse>> {
    Err(AppError::NotImplemented(
        "Password reset confirmation is not implemented".into(),
    ))
}

#[instrument(skip(state))]
pub async fn representatives(
    State(state): State<AppState>,
) -> AppResult<Json<RepresentativesResponse>> {
    let representatives = User::representatives(&state.db)
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(Json(RepresentativesResponse { representatives }))
}
