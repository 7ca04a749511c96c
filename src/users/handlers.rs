use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{AdminUser, AuthUser},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    messages,
    notify::is_valid_phone,
    state::AppState,
    users::{
        dto::{
            AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
            MessageResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
            UpdateProfileRequest, UpdateRoleRequest,
        },
        repo::{NewUser, User, ROLE_FARMER},
        services,
    },
};

const RESET_TOKEN_TTL: Duration = Duration::hours(1);

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    if !is_valid_phone(&payload.phone_number) {
        warn!(phone = %payload.phone_number, "invalid phone number");
        return Err((StatusCode::BAD_REQUEST, "Invalid phone number".into()));
    }
    if payload.password.len() < 6 {
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }
    let name = payload.name.trim();
    let village = payload.village.trim().to_lowercase();
    if name.is_empty() || village.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name and village are required".into()));
    }

    if let Ok(Some(_)) = User::find_by_phone(&state.db, &payload.phone_number).await {
        warn!(phone = %payload.phone_number, "phone number already registered");
        return Err((
            StatusCode::BAD_REQUEST,
            "Phone number already registered".into(),
        ));
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    let user = User::create(
        &state.db,
        NewUser {
            phone_number: &payload.phone_number,
            password_hash: &hash,
            name,
            village: Some(village.as_str()),
            role: ROLE_FARMER,
            language_preference: payload.language_preference.as_deref().unwrap_or("en"),
            must_reset_password: false,
        },
    )
    .await
    .map_err(internal)?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(internal)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = match User::find_by_phone(&state.db, &payload.phone_number).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(phone = %payload.phone_number, "login unknown phone number");
            return Err((
                StatusCode::UNAUTHORIZED,
                "Invalid phone number or password".into(),
            ));
        }
        Err(e) => return Err(internal(e)),
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid phone number or password".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(internal)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let rejection = (
        StatusCode::UNAUTHORIZED,
        "Invalid credentials or not an admin account".to_string(),
    );

    let user = match User::find_by_phone(&state.db, &payload.phone_number).await {
        Ok(Some(u)) if u.is_admin() => u,
        Ok(_) => {
            warn!(phone = %payload.phone_number, "admin login rejected");
            return Err(rejection);
        }
        Err(e) => return Err(internal(e)),
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user.id, "admin login invalid password");
        return Err(rejection);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(internal)?;

    info!(user_id = %user.id, "admin logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.name.as_deref(),
        payload.language_preference.as_deref(),
    )
    .await
    .map_err(internal)?
    .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    Ok(Json(updated.into()))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, (StatusCode, String)> {
    let user = User::find_by_phone(&state.db, &payload.phone_number)
        .await
        .map_err(internal)?
        .ok_or((
            StatusCode::NOT_FOUND,
            "No account found with that phone number".to_string(),
        ))?;

    let code = services::generate_reset_code();
    let code_hash = hash_password(&code).map_err(internal)?;
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;

    User::set_reset_token(&state.db, user.id, &code_hash, expires)
        .await
        .map_err(internal)?;

    let body = messages::password_reset(&state.config, &code);
    if let Err(e) = state.notifier.send(&user.phone_number, &body).await {
        error!(error = %e, user_id = %user.id, "failed to deliver reset code");
    }

    info!(user_id = %user.id, "password reset initiated");
    Ok(Json(ForgotPasswordResponse {
        message: "Reset code sent to your phone number via WhatsApp".into(),
        phone_number: user.phone_number,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let expired = (
        StatusCode::BAD_REQUEST,
        "Password reset code is invalid or has expired".to_string(),
    );

    let user = User::find_by_phone(&state.db, &payload.phone_number)
        .await
        .map_err(internal)?
        .ok_or(expired.clone())?;

    let token_hash = match &user.reset_token_hash {
        Some(h) if services::reset_token_valid(user.reset_token_expires, OffsetDateTime::now_utc()) => {
            h.clone()
        }
        _ => return Err(expired),
    };

    let code = payload.reset_code.trim().to_uppercase();
    let ok = verify_password(&code, &token_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user.id, "invalid reset code presented");
        return Err((StatusCode::BAD_REQUEST, "Invalid reset code".into()));
    }

    if payload.new_password.len() < 6 {
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }
    let hash = hash_password(&payload.new_password).map_err(internal)?;
    User::reset_password(&state.db, user.id, &hash)
        .await
        .map_err(internal)?;

    let body = messages::password_reset_done(&state.config);
    if let Err(e) = state.notifier.send(&user.phone_number, &body).await {
        error!(error = %e, user_id = %user.id, "failed to send reset confirmation");
    }

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageResponse {
        message: "Password has been reset successfully".into(),
    }))
}

// --- admin ---

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    let users = User::list_all(&state.db).await.map_err(internal)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn remove_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let target = User::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    if target.is_admin() {
        return Err((StatusCode::FORBIDDEN, "Cannot delete admin users".into()));
    }

    User::delete_by_id(&state.db, id).await.map_err(internal)?;
    info!(user_id = %id, "user removed");
    Ok(Json(MessageResponse {
        message: "User removed successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    if !services::is_valid_role(&payload.role) {
        return Err((StatusCode::BAD_REQUEST, "Invalid role".into()));
    }

    let target = User::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let admin_count = User::count_admins(&state.db).await.map_err(internal)?;
    if !services::demotion_allowed(&target.role, &payload.role, admin_count) {
        warn!(user_id = %id, "attempted to demote the last admin");
        return Err((
            StatusCode::FORBIDDEN,
            "Cannot remove the last admin user".into(),
        ));
    }

    let updated = User::update_role(&state.db, id, &payload.role)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    info!(user_id = %id, role = %payload.role, "user role updated");
    Ok(Json(updated.into()))
}
