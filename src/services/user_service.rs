use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::dto::users::{ChangePasswordRequest, UpdateProfileRequest, UpsertAddressRequest};
use crate::{
    audit::log_audit,
    entity::{
        addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses},
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, User},
    response::{ApiResponse, Meta},
    services::auth_service,
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let record = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(ApiResponse::success("OK", record.into(), Some(Meta::empty())))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let record = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let phone_changed = payload
        .phone
        .as_ref()
        .is_some_and(|p| *p != record.phone);

    let mut active: UserActive = record.into();
    if let Some(first_name) = payload.first_name {
        if first_name.trim().is_empty() {
            return Err(AppError::Validation("first_name must not be empty".into()));
        }
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        if last_name.trim().is_empty() {
            return Err(AppError::Validation("last_name must not be empty".into()));
        }
        active.last_name = Set(last_name);
    }
    if let Some(phone) = payload.phone {
        if phone.trim().is_empty() {
            return Err(AppError::Validation("phone must not be empty".into()));
        }
        active.phone = Set(phone);
    }
    // A new phone number has to be verified again.
    if phone_changed {
        let phone_code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        tracing::info!(user_id = %user.user_id, %phone_code, "phone verification reissued");
        active.phone_verified = Set(false);
        active.phone_verification_code = Set(Some(phone_code));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "profile_update",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Profile updated",
        updated.into(),
        Some(Meta::empty()),
    ))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<()>> {
    if payload.new_password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let record = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let parsed_hash = PasswordHash::new(&record.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(payload.current_password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    let password_hash = auth_service::hash_password(&payload.new_password)?;
    let mut active: UserActive = record.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "password_change",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Password updated",
        (),
        Some(Meta::empty()),
    ))
}

pub async fn get_address(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Address>> {
    let address = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".into()))?;
    Ok(ApiResponse::success("OK", address.into(), Some(Meta::empty())))
}

/// Each user keeps a single delivery address; saving replaces it.
pub async fn upsert_address(
    state: &AppState,
    user: &AuthUser,
    payload: UpsertAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    for (field, value) in [
        ("street", &payload.street),
        ("city", &payload.city),
        ("state", &payload.state),
        ("postal_code", &payload.postal_code),
        ("country", &payload.country),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
    }

    let existing = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;

    let saved = match existing {
        Some(address) => {
            let mut active: AddressActive = address.into();
            active.street = Set(payload.street);
            active.city = Set(payload.city);
            active.state = Set(payload.state);
            active.postal_code = Set(payload.postal_code);
            active.country = Set(payload.country);
            active.updated_at = Set(Utc::now().into());
            active.update(&state.orm).await?
        }
        None => {
            AddressActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                street: Set(payload.street),
                city: Set(payload.city),
                state: Set(payload.state),
                postal_code: Set(payload.postal_code),
                country: Set(payload.country),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "address_upsert",
        Some("addresses"),
        Some(serde_json::json!({ "address_id": saved.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Address saved",
        saved.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<()>> {
    let result = Addresses::delete_many()
        .filter(AddressCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Address not found".into()));
    }
    Ok(ApiResponse::success(
        "Address deleted",
        (),
        Some(Meta::empty()),
    ))
}
