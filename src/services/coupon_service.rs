use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::dto::coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest};
use crate::{
    audit::log_audit,
    entity::coupons::{ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Coupon,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Listing only shows coupons a shopper could still use.
pub async fn list_active_coupons(state: &AppState) -> AppResult<ApiResponse<CouponList>> {
    let items = Coupons::find()
        .filter(CouponCol::IsActive.eq(true))
        .filter(CouponCol::ExpiryDate.gt(Utc::now()))
        .order_by_asc(CouponCol::ExpiryDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Coupon::from)
        .collect();
    Ok(ApiResponse::success(
        "OK",
        CouponList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_coupon_by_code(state: &AppState, code: &str) -> AppResult<ApiResponse<Coupon>> {
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(code))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".into()))?;

    if !coupon.is_active {
        return Err(AppError::Conflict("Coupon is no longer active".into()));
    }
    if coupon.expiry_date.with_timezone(&Utc) < Utc::now() {
        return Err(AppError::Conflict("Coupon has expired".into()));
    }

    Ok(ApiResponse::success("OK", coupon.into(), Some(Meta::empty())))
}

pub async fn create_coupon(
    state: &AppState,
    admin: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    if payload.code.trim().is_empty() {
        return Err(AppError::Validation("code must not be empty".into()));
    }
    if payload.discount_amount.is_sign_negative() || payload.discount_amount.is_zero() {
        return Err(AppError::Validation(
            "discount_amount must be greater than 0".into(),
        ));
    }
    if payload.minimum_purchase_amount.is_sign_negative() {
        return Err(AppError::Validation(
            "minimum_purchase_amount must not be negative".into(),
        ));
    }
    if payload.expiry_date < Utc::now() {
        return Err(AppError::Validation(
            "expiry_date must be in the future".into(),
        ));
    }

    let duplicate = Coupons::find()
        .filter(CouponCol::Code.eq(payload.code.as_str()))
        .count(&state.orm)
        .await?;
    if duplicate > 0 {
        return Err(AppError::Conflict("Coupon code already exists".into()));
    }

    let coupon = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(payload.code.to_uppercase()),
        discount_amount: Set(payload.discount_amount),
        expiry_date: Set(payload.expiry_date.into()),
        minimum_purchase_amount: Set(payload.minimum_purchase_amount),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_by: Set(admin.user_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "coupon_create",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": coupon.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon created",
        coupon.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    let coupon = Coupons::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".into()))?;

    let mut active: CouponActive = coupon.into();
    if let Some(discount_amount) = payload.discount_amount {
        if discount_amount.is_sign_negative() || discount_amount.is_zero() {
            return Err(AppError::Validation(
                "discount_amount must be greater than 0".into(),
            ));
        }
        active.discount_amount = Set(discount_amount);
    }
    if let Some(expiry_date) = payload.expiry_date {
        active.expiry_date = Set(expiry_date.into());
    }
    if let Some(minimum_purchase_amount) = payload.minimum_purchase_amount {
        if minimum_purchase_amount.is_sign_negative() {
            return Err(AppError::Validation(
                "minimum_purchase_amount must not be negative".into(),
            ));
        }
        active.minimum_purchase_amount = Set(minimum_purchase_amount);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "coupon_update",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon updated",
        updated.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Coupon not found".into()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "coupon_delete",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon deleted",
        (),
        Some(Meta::empty()),
    ))
}
