use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::wishlist::{AddWishlistRequest, WishlistVariantList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::ProductVariant,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn list_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<WishlistVariantList>> {
    let (page, limit, offset) = pagination.normalize();
    let variants = sqlx::query_as::<_, ProductVariant>(
        r#"
        SELECT pv.*
        FROM wishlists w
        JOIN product_variants pv ON pv.id = w.product_variant_id
        WHERE w.user_id = $1
        ORDER BY w.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wishlists WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        WishlistVariantList { items: variants },
        Some(Meta::new(page, limit, total.0)),
    ))
}

/// Adding an already-wishlisted variant is a no-op, not an error.
pub async fn add_to_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    let variant: Option<ProductVariant> =
        sqlx::query_as("SELECT * FROM product_variants WHERE id = $1")
            .bind(payload.product_variant_id)
            .fetch_optional(pool)
            .await?;
    let variant = variant.ok_or_else(|| AppError::NotFound("Product variant not found".into()))?;

    sqlx::query(
        r#"
        INSERT INTO wishlists (id, user_id, product_variant_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, product_variant_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_variant_id)
    .execute(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "wishlist_add",
        Some("wishlists"),
        Some(serde_json::json!({ "product_variant_id": payload.product_variant_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Added to wishlist",
        variant,
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    product_variant_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_variant_id = $2")
        .bind(user.user_id)
        .bind(product_variant_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Wishlist entry not found".into()));
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "wishlist_remove",
        Some("wishlists"),
        Some(serde_json::json!({ "product_variant_id": product_variant_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from wishlist",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
