use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddCartItemRequest, CartLine, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts},
        guests::Entity as Guests,
        product_variants::Entity as ProductVariants,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::CartOwner,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Hard cap per cart line.
const MAX_LINE_QUANTITY: i32 = 5;

pub async fn view_cart(state: &AppState, owner: CartOwner) -> AppResult<ApiResponse<CartView>> {
    let cart = find_or_create_cart(state, owner).await?;
    let view = cart_view(state, cart.id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_item(
    state: &AppState,
    owner: CartOwner,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".into(),
        ));
    }

    let variant = ProductVariants::find_by_id(payload.product_variant_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product variant not found".into()))?;

    let cart = find_or_create_cart(state, owner).await?;

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(CartItemCol::CartId.eq(cart.id))
                .add(CartItemCol::ProductVariantId.eq(variant.id)),
        )
        .one(&state.orm)
        .await?;

    let new_quantity = existing.as_ref().map_or(0, |i| i.quantity) + payload.quantity;
    if new_quantity > MAX_LINE_QUANTITY {
        return Err(AppError::Validation(format!(
            "Cannot have more than {MAX_LINE_QUANTITY} of one item in the cart"
        )));
    }
    if variant.stock_quantity < new_quantity {
        return Err(AppError::Validation("Insufficient stock".into()));
    }

    match existing {
        Some(item) => {
            let mut active: CartItemActive = item.into();
            active.quantity = Set(new_quantity);
            active.updated_at = Set(chrono::Utc::now().into());
            active.update(&state.orm).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_variant_id: Set(variant.id),
                quantity: Set(new_quantity),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&state.orm)
            .await?;
        }
    }

    audit_cart(state, owner, "cart_add", variant.id).await;

    let view = cart_view(state, cart.id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// Delta update: positive adds (bounded by the line cap and stock),
/// negative removes, and a line at or below zero is deleted.
pub async fn update_item(
    state: &AppState,
    owner: CartOwner,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity == 0 {
        return Err(AppError::Validation("quantity delta must not be 0".into()));
    }

    let cart = find_cart(state, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".into()))?;

    let item = CartItems::find()
        .filter(
            Condition::all()
                .add(CartItemCol::CartId.eq(cart.id))
                .add(CartItemCol::ProductVariantId.eq(payload.product_variant_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart item not found".into()))?;

    let new_quantity = item.quantity + payload.quantity;
    if new_quantity <= 0 {
        CartItems::delete_by_id(item.id).exec(&state.orm).await?;
    } else {
        if new_quantity > MAX_LINE_QUANTITY {
            return Err(AppError::Validation(format!(
                "Cannot have more than {MAX_LINE_QUANTITY} of one item in the cart"
            )));
        }
        let variant = ProductVariants::find_by_id(item.product_variant_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::NotFound("Product variant not found".into()))?;
        if variant.stock_quantity < new_quantity {
            return Err(AppError::Validation("Insufficient stock".into()));
        }
        let mut active: CartItemActive = item.into();
        active.quantity = Set(new_quantity);
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(&state.orm).await?;
    }

    audit_cart(state, owner, "cart_update", payload.product_variant_id).await;

    let view = cart_view(state, cart.id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn remove_item(
    state: &AppState,
    owner: CartOwner,
    product_variant_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let cart = find_cart(state, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".into()))?;

    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartItemCol::CartId.eq(cart.id))
                .add(CartItemCol::ProductVariantId.eq(product_variant_id)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Cart item not found".into()));
    }

    audit_cart(state, owner, "cart_remove", product_variant_id).await;

    let view = cart_view(state, cart.id).await?;
    Ok(ApiResponse::success(
        "Removed from cart",
        view,
        Some(Meta::empty()),
    ))
}

/// Empties the cart but keeps the cart row for reuse.
pub async fn clear_cart(state: &AppState, owner: CartOwner) -> AppResult<ApiResponse<CartView>> {
    let cart = find_cart(state, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".into()))?;

    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;

    let view = cart_view(state, cart.id).await?;
    Ok(ApiResponse::success(
        "Cart cleared",
        view,
        Some(Meta::empty()),
    ))
}

/// Fold a guest cart into the user's cart at login/register. Quantities
/// for the same variant are summed and clamped to the line cap; the
/// emptied guest cart row is left behind.
pub async fn merge_guest_cart(state: &AppState, user_id: Uuid, guest_id: Uuid) -> AppResult<()> {
    let Some(guest_cart) = Carts::find()
        .filter(CartCol::GuestId.eq(guest_id))
        .one(&state.orm)
        .await?
    else {
        return Ok(());
    };

    let guest_items = CartItems::find()
        .filter(CartItemCol::CartId.eq(guest_cart.id))
        .all(&state.orm)
        .await?;
    if guest_items.is_empty() {
        return Ok(());
    }

    let user_cart = find_or_create_cart(state, CartOwner::User(user_id)).await?;

    let txn = state.orm.begin().await?;
    for guest_item in &guest_items {
        let existing = CartItems::find()
            .filter(
                Condition::all()
                    .add(CartItemCol::CartId.eq(user_cart.id))
                    .add(CartItemCol::ProductVariantId.eq(guest_item.product_variant_id)),
            )
            .one(&txn)
            .await?;
        match existing {
            Some(item) => {
                let merged = (item.quantity + guest_item.quantity).min(MAX_LINE_QUANTITY);
                let mut active: CartItemActive = item.into();
                active.quantity = Set(merged);
                active.updated_at = Set(chrono::Utc::now().into());
                active.update(&txn).await?;
            }
            None => {
                CartItemActive {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(user_cart.id),
                    product_variant_id: Set(guest_item.product_variant_id),
                    quantity: Set(guest_item.quantity.min(MAX_LINE_QUANTITY)),
                    created_at: NotSet,
                    updated_at: NotSet,
                }
                .insert(&txn)
                .await?;
            }
        }
    }
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(guest_cart.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(%user_id, %guest_id, "merged guest cart into user cart");
    Ok(())
}

async fn find_cart(
    state: &AppState,
    owner: CartOwner,
) -> AppResult<Option<crate::entity::carts::Model>> {
    let finder = match owner {
        CartOwner::User(id) => Carts::find().filter(CartCol::UserId.eq(id)),
        CartOwner::Guest(id) => Carts::find().filter(CartCol::GuestId.eq(id)),
    };
    Ok(finder.one(&state.orm).await?)
}

async fn find_or_create_cart(
    state: &AppState,
    owner: CartOwner,
) -> AppResult<crate::entity::carts::Model> {
    if let Some(cart) = find_cart(state, owner).await? {
        return Ok(cart);
    }

    // The owner row must exist before a cart can hang off it.
    let (user_id, guest_id) = match owner {
        CartOwner::User(id) => {
            Users::find_by_id(id)
                .one(&state.orm)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Please login to continue".into()))?;
            (Some(id), None)
        }
        CartOwner::Guest(id) => {
            Guests::find_by_id(id)
                .one(&state.orm)
                .await?
                .ok_or_else(|| AppError::NotFound("Guest session not found".into()))?;
            (None, Some(id))
        }
    };

    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        guest_id: Set(guest_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(cart)
}

async fn cart_view(state: &AppState, cart_id: Uuid) -> AppResult<CartView> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .find_also_related(ProductVariants)
        .all(&state.orm)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut total_amount = Decimal::ZERO;
    for (item, variant) in rows {
        let variant =
            variant.ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart line lost variant")))?;
        let line_total = variant.mrp * Decimal::from(item.quantity);
        total_amount += line_total;
        items.push(CartLine {
            id: item.id,
            variant: variant.into(),
            quantity: item.quantity,
            line_total,
        });
    }

    Ok(CartView {
        cart_id,
        items,
        total_amount,
    })
}

async fn audit_cart(state: &AppState, owner: CartOwner, action: &str, variant_id: Uuid) {
    let user_id = match owner {
        CartOwner::User(id) => Some(id),
        CartOwner::Guest(_) => None,
    };
    if let Err(err) = log_audit(
        &state.pool,
        user_id,
        action,
        Some("cart_items"),
        Some(serde_json::json!({ "product_variant_id": variant_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}
