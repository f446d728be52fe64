use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CancelItemsRequest, CancelOrderRequest, CancelOutcome, CancelRole, CheckoutRequest,
        CheckoutResponse, OrderList, OrderWithItems, RefundMethod, RefundType, ReturnItemRequest,
    },
    entity::{
        addresses::{Column as AddressCol, Entity as Addresses},
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        enums::{OrderItemStatus, OrderStatus, PaymentMethod, PaymentStatus, RefundStatus},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    gateway::{Beneficiary, GatewayError},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Window after delivery during which an item may still be returned.
const RETURN_WINDOW_DAYS: i64 = 7;

/// Failed delivery attempts after which the `auto` role may cancel.
const AUTO_CANCEL_ATTEMPTS: i32 = 3;

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Checkout: materialize Order + OrderItems + Payment from the cart
/// snapshot in one transaction, then (for prepaid methods) run the
/// gateway capture as a post-commit side effect. Capture failure rolls
/// the whole order back via a compensating delete; the cart is only
/// cleared once the order is fully paid for (or COD), so a failed
/// prepaid checkout can simply be retried.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let actor = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Please login to continue".into()))?;
    if !actor.email_verified {
        return Err(AppError::Unauthorized("Please verify your email".into()));
    }
    if !actor.phone_verified {
        return Err(AppError::Unauthorized("Please verify your phone".into()));
    }

    // No ordering dependency between the cart and address reads.
    let (cart, address) = tokio::join!(
        Carts::find()
            .filter(CartCol::UserId.eq(user.user_id))
            .one(&state.orm),
        Addresses::find()
            .filter(AddressCol::UserId.eq(user.user_id))
            .one(&state.orm),
    );
    let cart = cart?.ok_or_else(|| AppError::NotFound("Cart not found".into()))?;
    let address = address?.ok_or_else(|| AppError::NotFound("Shipping address not found".into()))?;

    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .all(&txn)
        .await?;
    if lines.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }

    let variant_ids: Vec<Uuid> = lines.iter().map(|l| l.product_variant_id).collect();
    let variants = ProductVariants::find()
        .filter(VariantCol::Id.is_in(variant_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let variants: HashMap<Uuid, _> = variants.into_iter().map(|v| (v.id, v)).collect();

    let mut total_amount = Decimal::ZERO;
    for line in &lines {
        let variant = variants
            .get(&line.product_variant_id)
            .ok_or_else(|| AppError::NotFound("Product variant not found".into()))?;
        if variant.stock_quantity < line.quantity {
            return Err(AppError::Validation(format!(
                "Insufficient stock for variant {}",
                variant.id
            )));
        }
        // Price frozen at checkout: current MRP, never live-referenced again.
        total_amount += variant.mrp * Decimal::from(line.quantity);
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        shipping_address_id: Set(address.id),
        payment_method: Set(payload.payment_method),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        cancellation_reason: Set(None),
        refund_status: Set(None),
        delivery_attempts: Set(0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    let mut stock_taken: Vec<(Uuid, i32)> = Vec::with_capacity(lines.len());
    for line in &lines {
        let variant = &variants[&line.product_variant_id];
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_variant_id: Set(variant.id),
            quantity: Set(line.quantity),
            price: Set(variant.mrp),
            status: Set(OrderItemStatus::Pending),
            cancellation_reason: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(item.into());

        ProductVariants::update_many()
            .col_expr(
                VariantCol::StockQuantity,
                Expr::col(VariantCol::StockQuantity).sub(line.quantity),
            )
            .filter(VariantCol::Id.eq(variant.id))
            .exec(&txn)
            .await?;
        stock_taken.push((variant.id, line.quantity));
    }

    let mut payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(total_amount),
        status: Set(PaymentStatus::Pending),
        gateway_order_id: Set(None),
        gateway_payment_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    match payload.payment_method {
        PaymentMethod::CashOnDelivery => {
            // Funds collected at delivery; the Payment row stays Pending
            // with no gateway interaction.
            clear_cart_items(state, cart.id).await?;
        }
        PaymentMethod::Razorpay => {
            match capture(state, order.id, total_amount).await {
                Ok((gateway_order_id, gateway_payment_id)) => {
                    let mut active: PaymentActive = payment.into();
                    active.status = Set(PaymentStatus::Completed);
                    active.gateway_order_id = Set(Some(gateway_order_id));
                    active.gateway_payment_id = Set(Some(gateway_payment_id));
                    active.updated_at = Set(Utc::now().into());
                    payment = active.update(&state.orm).await?;
                    clear_cart_items(state, cart.id).await?;
                }
                Err(err) => {
                    tracing::warn!(order_id = %order.id, error = %err, "capture failed, rolling back order");
                    if let Err(rollback_err) =
                        rollback_failed_checkout(state, order.id, &stock_taken).await
                    {
                        tracing::error!(
                            order_id = %order.id,
                            error = %rollback_err,
                            "compensating rollback failed"
                        );
                    }
                    return Err(err.into());
                }
            }
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "payment_method": payload.payment_method })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created successfully",
        CheckoutResponse {
            order: order.into(),
            items,
            payment: payment.into(),
        },
        Some(Meta::empty()),
    ))
}

/// Gateway leg of checkout: register the order, then capture against it.
async fn capture(
    state: &AppState,
    order_id: Uuid,
    amount: Decimal,
) -> Result<(String, String), GatewayError> {
    let gateway_order = state
        .gateway
        .create_payment_order(&order_id.to_string(), amount)
        .await?;
    let charge = state.gateway.capture_payment(&gateway_order.id, amount).await?;
    Ok((gateway_order.id, charge.id))
}

/// Compensating delete for a prepaid checkout whose capture failed:
/// payment, items and the order row all go, and the stock decrements are
/// reversed. Runs in its own transaction so the rollback is all-or-nothing.
async fn rollback_failed_checkout(
    state: &AppState,
    order_id: Uuid,
    stock_taken: &[(Uuid, i32)],
) -> AppResult<()> {
    let txn = state.orm.begin().await?;

    for (variant_id, quantity) in stock_taken {
        ProductVariants::update_many()
            .col_expr(
                VariantCol::StockQuantity,
                Expr::col(VariantCol::StockQuantity).add(*quantity),
            )
            .filter(VariantCol::Id.eq(*variant_id))
            .exec(&txn)
            .await?;
    }

    Payments::delete_many()
        .filter(PaymentCol::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order_id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!(%order_id, "rolled back order after capture failure");
    Ok(())
}

async fn clear_cart_items(state: &AppState, cart_id: Uuid) -> AppResult<()> {
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart_id))
        .exec(&state.orm)
        .await?;
    Ok(())
}

/// Cancel a whole order. If a completed payment exists the refund runs
/// first; a refund failure leaves the order exactly as it was.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<CancelOutcome>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    if payload.role == CancelRole::Buyer && order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    if order.status == OrderStatus::Cancelled {
        return Err(AppError::Conflict("Order is already cancelled".into()));
    }

    if payload.role == CancelRole::Auto && order.delivery_attempts < AUTO_CANCEL_ATTEMPTS {
        return Err(AppError::Validation(format!(
            "Auto-cancellation requires {AUTO_CANCEL_ATTEMPTS} failed delivery attempts"
        )));
    }

    let reason = cancellation_reason(payload.role, payload.reason.as_deref())?;

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;

    let mut refund_status = None;
    if let Some(payment) = &payment {
        if payment.status == PaymentStatus::Completed {
            let gateway_payment_id = payment.gateway_payment_id.as_deref().ok_or_else(|| {
                AppError::Upstream("Completed payment has no gateway payment id".into())
            })?;
            // Nothing has been persisted yet, so a refund failure here
            // surfaces with the order untouched.
            state
                .gateway
                .refund_payment(gateway_payment_id, payment.amount)
                .await?;
            refund_status = Some(RefundStatus::Processed);
        }
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.cancellation_reason = Set(Some(reason));
    if refund_status.is_some() {
        active.refund_status = Set(refund_status);
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "role": payload.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        CancelOutcome {
            order_id: order.id,
            status: order.status,
            cancellation_reason: order.cancellation_reason,
            refund_status: order.refund_status,
        },
        Some(Meta::empty()),
    ))
}

fn cancellation_reason(role: CancelRole, reason: Option<&str>) -> Result<String, AppError> {
    let supplied = reason
        .map(str::trim)
        .filter(|r| !r.is_empty());
    match role {
        CancelRole::Auto => Ok("Auto-cancelled due to 3 failed delivery attempts".into()),
        CancelRole::Buyer => supplied
            .map(|r| format!("Cancelled by buyer: {r}"))
            .ok_or_else(|| AppError::Validation("Cancellation reason is required".into())),
        CancelRole::DeliveryPartner => supplied
            .map(|r| format!("Cancelled by delivery partner: {r}"))
            .ok_or_else(|| AppError::Validation("Cancellation reason is required".into())),
    }
}

/// Cancel a subset of an order's items. The id list must match the order
/// exactly or nothing changes. The refund, when due, covers the sum of
/// the cancelled items' stored prices, never a recomputation.
pub async fn cancel_order_items(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: CancelItemsRequest,
) -> AppResult<ApiResponse<CancelOutcome>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let mut item_ids = payload.item_ids;
    item_ids.sort_unstable();
    item_ids.dedup();
    if item_ids.is_empty() {
        return Err(AppError::Validation("item_ids must not be empty".into()));
    }

    let items = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::Id.is_in(item_ids.clone()))
                .add(OrderItemCol::OrderId.eq(order.id)),
        )
        .all(&state.orm)
        .await?;
    if items.len() != item_ids.len() {
        // At least one requested id does not belong to this order; the
        // whole request is rejected and no item is touched.
        return Err(AppError::NotFound("Some order items not found".into()));
    }
    if items.iter().any(|i| {
        matches!(
            i.status,
            OrderItemStatus::Cancelled | OrderItemStatus::Returned
        )
    }) {
        // Re-cancelling an item would dispatch its refund again.
        return Err(AppError::Conflict(
            "Some order items are already cancelled or returned".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    OrderItems::update_many()
        .col_expr(OrderItemCol::Status, Expr::value(OrderItemStatus::Cancelled))
        .col_expr(
            OrderItemCol::CancellationReason,
            Expr::value(Some(payload.reason.clone())),
        )
        .col_expr(OrderItemCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(OrderItemCol::Id.is_in(item_ids.clone()))
        .exec(&txn)
        .await?;

    let remaining = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(OrderItemCol::Status.ne(OrderItemStatus::Cancelled)),
        )
        .count(&txn)
        .await?;

    let mut active: OrderActive = order.into();
    if remaining == 0 {
        active.status = Set(OrderStatus::Cancelled);
        active.cancellation_reason =
            Set(Some(format!("All items cancelled: {}", payload.reason)));
    }
    active.updated_at = Set(Utc::now().into());
    let mut order = active.update(&txn).await?;

    txn.commit().await?;

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;
    if let Some(payment) = &payment {
        if payment.status == PaymentStatus::Completed {
            let gateway_payment_id = payment.gateway_payment_id.as_deref().ok_or_else(|| {
                AppError::Upstream("Completed payment has no gateway payment id".into())
            })?;
            // Aggregated stored prices of the cancelled items, not the
            // order total and not current catalog prices.
            let refund_amount: Decimal = items.iter().map(|i| i.price).sum();
            state
                .gateway
                .refund_payment(gateway_payment_id, refund_amount)
                .await?;

            let mut active: OrderActive = order.into();
            active.refund_status = Set(Some(RefundStatus::Processed));
            active.updated_at = Set(Utc::now().into());
            order = active.update(&state.orm).await?;
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_items_cancel",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order.id, "item_ids": item_ids })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order items cancelled successfully",
        CancelOutcome {
            order_id: order.id,
            status: order.status,
            cancellation_reason: order.cancellation_reason,
            refund_status: order.refund_status,
        },
        Some(Meta::empty()),
    ))
}

/// Return a delivered item within the 7-day window, dispatching the
/// refund over the caller-selected channel (or none, for a replacement).
pub async fn return_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: ReturnItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let window_start = Utc::now() - Duration::days(RETURN_WINDOW_DAYS);
    let item = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(OrderItemCol::ProductVariantId.eq(payload.product_variant_id))
                .add(OrderItemCol::Status.eq(OrderItemStatus::Delivered))
                .add(OrderItemCol::UpdatedAt.gte(window_start)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Order item not found or not eligible for return".into())
        })?;

    let message = match payload.refund_method {
        RefundMethod::Replacement => "Replacement processed",
        RefundMethod::Refund => {
            let refund_type = payload
                .refund_type
                .ok_or_else(|| AppError::Validation("refund_type is required for refunds".into()))?;
            dispatch_refund(state, user, order.id, &item, refund_type, payload.upi_id).await?
        }
    };

    let mut active: OrderItemActive = item.into();
    active.status = Set(OrderItemStatus::Returned);
    active.cancellation_reason = Set(Some(payload.reason));
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_item_return",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order.id, "order_item_id": item.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(message, item.into(), Some(Meta::empty())))
}

/// Route the refund for a returned item. Every failure propagates as an
/// upstream error; nothing is swallowed.
async fn dispatch_refund(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    item: &crate::entity::order_items::Model,
    refund_type: RefundType,
    upi_id: Option<String>,
) -> AppResult<&'static str> {
    match refund_type {
        RefundType::Razorpay => {
            let payment_id = completed_gateway_payment_id(state, order_id).await?;
            state
                .gateway
                .refund_payment(&payment_id, item.price)
                .await?;
            Ok("Refund processed via Razorpay")
        }
        RefundType::Bank => {
            let vpa = upi_id
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .ok_or_else(|| {
                    AppError::Validation("UPI ID is required for bank transfer".into())
                })?;
            let actor = Users::find_by_id(user.user_id)
                .one(&state.orm)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Please login to continue".into()))?;
            let beneficiary = Beneficiary {
                name: format!("{} {}", actor.first_name, actor.last_name),
                contact: actor.phone,
                email: actor.email,
                vpa,
            };
            state
                .gateway
                .payout_to_bank(&beneficiary, item.price)
                .await?;
            Ok("Refund processed via UPI bank transfer")
        }
        RefundType::Wallet => {
            let payment_id = completed_gateway_payment_id(state, order_id).await?;
            state.gateway.credit_wallet(&payment_id, item.price).await?;
            Ok("Refund processed to wallet")
        }
    }
}

async fn completed_gateway_payment_id(state: &AppState, order_id: Uuid) -> AppResult<String> {
    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".into()))?;
    if payment.status != PaymentStatus::Completed {
        return Err(AppError::Conflict(
            "No completed payment to refund against".into(),
        ));
    }
    payment
        .gateway_payment_id
        .ok_or_else(|| AppError::Upstream("Completed payment has no gateway payment id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buyer_cancellation_uses_buyer_template() {
        let reason = cancellation_reason(CancelRole::Buyer, Some("wrong size")).unwrap();
        assert_eq!(reason, "Cancelled by buyer: wrong size");
    }

    #[test]
    fn delivery_partner_cancellation_uses_partner_template() {
        let reason =
            cancellation_reason(CancelRole::DeliveryPartner, Some("address unreachable")).unwrap();
        assert_eq!(reason, "Cancelled by delivery partner: address unreachable");
    }

    #[test]
    fn auto_cancellation_ignores_supplied_reason() {
        let reason = cancellation_reason(CancelRole::Auto, Some("whatever")).unwrap();
        assert_eq!(reason, "Auto-cancelled due to 3 failed delivery attempts");
    }

    #[test]
    fn buyer_cancellation_requires_a_reason() {
        assert!(cancellation_reason(CancelRole::Buyer, None).is_err());
        assert!(cancellation_reason(CancelRole::Buyer, Some("   ")).is_err());
    }
}
