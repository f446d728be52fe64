use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::enums::{OrderStatus, PaymentMethod, RefundStatus};
use crate::models::{Order, OrderItem, Payment};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
}

/// Who is cancelling; each role has its own guard and reason template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelRole {
    Buyer,
    Auto,
    DeliveryPartner,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub role: CancelRole,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelItemsRequest {
    pub item_ids: Vec<Uuid>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    Refund,
    Replacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefundType {
    Razorpay,
    Bank,
    Wallet,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnItemRequest {
    pub product_variant_id: Uuid,
    pub reason: String,
    pub refund_method: RefundMethod,
    /// Required when `refund_method` is `refund`.
    pub refund_type: Option<RefundType>,
    /// Required for the `bank` refund type.
    pub upi_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Payment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelOutcome {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub cancellation_reason: Option<String>,
    pub refund_status: Option<RefundStatus>,
}
