use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity;
use crate::entity::enums::{
    OrderItemStatus, OrderStatus, PaymentMethod, PaymentStatus, RefundStatus,
};

/// Public view of a user; never carries the password hash or any
/// verification tokens.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<entity::users::Model> for User {
    fn from(m: entity::users::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            phone: m.phone,
            role: m.role,
            email_verified: m.email_verified,
            phone_verified: m.phone_verified,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<entity::addresses::Model> for Address {
    fn from(m: entity::addresses::Model) -> Self {
        Self {
            id: m.id,
            street: m.street,
            city: m.city,
            state: m.state,
            postal_code: m.postal_code,
            country: m.country,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<entity::categories::Model> for Category {
    fn from(m: entity::categories::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub garment_type: String,
    pub care: String,
    pub created_at: DateTime<Utc>,
}

impl From<entity::products::Model> for Product {
    fn from(m: entity::products::Model) -> Self {
        Self {
            id: m.id,
            category_id: m.category_id,
            name: m.name,
            description: m.description,
            garment_type: m.garment_type,
            care: m.care,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: String,
    pub color: String,
    pub fit: String,
    pub mrp: Decimal,
    pub stock_quantity: i32,
}

impl From<entity::product_variants::Model> for ProductVariant {
    fn from(m: entity::product_variants::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            size: m.size,
            color: m.color,
            fit: m.fit,
            mrp: m.mrp,
            stock_quantity: m.stock_quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub cancellation_reason: Option<String>,
    pub refund_status: Option<RefundStatus>,
    pub delivery_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::orders::Model> for Order {
    fn from(m: entity::orders::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            shipping_address_id: m.shipping_address_id,
            payment_method: m.payment_method,
            total_amount: m.total_amount,
            status: m.status,
            cancellation_reason: m.cancellation_reason,
            refund_status: m.refund_status,
            delivery_attempts: m.delivery_attempts,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_variant_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub status: OrderItemStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::order_items::Model> for OrderItem {
    fn from(m: entity::order_items::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            product_variant_id: m.product_variant_id,
            quantity: m.quantity,
            price: m.price,
            status: m.status,
            cancellation_reason: m.cancellation_reason,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
}

impl From<entity::payments::Model> for Payment {
    fn from(m: entity::payments::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            amount: m.amount,
            status: m.status,
            gateway_order_id: m.gateway_order_id,
            gateway_payment_id: m.gateway_payment_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::reviews::Model> for Review {
    fn from(m: entity::reviews::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            product_id: m.product_id,
            rating: m.rating,
            comment: m.comment,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_amount: Decimal,
    pub expiry_date: DateTime<Utc>,
    pub minimum_purchase_amount: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<entity::coupons::Model> for Coupon {
    fn from(m: entity::coupons::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            discount_amount: m.discount_amount,
            expiry_date: m.expiry_date.with_timezone(&Utc),
            minimum_purchase_amount: m.minimum_purchase_amount,
            is_active: m.is_active,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}
