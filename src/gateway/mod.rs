use async_trait::async_trait;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod razorpay;

pub use razorpay::RazorpayClient;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Could not initialize gateway client: {0}")]
    Initialization(String),

    #[error("Gateway request failed: {0}")]
    Request(String),

    #[error("Could not deserialize gateway response: {0}")]
    Json(String),

    #[error("Gateway call failed. Error {status}. {message}")]
    Api { status: u16, message: String },

    #[error("Payment not captured (status {status})")]
    NotCaptured { status: String },

    #[error("{operation} not successful (status {status})")]
    Failed { operation: String, status: String },

    #[error("Invalid currency amount: {0}")]
    InvalidAmount(String),
}

/// Recipient of a UPI payout, used for bank-channel refunds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    pub name: String,
    pub contact: String,
    pub email: String,
    /// UPI virtual payment address, e.g. `name@bank`.
    pub vpa: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCharge {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayout {
    pub id: String,
    pub status: String,
}

/// Seam between the order lifecycle and the payment provider. Amounts
/// cross this boundary as decimal rupees; conversion to paise happens
/// inside the implementation. No operation retries internally.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order with the gateway ahead of capture. `receipt` is
    /// our order id, echoed back in gateway dashboards.
    async fn create_payment_order(
        &self,
        receipt: &str,
        amount: Decimal,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Capture a previously authorized payment. Any status other than
    /// `captured` surfaces as [`GatewayError::NotCaptured`].
    async fn capture_payment(
        &self,
        gateway_payment_id: &str,
        amount: Decimal,
    ) -> Result<GatewayCharge, GatewayError>;

    /// Refund against the original payment (the `razorpay` channel).
    async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        amount: Decimal,
    ) -> Result<GatewayRefund, GatewayError>;

    /// UPI payout to an external bank-linked identifier (the `bank` channel).
    async fn payout_to_bank(
        &self,
        beneficiary: &Beneficiary,
        amount: Decimal,
    ) -> Result<GatewayPayout, GatewayError>;

    /// Credit the shopper's wallet (the `wallet` channel).
    async fn credit_wallet(
        &self,
        gateway_payment_id: &str,
        amount: Decimal,
    ) -> Result<GatewayRefund, GatewayError>;
}

/// Convert decimal rupees to paise. Done once, at the gateway boundary,
/// so intermediate arithmetic never rounds. Amounts finer than one paisa
/// are rejected rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    if amount.is_sign_negative() {
        return Err(GatewayError::InvalidAmount(format!(
            "amount must not be negative: {amount}"
        )));
    }
    let paise = amount * Decimal::new(100, 0);
    if !paise.fract().is_zero() {
        return Err(GatewayError::InvalidAmount(format!(
            "amount has sub-paise precision: {amount}"
        )));
    }
    paise.to_i64().ok_or_else(|| {
        GatewayError::InvalidAmount(format!("amount out of range: {amount}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn whole_rupees_convert_to_paise() {
        assert_eq!(to_minor_units(dec!(1300)).unwrap(), 130_000);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn two_decimal_places_are_exact() {
        assert_eq!(to_minor_units(dec!(499.99)).unwrap(), 49_999);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[test]
    fn sub_paise_amounts_are_rejected() {
        assert!(matches!(
            to_minor_units(dec!(10.005)),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            to_minor_units(dec!(-1)),
            Err(GatewayError::InvalidAmount(_))
        ));
    }
}
