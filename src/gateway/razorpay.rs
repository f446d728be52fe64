use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue},
};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::config::GatewayConfig;

use super::{
    Beneficiary, GatewayCharge, GatewayError, GatewayOrder, GatewayPayout, GatewayRefund,
    PaymentGateway, to_minor_units,
};

/// Razorpay REST client. All requests carry the configured timeout; a
/// timed-out call is indistinguishable from an explicit failure to the
/// caller, which is what the compensation logic wants.
#[derive(Clone)]
pub struct RazorpayClient {
    config: GatewayConfig,
    client: Client,
}

impl RazorpayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.config.base_url);
        tracing::debug!(%url, "gateway request");
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Json(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .map_err(|e| GatewayError::Request(e.to_string()))?;
            Err(GatewayError::Api { status, message })
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_payment_order(
        &self,
        receipt: &str,
        amount: Decimal,
    ) -> Result<GatewayOrder, GatewayError> {
        let body = json!({
            "amount": to_minor_units(amount)?,
            "currency": "INR",
            "receipt": receipt,
            "payment_capture": 1,
        });
        let order: GatewayOrder = self.post("/orders", &body).await?;
        tracing::info!(gateway_order_id = %order.id, %receipt, "gateway order created");
        Ok(order)
    }

    async fn capture_payment(
        &self,
        gateway_payment_id: &str,
        amount: Decimal,
    ) -> Result<GatewayCharge, GatewayError> {
        let body = json!({
            "amount": to_minor_units(amount)?,
            "currency": "INR",
        });
        let path = format!("/payments/{gateway_payment_id}/capture");
        let charge: GatewayCharge = self.post(&path, &body).await?;
        if charge.status != "captured" {
            return Err(GatewayError::NotCaptured {
                status: charge.status,
            });
        }
        tracing::info!(gateway_payment_id = %charge.id, "payment captured");
        Ok(charge)
    }

    async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        amount: Decimal,
    ) -> Result<GatewayRefund, GatewayError> {
        let body = json!({ "amount": to_minor_units(amount)? });
        let path = format!("/payments/{gateway_payment_id}/refund");
        let refund: GatewayRefund = self.post(&path, &body).await?;
        if refund.status == "failed" {
            return Err(GatewayError::Failed {
                operation: "Refund".into(),
                status: refund.status,
            });
        }
        tracing::info!(refund_id = %refund.id, status = %refund.status, "refund issued");
        Ok(refund)
    }

    async fn payout_to_bank(
        &self,
        beneficiary: &Beneficiary,
        amount: Decimal,
    ) -> Result<GatewayPayout, GatewayError> {
        let body = json!({
            "account_number": self.config.payout_account_number,
            "amount": to_minor_units(amount)?,
            "currency": "INR",
            "mode": "UPI",
            "purpose": "refund",
            "fund_account": {
                "account_type": "vpa",
                "vpa": { "address": beneficiary.vpa },
                "contact": {
                    "name": beneficiary.name,
                    "contact": beneficiary.contact,
                    "email": beneficiary.email,
                },
            },
            "queue_if_low_balance": true,
        });
        let payout: GatewayPayout = self.post("/payouts", &body).await?;
        if matches!(payout.status.as_str(), "failed" | "rejected" | "cancelled") {
            return Err(GatewayError::Failed {
                operation: "Payout".into(),
                status: payout.status,
            });
        }
        tracing::info!(payout_id = %payout.id, status = %payout.status, "payout issued");
        Ok(payout)
    }

    async fn credit_wallet(
        &self,
        gateway_payment_id: &str,
        amount: Decimal,
    ) -> Result<GatewayRefund, GatewayError> {
        let body = json!({
            "payment_id": gateway_payment_id,
            "amount": to_minor_units(amount)?,
            "speed": "normal",
        });
        let refund: GatewayRefund = self.post("/refunds", &body).await?;
        if refund.status == "failed" {
            return Err(GatewayError::Failed {
                operation: "Wallet credit".into(),
                status: refund.status,
            });
        }
        tracing::info!(refund_id = %refund.id, status = %refund.status, "wallet credit issued");
        Ok(refund)
    }
}
