use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
}

/// Razorpay credentials and connection settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    /// Business account debited for UPI payouts (bank-channel refunds).
    pub payout_account_number: String,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            gateway: GatewayConfig::from_env()?,
        })
    }
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env::var("RAZORPAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());
        let key_id = env::var("RAZORPAY_KEY_ID")?;
        let key_secret = env::var("RAZORPAY_KEY_SECRET")?;
        let payout_account_number = env::var("RAZORPAY_ACCOUNT_NUMBER")?;
        let timeout_secs = env::var("RAZORPAY_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(10);
        Ok(Self {
            base_url,
            key_id,
            key_secret,
            payout_account_number,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
