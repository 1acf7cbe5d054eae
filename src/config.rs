use std::env;

use rust_decimal::Decimal;

use crate::pricing::{DEFAULT_FEE_RATE, DEFAULT_SHIPPING_TOTAL};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory backend.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    /// Proportional fee (taxes) added to the cart subtotal.
    pub fee_rate: Decimal,
    /// Shipping charge given to newly created orders.
    pub shipping_total: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fee_rate: DEFAULT_FEE_RATE,
            shipping_total: DEFAULT_SHIPPING_TOTAL,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let secure_cookies = env::var("SESSION_SECURE_COOKIE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);
        let fee_rate = env::var("CART_FEE_RATE")
            .ok()
            .and_then(|v| v.parse::<Decimal>().ok())
            .unwrap_or(DEFAULT_FEE_RATE);
        let shipping_total = env::var("ORDER_SHIPPING_TOTAL")
            .ok()
            .and_then(|v| v.parse::<Decimal>().ok())
            .unwrap_or(DEFAULT_SHIPPING_TOTAL);
        Ok(Self {
            port,
            database_url,
            host,
            secure_cookies,
            pricing: PricingConfig {
                fee_rate,
                shipping_total,
            },
        })
    }
}
