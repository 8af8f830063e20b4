use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub currency: String,
    pub payment: PaymentConfig,
}

/// Provider settings for the payment aggregator. When `api_url` is absent the
/// service runs against the built-in sandbox gateway.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub callback_token: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let cors_origin = env::var("CORS_ALLOWED_ORIGIN").ok().filter(|s| !s.is_empty());
        let currency = env::var("CURRENCY").unwrap_or_else(|_| "XOF".to_string());

        let payment = PaymentConfig {
            api_url: env::var("PAYMENT_API_URL").ok().filter(|s| !s.is_empty()),
            api_key: env::var("PAYMENT_API_KEY").ok().filter(|s| !s.is_empty()),
            callback_token: env::var("PAYMENT_CALLBACK_TOKEN")
                .unwrap_or_else(|_| "sandbox-callback-token".to_string()),
        };

        Ok(Self {
            database_url,
            host,
            port,
            cors_origin,
            currency,
            payment,
        })
    }
}
