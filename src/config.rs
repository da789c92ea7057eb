// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    // Stripe Checkout
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    // Price of revealing one listing's protected fields, in the smallest currency unit
    pub unlock_fee_cents: i64,
    pub unlock_currency: String,
    // Monthly price of the owner management tools, same currency
    pub subscription_fee_cents: i64,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET must be set");

        let port = env_or("PORT", 8000);
        let database_max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10);
        let unlock_fee_cents = env_or("UNLOCK_FEE_CENTS", 200);
        let subscription_fee_cents = env_or("SUBSCRIPTION_FEE_CENTS", 500);

        let unlock_currency = std::env::var("UNLOCK_CURRENCY")
            .unwrap_or_else(|_| "usd".to_string());
        let stripe_api_base = std::env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());

        Config {
            database_url,
            database_max_connections,
            app_url: app_url.trim_end_matches('/').to_string(),
            jwt_secret,
            port,
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_base,
            unlock_fee_cents,
            unlock_currency,
            subscription_fee_cents,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .unwrap_or_else(|_| panic!("{} must be a valid number", key)),
        Err(_) => default,
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Config {
        Config {
            database_url: "postgres://localhost/propertyhub_test".to_string(),
            database_max_connections: 1,
            app_url: "https://app.example.com".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            port: 0,
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            stripe_api_base: "http://127.0.0.1:9".to_string(),
            unlock_fee_cents: 200,
            unlock_currency: "usd".to_string(),
            subscription_fee_cents: 500,
        }
    }
}
