use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Shared key an admin must also present when recording an offline sale.
    pub manual_order_key: String,
    pub whatsapp_purwakarta: String,
    pub whatsapp_wanayasa: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let manual_order_key = env::var("MANUAL_ORDER_KEY")
            .map_err(|_| anyhow::anyhow!("MANUAL_ORDER_KEY is not set"))?;
        let whatsapp_purwakarta =
            env::var("WA_NUMBER_PURWAKARTA").unwrap_or_else(|_| "628118894690".to_string());
        let whatsapp_wanayasa =
            env::var("WA_NUMBER_WANAYASA").unwrap_or_else(|_| "6282246907899".to_string());
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            manual_order_key,
            whatsapp_purwakarta,
            whatsapp_wanayasa,
        })
    }
}
