use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Credentials for the Twilio WhatsApp channel.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub site_url: String,
    pub store_name: String,
    pub store_name_hindi: String,
    pub whatsapp: WhatsAppConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "agrimart".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "agrimart-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let whatsapp = WhatsAppConfig {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            from_number: std::env::var("TWILIO_WHATSAPP_NUMBER").unwrap_or_default(),
        };
        Ok(Self {
            database_url,
            jwt,
            site_url: std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".into()),
            store_name: std::env::var("STORE_NAME")
                .unwrap_or_else(|_| "Mithlesh Krishi Kendra Nawanagar".into()),
            store_name_hindi: std::env::var("STORE_NAME_HINDI")
                .unwrap_or_else(|_| "मिथलेश कृषि केंद्र नवानगर".into()),
            whatsapp,
        })
    }
}
