use axum::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::config::WhatsAppConfig;

/// Outbound message channel addressed by phone number. Sends are
/// best-effort: callers log failures and never roll back prior writes.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `body` to `phone_number`, returning the provider message id.
    async fn send(&self, phone_number: &str, body: &str) -> anyhow::Result<String>;
}

/// Strip everything but digits from a raw phone number.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Valid numbers are 10-digit Indian mobile numbers.
pub fn is_valid_phone(raw: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
    }
    PHONE_RE.is_match(&normalize_phone(raw))
}

/// WhatsApp delivery through the Twilio Messages API.
#[derive(Clone)]
pub struct TwilioWhatsApp {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioWhatsApp {
    pub fn new(cfg: &WhatsAppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: cfg.account_sid.clone(),
            auth_token: cfg.auth_token.clone(),
            from_number: cfg.from_number.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

#[async_trait]
impl NotificationSink for TwilioWhatsApp {
    async fn send(&self, phone_number: &str, body: &str) -> anyhow::Result<String> {
        anyhow::ensure!(
            is_valid_phone(phone_number),
            "invalid phone number: {}",
            phone_number
        );
        anyhow::ensure!(!body.is_empty(), "empty message body");
        anyhow::ensure!(
            !self.from_number.is_empty(),
            "whatsapp sender number not configured"
        );

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        // Numbers are Indian 10-digit; Twilio wants them in E.164 form.
        let to = format!("whatsapp:+91{}", normalize_phone(phone_number));
        let from = format!("whatsapp:{}", self.from_number);

        let params = [("From", from.as_str()), ("To", to.as_str()), ("Body", body)];
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("twilio send failed: {} {}", status, detail);
        }

        let msg: TwilioMessageResponse = resp.json().await?;
        debug!(sid = %msg.sid, to = %to, "whatsapp message sent");
        Ok(msg.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ten_digit_numbers() {
        assert!(is_valid_phone("9876543210"));
        assert!(is_valid_phone("98765-43210"));
        // country prefix makes it 12 digits
        assert!(!is_valid_phone("+91 98765 43210"));
    }

    #[test]
    fn rejects_short_long_and_empty() {
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("98765432101"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("not-a-number"));
    }

    #[test]
    fn normalize_strips_formatting() {
        assert_eq!(normalize_phone("(987) 654-3210"), "9876543210");
        assert_eq!(normalize_phone("abc"), "");
    }
}
