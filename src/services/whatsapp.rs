use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::db::models::{Booking, Order};
use crate::errors::ApiError;
use crate::Result;

const REQUEST_TIMEOUT_SECONDS: u64 = 15;

/// Relay for WhatsApp Cloud API text messages. Without credentials every
/// message is logged and reported as not sent.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    endpoint: Option<String>,
    token: Option<String>,
}

impl WhatsAppClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        let endpoint = match (&config.whatsapp_api_url, &config.whatsapp_phone_number_id) {
            (Some(base), Some(phone_id)) => Some(format!(
                "{}/{}/messages",
                base.trim_end_matches('/'),
                phone_id
            )),
            _ => None,
        };

        Ok(Self {
            client,
            endpoint,
            token: config.whatsapp_token.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.token.is_some()
    }

    /// Sends a text message. Returns whether the API accepted it.
    pub async fn send_text(&self, phone: &str, body: &str) -> Result<bool> {
        let to = normalize_phone(phone);
        if to.is_empty() {
            return Err(ApiError::Validation(
                "Recipient phone number has no digits".to_string(),
            ));
        }

        let (Some(endpoint), Some(token)) = (&self.endpoint, &self.token) else {
            tracing::info!("WhatsApp relay not configured, message to {}: {}", to, body);
            return Ok(false);
        };

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!("WhatsApp message sent to {}", to);
            Ok(true)
        } else {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("WhatsApp API rejected message to {}: {} {}", to, status, detail);
            Err(ApiError::Custom(format!("WhatsApp API returned {status}")))
        }
    }
}

/// Digits only, as the Cloud API expects
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

pub fn order_confirmation(order: &Order, modify_link: Option<&str>) -> String {
    let mut message = format!(
        "Hi {}, we received your order #{} (total {:.2}). We will update you once it is verified.",
        order.user_name, order.id, order.total_price
    );
    if let Some(link) = modify_link {
        message.push_str(&format!(" You can change it while it is pending here: {link}"));
    }
    message
}

pub fn access_link(name: &str, url: &str) -> String {
    format!("Hi {name}, use this link to continue with your order: {url}")
}

pub fn checkin_reminder(booking: &Booking) -> String {
    format!(
        "Hi {}, a reminder that your {} room booking #{} starts on {} at {}. See you soon!",
        booking.guest_name,
        booking.room_type,
        booking.id,
        booking.check_in_date,
        booking.check_in_time
    )
}

pub fn checkout_reminder(booking: &Booking) -> String {
    format!(
        "Hi {}, checkout for booking #{} is today at {}. Please settle any pending payment at the front desk.",
        booking.guest_name, booking.id, booking.check_out_time
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 98765-43210"), "919876543210");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[tokio::test]
    async fn test_unconfigured_relay_only_logs() {
        let client = WhatsAppClient::from_config(&Config::for_tests()).unwrap();
        assert!(!client.is_configured());
        assert!(!client.send_text("9876543210", "hello").await.unwrap());
        assert!(matches!(
            client.send_text("n/a", "hello").await,
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_endpoint_from_config() {
        let mut config = Config::for_tests();
        config.whatsapp_api_url = Some("https://graph.example/v19.0/".into());
        config.whatsapp_phone_number_id = Some("1234".into());
        config.whatsapp_token = Some("t".into());
        let client = WhatsAppClient::from_config(&config).unwrap();
        assert!(client.is_configured());
        assert_eq!(
            client.endpoint.as_deref(),
            Some("https://graph.example/v19.0/1234/messages")
        );
    }
}
