//! Access links handed to customers. A link is a random token whose claim
//! lives in Redis until it expires; the customer site resolves it through
//! `/validate-token` and a modification link additionally authorizes
//! `PATCH /order/:id` for the order it names.

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

pub const TOKEN_LENGTH: usize = 32;
const KEY_PREFIX: &str = "link:";

/// What a link token stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkClaim {
    pub name: String,
    pub phone: String,
    #[serde(rename = "orderId", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i32>,
}

impl LinkClaim {
    /// True when the link was issued for modifying exactly this order
    pub fn authorizes_order(&self, order_id: i32) -> bool {
        self.order_id == Some(order_id)
    }
}

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn cache_key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

/// Tokens are plain alphanumerics; anything else is rejected before Redis
/// is consulted
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// URL of the customer page a claim opens
pub fn link_url(base_url: &str, token: &str, claim: &LinkClaim) -> String {
    let base = base_url.trim_end_matches('/');
    match claim.order_id {
        Some(order_id) => format!("{base}/order/{order_id}/modify?token={token}"),
        None => format!("{base}/order?token={token}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_well_formed() {
        let a = generate_token();
        let b = generate_token();
        assert!(is_well_formed(&a));
        assert!(is_well_formed(&b));
        assert_ne!(a, b);
        assert!(!is_well_formed("short"));
        assert!(!is_well_formed(&format!("{}!", &a[..31])));
    }

    #[test]
    fn test_link_urls() {
        let order_link = LinkClaim {
            name: "Asha".into(),
            phone: "9876543210".into(),
            order_id: None,
        };
        assert_eq!(
            link_url("https://shop.example/", "abc", &order_link),
            "https://shop.example/order?token=abc"
        );

        let modify_link = LinkClaim {
            order_id: Some(12),
            ..order_link
        };
        assert_eq!(
            link_url("https://shop.example", "abc", &modify_link),
            "https://shop.example/order/12/modify?token=abc"
        );
        assert!(modify_link.authorizes_order(12));
        assert!(!modify_link.authorizes_order(13));
    }

    #[test]
    fn test_claim_wire_format() {
        let claim: LinkClaim =
            serde_json::from_str(r#"{"name":"Ravi","phone":"99","orderId":4}"#).unwrap();
        assert_eq!(claim.order_id, Some(4));

        let without_order = LinkClaim {
            order_id: None,
            ..claim
        };
        assert_eq!(
            serde_json::to_string(&without_order).unwrap(),
            r#"{"name":"Ravi","phone":"99"}"#
        );
    }
}
