use serde::Deserialize;

/// Configuration for the API server
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// PostgreSQL database URL
    pub database_url: String,
    /// Redis URL, used for access links and job heartbeats
    pub redis_url: String,
    /// Port to run the server on
    #[serde(default = "default_port")]
    pub port: u16,
    /// HMAC secret used to sign admin and delivery bearer tokens
    pub jwt_secret: String,
    /// Lifetime of a bearer token
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Lifetime of an order/modification access link
    #[serde(default = "default_link_ttl_seconds")]
    pub link_ttl_seconds: u64,
    /// Base URL of the customer-facing site, used when building links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Where uploaded prescriptions are written
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Directory for the rolling audit log
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// WhatsApp Cloud API base URL. Messages are only logged when unset
    pub whatsapp_api_url: Option<String>,
    pub whatsapp_token: Option<String>,
    pub whatsapp_phone_number_id: Option<String>,
    /// How often the checkout reminder sweep runs
    #[serde(default = "default_reminder_interval_seconds")]
    pub reminder_interval_seconds: u64,
    /// Admin account created at startup when no admin with this name exists
    pub bootstrap_admin_username: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_token_ttl_hours() -> i64 {
    12
}

fn default_link_ttl_seconds() -> u64 {
    24 * 60 * 60
}

fn default_public_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_reminder_interval_seconds() -> u64 {
    15 * 60
}

#[cfg(test)]
impl Config {
    /// Configuration pointing at unreachable backends, for tests that never
    /// touch Postgres or Redis
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost:1/unused".to_string(),
            redis_url: "redis://127.0.0.1:1".to_string(),
            port: default_port(),
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: default_token_ttl_hours(),
            link_ttl_seconds: default_link_ttl_seconds(),
            public_base_url: default_public_base_url(),
            upload_dir: std::env::temp_dir().display().to_string(),
            log_dir: std::env::temp_dir().display().to_string(),
            whatsapp_api_url: None,
            whatsapp_token: None,
            whatsapp_phone_number_id: None,
            reminder_interval_seconds: default_reminder_interval_seconds(),
            bootstrap_admin_username: None,
            bootstrap_admin_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_keys() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "postgres://db".to_string()),
            ("REDIS_URL".to_string(), "redis://cache".to_string()),
            ("JWT_SECRET".to_string(), "s3cret".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl_hours, 12);
        assert_eq!(config.link_ttl_seconds, 86400);
        assert!(config.whatsapp_api_url.is_none());
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "postgres://db".to_string()),
            ("REDIS_URL".to_string(), "redis://cache".to_string()),
        ];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
