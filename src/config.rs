use std::env;

/// Credentials for the external payment processor.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server key used to verify webhook signatures.
    pub server_key: String,
}

/// Environment-driven configuration for the order core.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    /// Inbox that receives chat alerts.
    pub admin_email: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            gateway: GatewayConfig {
                server_key: env::var("ATELIER_GATEWAY_SERVER_KEY")
                    .unwrap_or_else(|_| "sandbox-server-key".to_string()),
            },
            admin_email: env::var("ATELIER_ADMIN_EMAIL")
                .unwrap_or_else(|_| "studio@atelier.example".to_string()),
        }
    }
}
