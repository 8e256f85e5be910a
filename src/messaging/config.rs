//! Messaging configuration

use serde::{Deserialize, Serialize};

/// NATS subscription for catalog product events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Start the event consumer alongside the HTTP server
    #[serde(default)]
    pub enabled: bool,

    /// NATS server URLs
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Subject carrying product events
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Connection name reported to the NATS server
    #[serde(default = "default_connection_name")]
    pub connection_name: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            servers: default_servers(),
            subject: default_subject(),
            connection_name: default_connection_name(),
        }
    }
}

fn default_servers() -> Vec<String> {
    vec!["nats://localhost:4222".to_string()]
}

fn default_subject() -> String {
    "product.events".to_string()
}

fn default_connection_name() -> String {
    "catalog-search".to_string()
}
