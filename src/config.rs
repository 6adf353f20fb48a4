//! Configuration module

use std::env;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_URL: &str = "sqlite://vlan_data.db?mode=rwc";
const DEFAULT_TOPIC_FILTER: &str = "smartcity/#";
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// SQLite URL of the assignment history sink
    pub database_url: String,

    /// Write every classification to the history sink
    pub persist_enabled: bool,

    /// Subscription filter applied to inbound telemetry topics
    pub mqtt_topic: String,

    /// Bounded inbound telemetry queue
    pub ingest_queue_capacity: usize,

    /// Bounded queue in front of the history writer
    pub sink_queue_capacity: usize,

    /// `json` for structured logs, anything else for plain text
    pub log_format: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            persist_enabled: true,
            mqtt_topic: DEFAULT_TOPIC_FILTER.to_string(),
            ingest_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sink_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_format: "text".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),

            persist_enabled: env::var("PERSIST_ENABLED")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            mqtt_topic: env::var("MQTT_TOPIC")
                .unwrap_or_else(|_| DEFAULT_TOPIC_FILTER.to_string()),

            ingest_queue_capacity: env::var("INGEST_QUEUE_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_CAPACITY)
                .max(1),

            sink_queue_capacity: env::var("SINK_QUEUE_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_CAPACITY)
                .max(1),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}
