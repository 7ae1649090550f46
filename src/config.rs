use std::time::Duration;

use clap::Parser;

/// Command line / environment configuration for the proxy.
#[derive(Debug, Clone, Parser)]
#[command(name = "mongo-proxy")]
#[command(about = "REST proxy forwarding CRUD requests to MongoDB")]
pub struct ProxyConfig {
    #[arg(long, env = "PROXY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PROXY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Further ports tried (port+1, port+2, ...) when the port is taken
    #[arg(long, env = "PROXY_PORT_RETRIES", default_value_t = 10)]
    pub port_retries: u16,

    #[arg(long, env = "PROXY_BODY_LIMIT", default_value_t = 10 * 1024 * 1024)]
    pub body_limit: usize,

    /// Overrides connectTimeoutMS from the connection string
    #[arg(long, env = "PROXY_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Overrides serverSelectionTimeoutMS from the connection string
    #[arg(long, env = "PROXY_SERVER_SELECTION_TIMEOUT_MS")]
    pub server_selection_timeout_ms: Option<u64>,

    #[arg(long, env = "PROXY_APP_NAME", default_value = "mongo-proxy")]
    pub app_name: String,

    #[arg(long, env = "PROXY_LOG_JSON", help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            port_retries: 10,
            body_limit: 10 * 1024 * 1024,
            connect_timeout_ms: None,
            server_selection_timeout_ms: None,
            app_name: "mongo-proxy".to_string(),
            log_json: false,
            verbose: false,
        }
    }
}

impl ProxyConfig {
    pub fn connect_settings(&self) -> ConnectSettings {
        ConnectSettings {
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            server_selection_timeout: self.server_selection_timeout_ms.map(Duration::from_millis),
            app_name: Some(self.app_name.clone()),
        }
    }
}

/// Driver options applied on top of every per-request connection string.
#[derive(Debug, Clone, Default)]
pub struct ConnectSettings {
    pub connect_timeout: Option<Duration>,
    pub server_selection_timeout: Option<Duration>,
    pub app_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser() {
        let parsed = ProxyConfig::parse_from(["mongo-proxy"]);
        let default = ProxyConfig::default();
        assert_eq!(parsed.host, default.host);
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.port_retries, default.port_retries);
        assert_eq!(parsed.body_limit, default.body_limit);
        assert_eq!(parsed.app_name, default.app_name);
        assert!(parsed.connect_timeout_ms.is_none());
    }

    #[test]
    fn test_connect_settings_from_flags() {
        let config = ProxyConfig::parse_from([
            "mongo-proxy",
            "--port",
            "8080",
            "--server-selection-timeout-ms",
            "250",
        ]);
        assert_eq!(config.port, 8080);

        let settings = config.connect_settings();
        assert_eq!(settings.server_selection_timeout, Some(Duration::from_millis(250)));
        assert_eq!(settings.connect_timeout, None);
        assert_eq!(settings.app_name.as_deref(), Some("mongo-proxy"));
    }
}
