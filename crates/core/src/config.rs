use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `QUEST_ENGINE__` and TOML config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngagementConfig {
    /// Bounded capacity of the inbound scoring queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Interval of the background recompute that ages activities out of
    /// the weekly/monthly counters.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    /// Clamp displayed point totals at zero. The stored counters are
    /// never clamped, so corrective activities stay fully accounted.
    #[serde(default = "default_clamp_display_totals")]
    pub clamp_display_totals: bool,
}

/// Credentials for source apps allowed to post integration events.
/// When the list is empty the check is skipped (development mode).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegrationsConfig {
    #[serde(default)]
    pub apps: Vec<AppCredential>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppCredential {
    pub app_id: String,
    pub app_secret: String,
}

impl IntegrationsConfig {
    pub fn verify(&self, app_id: &str, app_secret: &str) -> bool {
        if self.apps.is_empty() {
            return true;
        }
        self.apps
            .iter()
            .any(|c| c.app_id == app_id && c.app_secret == app_secret)
    }
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_queue_capacity() -> usize {
    65_536
}
fn default_maintenance_interval_secs() -> u64 {
    60
}
fn default_clamp_display_totals() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            clamp_display_totals: default_clamp_display_totals(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            engagement: EngagementConfig::default(),
            integrations: IntegrationsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("QUEST_ENGINE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.metrics.port, 9091);
        assert!(config.engagement.clamp_display_totals);
    }

    #[test]
    fn test_empty_credential_list_is_open() {
        let integrations = IntegrationsConfig::default();
        assert!(integrations.verify("chat_app", "anything"));
    }

    #[test]
    fn test_credential_check() {
        let integrations = IntegrationsConfig {
            apps: vec![AppCredential {
                app_id: "chat_app".into(),
                app_secret: "s3cret".into(),
            }],
        };
        assert!(integrations.verify("chat_app", "s3cret"));
        assert!(!integrations.verify("chat_app", "wrong"));
        assert!(!integrations.verify("forum_app", "s3cret"));
    }
}
