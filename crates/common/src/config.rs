use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level ttlgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            cors: true,
        }
    }
}

/// Settings shared by every in-memory store instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Period of the background sweep that evicts expired entries.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl StoreConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    #[serde(default = "default_code_length")]
    pub length: usize,
    #[serde(default = "default_code_ttl")]
    pub ttl_secs: u64,
    /// Remove a code after the first successful verification.
    #[serde(default = "default_true")]
    pub single_use: bool,
    #[serde(default = "default_delivery")]
    pub delivery: DeliveryMode,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            length: default_code_length(),
            ttl_secs: default_code_ttl(),
            single_use: true,
            delivery: default_delivery(),
        }
    }
}

impl OtpConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Write each code as a line on stdout.
    Console,
    /// Emit each code as a structured log event.
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
    #[serde(default = "default_window")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scope: default_scope(),
            capacity: default_capacity(),
            window_secs: default_window(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

// Default value helpers
fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_true() -> bool {
    true
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_code_length() -> usize {
    6
}
fn default_code_ttl() -> u64 {
    120
}
fn default_delivery() -> DeliveryMode {
    DeliveryMode::Console
}
fn default_scope() -> String {
    "otp".to_string()
}
fn default_capacity() -> i64 {
    10
}
fn default_window() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a YAML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen.is_empty() {
            anyhow::bail!("server.listen must not be empty");
        }

        if self.store.sweep_interval_secs == 0 {
            anyhow::bail!("store.sweep_interval_secs must be positive");
        }

        if self.otp.length == 0 {
            anyhow::bail!("otp.length must be positive");
        }
        if self.otp.ttl_secs == 0 {
            anyhow::bail!("otp.ttl_secs must be positive");
        }

        let rl = &self.rate_limit;
        if rl.capacity <= 0 {
            anyhow::bail!("rate_limit.capacity must be positive (got {})", rl.capacity);
        }
        if rl.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be positive");
        }
        if rl.scope.is_empty() {
            anyhow::bail!("rate_limit.scope must not be empty");
        }

        Ok(())
    }
}
