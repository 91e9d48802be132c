use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the hospital assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub assistant: AssistantConfig,
    pub transport: TransportConfig,
    pub auth: AuthConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Artificial delay applied to every repository call
    pub simulated_latency_ms: u64,
    /// Seed the store with the sample hospitals
    pub seed_sample_data: bool,
}

/// Which inference backend answers questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote extractive-QA inference endpoint
    Http,
    /// In-process lexical extractive QA
    Lexical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub backend: BackendKind,
    /// Inference task name passed to the backend
    pub task: String,
    /// Model identifier passed to the backend
    pub model: String,
    pub device: String,
    /// Answers with score strictly above this are shown verbatim (0.0-1.0)
    pub confidence_threshold: f64,
    /// Delay before the automatic model load
    pub load_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the inference endpoint
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signed-in users with an email in this domain are admins
    pub admin_domain: String,
    #[serde(default)]
    pub operator_id: Option<String>,
    #[serde(default)]
    pub operator_email: Option<String>,
    #[serde(default)]
    pub operator_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub path: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        for path in ["../.env", ".env"] {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                break;
            }
        }

        let config_path =
            env::var("HOSPITAL_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(&config_path);
        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn from_file(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(latency) = lookup("HOSPITAL_STORE_LATENCY_MS") {
            if let Ok(ms) = latency.parse() {
                self.store.simulated_latency_ms = ms;
            }
        }
        if let Some(seed) = lookup("HOSPITAL_STORE_SEED") {
            if let Ok(seed) = seed.parse() {
                self.store.seed_sample_data = seed;
            }
        }

        // Assistant overrides
        if let Some(backend) = lookup("QA_BACKEND") {
            match backend.to_lowercase().as_str() {
                "http" => self.assistant.backend = BackendKind::Http,
                "lexical" => self.assistant.backend = BackendKind::Lexical,
                other => tracing::warn!("Unknown QA_BACKEND '{}' - keeping {:?}", other, self.assistant.backend),
            }
        }
        if let Some(model) = lookup("QA_MODEL") {
            self.assistant.model = model;
        }
        if let Some(threshold) = lookup("QA_CONFIDENCE_THRESHOLD") {
            if let Ok(value) = threshold.parse() {
                self.assistant.confidence_threshold = value;
            }
        }
        if let Some(delay) = lookup("QA_LOAD_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.assistant.load_delay_ms = ms;
            }
        }

        // Transport overrides
        if let Some(endpoint) = lookup("QA_ENDPOINT") {
            self.transport.endpoint = endpoint;
        }
        if let Some(api_key) = lookup("QA_API_KEY") {
            self.transport.api_key = Some(api_key);
        }

        // Auth overrides
        if let Some(domain) = lookup("HOSPITAL_ADMIN_DOMAIN") {
            self.auth.admin_domain = domain;
        }
        if let Some(id) = lookup("HOSPITAL_OPERATOR_ID") {
            self.auth.operator_id = Some(id);
        }
        if let Some(email) = lookup("HOSPITAL_OPERATOR_EMAIL") {
            self.auth.operator_email = Some(email);
        }

        // HTTP overrides
        if let Some(bind) = lookup("HOSPITAL_HTTP_BIND") {
            self.http.bind = bind;
        }
        if let Some(path) = lookup("HOSPITAL_HTTP_PATH") {
            self.http.path = path;
        }
        if let Some(token) = lookup("HOSPITAL_BEARER_TOKEN") {
            self.http.bearer_token = Some(token);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !(0.0..=1.0).contains(&self.assistant.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".into());
        }
        if self.transport.retry.max_attempts == 0 {
            return Err("Retry max_attempts cannot be 0".into());
        }
        if self.transport.retry.initial_delay_ms > self.transport.retry.max_delay_ms {
            return Err("Retry initial_delay_ms cannot exceed max_delay_ms".into());
        }
        if self.assistant.backend == BackendKind::Http && self.transport.endpoint.is_empty() {
            return Err("QA_ENDPOINT must be set for the http backend".into());
        }
        if self.auth.admin_domain.is_empty() {
            return Err("Admin domain cannot be empty".into());
        }
        Ok(())
    }

    pub fn store_latency(&self) -> Duration {
        Duration::from_millis(self.store.simulated_latency_ms)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.assistant.load_delay_ms)
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "hospital-assistant".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            store: StoreConfig {
                simulated_latency_ms: 500,
                seed_sample_data: true,
            },
            assistant: AssistantConfig {
                backend: BackendKind::Lexical,
                task: "question-answering".to_string(),
                model: "Xenova/distilbert-base-uncased-distilled-squad".to_string(),
                device: "cpu".to_string(),
                confidence_threshold: 0.1,
                load_delay_ms: 1000,
            },
            transport: TransportConfig {
                endpoint: "https://api-inference.huggingface.co".to_string(),
                api_key: None,
                timeout_seconds: 30,
                retry: RetryConfig {
                    max_attempts: 3,
                    initial_delay_ms: 200,
                    max_delay_ms: 5000,
                },
            },
            auth: AuthConfig {
                admin_domain: "hospital-admin.com".to_string(),
                operator_id: None,
                operator_email: None,
                operator_name: None,
            },
            http: HttpConfig {
                bind: "127.0.0.1:8788".to_string(),
                path: "/mcp".to_string(),
                bearer_token: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.assistant.confidence_threshold, 0.1);
        assert_eq!(cfg.assistant.task, "question-answering");
        assert_eq!(cfg.load_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        cfg.apply_overrides(overrides(&[
            ("QA_BACKEND", "HTTP"),
            ("QA_CONFIDENCE_THRESHOLD", "0.25"),
            ("QA_LOAD_DELAY_MS", "0"),
            ("HOSPITAL_STORE_LATENCY_MS", "not-a-number"),
            ("HOSPITAL_OPERATOR_EMAIL", "ops@hospital-admin.com"),
        ]));
        assert_eq!(cfg.assistant.backend, BackendKind::Http);
        assert_eq!(cfg.assistant.confidence_threshold, 0.25);
        assert_eq!(cfg.assistant.load_delay_ms, 0);
        assert_eq!(cfg.store.simulated_latency_ms, 500);
        assert_eq!(
            cfg.auth.operator_email.as_deref(),
            Some("ops@hospital-admin.com")
        );
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut cfg = Config::default();
        cfg.assistant.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_keeps_backend_kind() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("backend: lexical"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.assistant.backend, BackendKind::Lexical);
    }
}
