use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/api";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub additional_base_paths: Vec<String>,
    pub enable_swagger: bool,
}

/// Connection details for the external identity provider plus the redirect
/// targets handed to it for OAuth and password-reset flows.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: String,
    pub oauth_redirect_url: String,
    pub password_reset_redirect_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            additional_base_paths: Vec::new(),
            enable_swagger: false,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9999/auth/v1".to_string(),
            api_key: String::new(),
            oauth_redirect_url: "http://localhost:3000/auth/callback".to_string(),
            password_reset_redirect_url: "http://localhost:3000/reset-password".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
            api: ApiConfig::default(),
            identity: IdentityConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Carelink.toml (base configuration file)
    /// 3. Environment variables (prefixed with CARELINK_)
    pub fn load() -> Result<Self, figment::Error> {
        let figment = Figment::new()
            .merge(Toml::string(&toml::to_string(&Config::default()).unwrap()))
            .merge(Toml::file("Carelink.toml"))
            .merge(Env::prefixed("CARELINK_").split("_"));

        figment.extract()
    }
}
