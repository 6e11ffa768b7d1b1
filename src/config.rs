use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

const DEV_ADMIN_PASSWORD: &str = "admin123";
const DEV_JWT_SECRET: &str = "capital-charcoal-dev-secret";
const DEV_REFRESH_SECRET: &str = "capital-charcoal-dev-refresh-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown STORE_BACKEND '{0}' (expected json, mongo or memory)")]
    UnknownBackend(String),
    #[error("failed to hash admin password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" | "files" => Ok(StoreBackend::Json),
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

pub struct AppConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub data_dir: PathBuf,
    pub mongo_uri: String,
    pub database_name: String,
    pub admin_password_hash: String,
    pub jwt_secret: String,
    pub refresh_secret: String,
    pub ai: AiConfig,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let store_backend = var_or("STORE_BACKEND", "json").parse()?;

        let admin_password_hash = match env::var("ADMIN_PASSWORD_HASH") {
            Ok(hash) => hash,
            Err(_) => {
                let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, using the development password");
                    DEV_ADMIN_PASSWORD.to_string()
                });
                bcrypt::hash(password, bcrypt::DEFAULT_COST)?
            }
        };

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });
        let refresh_secret = var_or("REFRESH_SECRET", DEV_REFRESH_SECRET);

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(AppConfig {
            bind_addr: var_or("BIND_ADDR", "127.0.0.1:8080"),
            store_backend,
            data_dir: PathBuf::from(var_or("DATA_DIR", "data")),
            mongo_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
            database_name: var_or("DATABASE_NAME", "capital_charcoal"),
            admin_password_hash,
            jwt_secret,
            refresh_secret,
            ai: AiConfig {
                api_key,
                model: var_or("GEMINI_MODEL", "gemini-2.5-flash"),
                base_url: var_or(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com",
                ),
            },
        })
    }
}
