use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use review_core::{MAX_FILE_SIZE, MIN_REVIEWS_FOR_DISPLAY, TROLL_VOTE_THRESHOLD};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// HS256 secret shared with the auth provider that issues user tokens.
    pub auth_jwt_secret: Option<String>,
    pub admin: AdminConfig,
    pub min_reviews_for_display: usize,
    pub troll_vote_threshold: u32,
    pub max_upload_bytes: u64,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// bcrypt hash of the shared admin password
    pub password_hash: Option<String>,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    Http,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "http" => Some(Self::Http),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub dir: PathBuf,
    pub public_url: String,
    pub api_url: Option<String>,
    pub service_key: Option<String>,
    pub bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            dir: PathBuf::from("./uploads"),
            public_url: "http://localhost:3000/uploads".to_string(),
            api_url: None,
            service_key: None,
            bucket: "course-files".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info".to_string(),
            auth_jwt_secret: None,
            admin: AdminConfig::default(),
            min_reviews_for_display: MIN_REVIEWS_FOR_DISPLAY,
            troll_vote_threshold: TROLL_VOTE_THRESHOLD,
            max_upload_bytes: MAX_FILE_SIZE,
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);
        let host = env_parse::<IpAddr>("HOST").unwrap_or(defaults.host);
        let log_level = env_string("RUST_LOG").unwrap_or(defaults.log_level);

        let storage_defaults = StorageConfig::default();
        let storage = StorageConfig {
            backend: env_string("STORAGE_BACKEND")
                .as_deref()
                .and_then(StorageBackend::parse)
                .unwrap_or(storage_defaults.backend),
            dir: env_string("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(storage_defaults.dir),
            public_url: env_string("STORAGE_PUBLIC_URL").unwrap_or(storage_defaults.public_url),
            api_url: env_string("STORAGE_API_URL"),
            service_key: env_string("STORAGE_SERVICE_KEY"),
            bucket: env_string("STORAGE_BUCKET").unwrap_or(storage_defaults.bucket),
        };

        Self {
            host,
            port,
            log_level,
            auth_jwt_secret: env_string("AUTH_JWT_SECRET"),
            admin: AdminConfig {
                password_hash: env_string("ADMIN_PASSWORD_HASH"),
                jwt_secret: env_string("ADMIN_JWT_SECRET"),
            },
            min_reviews_for_display: env_parse("MIN_REVIEWS_FOR_DISPLAY")
                .unwrap_or(defaults.min_reviews_for_display),
            troll_vote_threshold: env_parse("TROLL_VOTE_THRESHOLD")
                .unwrap_or(defaults.troll_vote_threshold),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            storage,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|value| value.parse::<T>().ok())
}
