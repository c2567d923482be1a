use chrono::FixedOffset;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// PostgreSQL always listens on the standard port in every deployment we run.
pub const POSTGRES_PORT: u16 = 5432;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cors: CorsSettings,
    #[serde(default)]
    pub errors: ErrorSettings,
    #[serde(default)]
    pub reporting: ReportingSettings,
}

/// Where the HTTP server listens and how much it accepts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    /// Largest request body accepted, in bytes.
    pub body_limit_bytes: usize,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Connection parameters for the PostgreSQL pool.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub user: String,
    pub host: String,
    pub name: String,
    pub password: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Encrypt the connection. The hosting provider's certificate chain is not
    /// verified.
    pub require_tls: bool,
    pub acquire_timeout_secs: u64,
    /// Applied to every statement and every transaction as a whole.
    pub query_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn port(&self) -> u16 {
        POSTGRES_PORT
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            host: "localhost".to_string(),
            name: "capstone".to_string(),
            password: String::new(),
            max_connections: 20,
            require_tls: true,
            acquire_timeout_secs: 5,
            query_timeout_secs: 10,
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("name", &self.name)
            .field("password", &"***")
            .field("max_connections", &self.max_connections)
            .field("require_tls", &self.require_tls)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .finish()
    }
}

/// The front end served in local development.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Cross-origin policy for the map front end.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    /// The single front-end origin allowed to call the API.
    pub allowed_origin: String,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

/// How shake history is cut into days for the movement chart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportingSettings {
    /// Offset from UTC, in minutes, of the local day boundary (540 for KST).
    pub utc_offset_minutes: i32,
}

impl ReportingSettings {
    /// The offset as a chrono value, or `None` when it is not a valid offset.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

/// Controls how much of an internal failure is shown to clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorSettings {
    /// Include the underlying driver message as `details` in 500 responses.
    pub expose_details: bool,
}
