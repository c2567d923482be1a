use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, CorsSettings, DEFAULT_ALLOWED_ORIGIN, DatabaseSettings, ErrorSettings, POSTGRES_PORT,
    ReportingSettings, ServerSettings,
};

/// Prefix for structured environment overrides, e.g. `FACILITY__SERVER__PORT`.
const ENV_PREFIX: &str = "FACILITY";

/// Plain variables the deployment scripts have always set, mapped onto their
/// configuration keys. They win over every other source.
const LEGACY_DB_VARS: [(&str, &str); 6] = [
    ("DB_USER", "database.user"),
    ("DB_HOST", "database.host"),
    ("DB_NAME", "database.name"),
    ("DB_PASSWORD", "database.password"),
    ("DB_MAX_CONNECTIONS", "database.max_connections"),
    ("DB_SSL", "database.require_tls"),
];

/// Loads the application configuration.
///
/// Reads `.env` if present, then layers built-in defaults, an optional
/// `config.toml` in the working directory and the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    load_config_with(Path::new("config.toml"), std::env::vars().collect())
}

/// Builds the configuration from an explicit file path and environment map.
///
/// A missing file is not an error.
pub fn load_config_with(
    file: &Path,
    env: HashMap<String, String>,
) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::from(file).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

    for (var, key) in LEGACY_DB_VARS {
        builder = builder.set_override_option(key, env.get(var).cloned())?;
    }

    let config = builder.build()?.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(database = ?config.database, server = ?config.server, "Configuration loaded.");
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let db = &config.database;
    let required = [("database.user", &db.user), ("database.host", &db.host), ("database.name", &db.name)];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{key} must not be empty")));
        }
    }
    if db.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }
    if db.query_timeout_secs == 0 || db.acquire_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "database timeouts must be greater than zero".to_string(),
        ));
    }
    let origin = config.cors.allowed_origin.trim();
    if origin.is_empty() || origin == "*" {
        return Err(ConfigError::ValidationError(
            "cors.allowed_origin must name a single origin".to_string(),
        ));
    }
    if config.reporting.offset().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "reporting.utc_offset_minutes {} is not a valid UTC offset",
            config.reporting.utc_offset_minutes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn missing_file() -> std::path::PathBuf {
        tempfile::tempdir().unwrap().path().join("absent.toml")
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let config = load_config_with(&missing_file(), HashMap::new()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 20);
        assert!(config.database.require_tls);
        assert_eq!(config.database.port(), 5432);
        assert!(!config.errors.expose_details);
        assert_eq!(config.cors.allowed_origin, DEFAULT_ALLOWED_ORIGIN);
        assert_eq!(config.reporting.utc_offset_minutes, 0);
    }

    #[test]
    fn file_values_are_read() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n[database]\nhost = \"db.internal\"\n[cors]\nallowed_origin = \"https://map.example.com\""
        )
        .unwrap();

        let config = load_config_with(file.path(), HashMap::new()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.cors.allowed_origin, "https://map.example.com");
    }

    #[test]
    fn prefixed_environment_overrides_defaults() {
        let config = load_config_with(
            &missing_file(),
            env(&[("FACILITY__ERRORS__EXPOSE_DETAILS", "true"), ("FACILITY__SERVER__PORT", "4000")]),
        )
        .unwrap();
        assert!(config.errors.expose_details);
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn legacy_db_variables_take_precedence() {
        let config = load_config_with(
            &missing_file(),
            env(&[
                ("FACILITY__DATABASE__USER", "ignored"),
                ("DB_USER", "facility"),
                ("DB_HOST", "pg.example.com"),
                ("DB_NAME", "facility_db"),
                ("DB_PASSWORD", "secret"),
                ("DB_MAX_CONNECTIONS", "5"),
                ("DB_SSL", "false"),
            ]),
        )
        .unwrap();
        assert_eq!(config.database.user, "facility");
        assert_eq!(config.database.host, "pg.example.com");
        assert_eq!(config.database.name, "facility_db");
        assert_eq!(config.database.password, "secret");
        assert_eq!(config.database.max_connections, 5);
        assert!(!config.database.require_tls);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let result = load_config_with(&missing_file(), env(&[("DB_MAX_CONNECTIONS", "0")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let config = load_config_with(&missing_file(), env(&[("DB_PASSWORD", "hunter2")])).unwrap();
        assert!(!format!("{:?}", config.database).contains("hunter2"));
    }

    #[test]
    fn wildcard_or_blank_origin_is_rejected() {
        for origin in ["*", "  "] {
            let result = load_config_with(&missing_file(), env(&[("FACILITY__CORS__ALLOWED_ORIGIN", origin)]));
            assert!(matches!(result, Err(ConfigError::ValidationError(_))), "origin {origin:?}");
        }
    }

    #[test]
    fn reporting_offset_is_read_and_bounded() {
        let config =
            load_config_with(&missing_file(), env(&[("FACILITY__REPORTING__UTC_OFFSET_MINUTES", "540")])).unwrap();
        assert_eq!(config.reporting.offset().map(|o| o.local_minus_utc()), Some(9 * 3600));

        let result = load_config_with(&missing_file(), env(&[("FACILITY__REPORTING__UTC_OFFSET_MINUTES", "1440")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
