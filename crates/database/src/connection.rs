use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

/// Translates the application settings into driver connection options.
///
/// With `require_tls` the connection is always encrypted but the server
/// certificate is not verified; the hosting provider presents a chain our
/// trust store does not know.
pub fn connect_options(settings: &DatabaseSettings) -> PgConnectOptions {
    let ssl_mode = if settings.require_tls {
        PgSslMode::Require
    } else {
        PgSslMode::Prefer
    };

    PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port())
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.name)
        .ssl_mode(ssl_mode)
}

/// Establishes a connection pool to the PostgreSQL database.
///
/// The pool is created once at startup and shared by every request; close it
/// with `PgPool::close` during shutdown.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect_with(connect_options(settings))
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    tracing::info!(
        host = %settings.host,
        database = %settings.name,
        max_connections = settings.max_connections,
        tls = settings.require_tls,
        "Database pool established."
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_the_settings() {
        let settings = DatabaseSettings {
            user: "facility".to_string(),
            host: "pg.example.com".to_string(),
            name: "capstone".to_string(),
            ..DatabaseSettings::default()
        };
        let options = connect_options(&settings);

        assert_eq!(options.get_host(), "pg.example.com");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "facility");
        assert_eq!(options.get_database(), Some("capstone"));
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));
    }

    #[test]
    fn tls_can_be_relaxed_to_prefer() {
        let settings = DatabaseSettings {
            require_tls: false,
            ..DatabaseSettings::default()
        };
        assert!(matches!(connect_options(&settings).get_ssl_mode(), PgSslMode::Prefer));
    }
}
