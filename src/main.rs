use clap::{Parser, Subcommand};
use database::{DbRepository, FacilityStore};
use std::net::IpAddr;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=info,sqlx=warn";

/// The entry point for the facility management backend.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the guard alive for the whole run so buffered lines get flushed.
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(writer)
        .init();

    let cli = Cli::parse();
    let mut settings = configuration::load_config()?;

    match cli.command {
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                settings.server.host = host;
            }
            if let Some(port) = args.port {
                settings.server.port = port;
            }
            web_server::run_server(settings).await?;
        }
        Commands::CheckDb => {
            let pool = database::connect(&settings.database).await?;
            let repo = DbRepository::new(pool, settings.database.query_timeout());
            let result = repo.server_time().await;
            repo.close().await;
            let time = result?;
            tracing::info!(%time, "Database connection successful.");
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// REST backend for campus safety equipment and facility markers.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API until interrupted.
    Serve(ServeArgs),
    /// Connect to the database once and print its clock.
    CheckDb,
}

#[derive(Parser)]
struct ServeArgs {
    /// Address to bind, overriding `server.host`.
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to bind, overriding `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["facility", "serve", "--host", "127.0.0.1", "--port", "8080"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.host, Some("127.0.0.1".parse().unwrap()));
                assert_eq!(args.port, Some(8080));
            }
            Commands::CheckDb => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_check_db() {
        let cli = Cli::try_parse_from(["facility", "check-db"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckDb));
    }
}
