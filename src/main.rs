use std::net::TcpListener;
use std::sync::Arc;

use barangay_portal::configuration::get_configuration;
use barangay_portal::identity::PgIdentityStore;
use barangay_portal::startup::run;
use barangay_portal::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting barangay portal session service");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    if !configuration.jwt.has_dedicated_refresh_secret() {
        tracing::warn!(
            "JWT_REFRESH_SECRET is not set; refresh tokens are signed with the access \
             secret. Configure a dedicated refresh secret for production deployments."
        );
    }

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    let address = format!(
        "127.0.0.1:{}",
        configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(
        environment = configuration.application.environment.as_str(),
        "Server listening on: {}",
        address
    );

    let store = Arc::new(PgIdentityStore::new(pool));
    let server = run(listener, store, configuration)?;

    let _ = server.await;

    Ok(())
}
