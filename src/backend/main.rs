/**
 * Collabris Server Entry Point
 *
 * This is the main entry point for the Collabris backend server.
 * It loads configuration from the environment and serves the HTTP API and
 * the realtime WebSocket endpoint.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use collabris::backend::server::{config::ServerConfig, create_app};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,collabris=debug".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Server initialization started");

    let config = ServerConfig::from_env();
    let port = config.port;
    let app = create_app(config).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("[STARTUP] Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin collabris-server --features ssr");
    std::process::exit(1);
}
