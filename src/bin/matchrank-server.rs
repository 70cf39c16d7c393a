//! Matchrank HTTP server binary

use matchrank::{EngineConfig, MatchEngine};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 8081;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; RUST_LOG overrides the default level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .init();

    println!("Matchrank candidate matching server");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = EngineConfig::from_env()?;
    println!(
        "✓ top_k={} test_fraction={} seed={}",
        config.top_k, config.test_fraction, config.seed
    );

    let port = match std::env::var("MATCHRANK_PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("invalid MATCHRANK_PORT {raw:?}: {e}"))?,
        Err(_) => DEFAULT_PORT,
    };

    let engine = MatchEngine::new(config);

    println!("✓ Listening on port {}", port);
    println!("  GET  /health");
    println!("  POST /match");
    println!();

    matchrank::server::run_server(engine, port).await
}
