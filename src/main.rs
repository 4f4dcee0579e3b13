use std::sync::Arc;
use std::time::Duration;

use lead_scout::api::{ApiState, api_routes};
use lead_scout::auth::PhoneVerifier;
use lead_scout::channels::{DeliveryChannel, SmsChannel};
use lead_scout::config::{ServerConfig, SmsConfig};
use lead_scout::jobs;
use lead_scout::qualify::ConversationProcessor;
use lead_scout::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env();

    eprintln!("🏠 Lead Scout v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}", config.port);

    // ── Database ─────────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(db_path).await.unwrap_or_else(
        |e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        },
    ));
    eprintln!("   Database: {}", config.db_path);

    // ── SMS channel (optional) ───────────────────────────────────────
    let channel: Option<Arc<dyn DeliveryChannel>> = match SmsConfig::from_env() {
        Some(sms) => {
            eprintln!("   SMS: enabled (from {})", sms.from_number);
            Some(Arc::new(SmsChannel::new(sms)))
        }
        None => {
            eprintln!("   SMS: not configured — OTP codes are logged, not sent");
            None
        }
    };

    // ── Core components ──────────────────────────────────────────────
    let verifier = Arc::new(PhoneVerifier::new(Arc::clone(&db), channel));
    let processor = Arc::new(ConversationProcessor::new(Arc::clone(&db)));

    // Spawn the (placeholder) listing match sweep
    let _sweep_handle = jobs::spawn_match_sweep(
        Arc::clone(&db),
        Duration::from_secs(config.sweep_interval_secs),
    );

    // ── HTTP server ──────────────────────────────────────────────────
    let app = api_routes(ApiState { verifier, processor });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
