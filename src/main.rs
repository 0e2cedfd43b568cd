use std::sync::Arc;

use order_portal::config::PortalConfig;
use order_portal::gateway::OrderGateway;
use order_portal::intake::intake_routes;
use order_portal::messaging::{OutboundClient, WhatsAppClient};
use order_portal::storage::UploadStore;

#[tokio::main]
async fn main() -> order_portal::error::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Set the WhatsApp credentials before starting:");
            eprintln!("  export WHATSAPP_PHONE_NUMBER_ID=...");
            eprintln!("  export WHATSAPP_ACCESS_TOKEN=...");
            eprintln!("  export WHATSAPP_RECIPIENT=...");
            return Err(e.into());
        }
    };

    eprintln!("🛒 Order Portal v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Recipient: {}", config.messaging.recipient);
    eprintln!(
        "   API: {}/{}",
        config.messaging.api_base_url, config.messaging.api_version
    );
    eprintln!("   Uploads: {}", config.upload_dir.display());
    eprintln!("   Intake API: http://0.0.0.0:{}/api/orders\n", config.port);

    // ── Upload directory ────────────────────────────────────────────────
    let store = UploadStore::new(config.upload_dir.clone());
    store.ensure_dir().await?;

    // ── Gateway ─────────────────────────────────────────────────────────
    let client: Arc<dyn OutboundClient> = Arc::new(WhatsAppClient::new(config.messaging));
    let gateway = Arc::new(OrderGateway::new(client, store));

    // ── Server ──────────────────────────────────────────────────────────
    let app = intake_routes(gateway);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Order intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
