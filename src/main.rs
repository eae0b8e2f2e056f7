use std::sync::Arc;

use cal_seat_relay::{
    api,
    config::AppConfig,
    dedup::{memory::MemorySeenBookings, SeenBookings},
    provider::{http::HttpBookingApi, BookingApi},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cal_seat_relay=info,tower_http=info".into()),
        )
        .init();

    let config =
        AppConfig::from_env().map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;

    let provider: Option<Arc<dyn BookingApi>> = match HttpBookingApi::from_config(&config)? {
        Some(api) => Some(Arc::new(api)),
        None => {
            tracing::warn!("CAL_API_KEY is not set, multi-seat bookings will be rejected");
            None
        }
    };
    if config.webhook_secret.is_none() && config.workflow_token.is_none() {
        tracing::warn!(
            "neither CAL_WEBHOOK_SECRET nor WORKFLOW_TOKEN is set, every webhook will be rejected"
        );
    }
    let seen: Option<Arc<dyn SeenBookings>> = config
        .dedup_ttl
        .map(|ttl| Arc::new(MemorySeenBookings::new(ttl)) as Arc<dyn SeenBookings>);

    let bind_addr = config.bind_addr.clone();
    let app = api::router(api::AppState {
        config: Arc::new(config),
        provider,
        seen,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
