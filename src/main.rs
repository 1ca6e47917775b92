use std::net::SocketAddr;

use rallypoint::{router, store, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rallypoint=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = store::connect(&config).await?;
    store::run_migrations(&db_pool).await?;
    store::activities::seed_defaults(&db_pool).await?;

    let app = router(AppState::new(db_pool), &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
