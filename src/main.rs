use anyhow::Result;
use tracing_subscriber::EnvFilter;

use citedesk::backend::BackendClient;
use citedesk::{run_server, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut config = AppConfig::from_env();
    let backend = BackendClient::new(config.backend_base_url.clone());

    match backend.frontend_settings().await {
        Ok(settings) => config.apply_frontend_settings(&settings),
        Err(err) => tracing::warn!(
            "frontend settings unavailable, keeping local configuration: {}",
            err
        ),
    }

    run_server(config, backend).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
