use dotenvy::dotenv;
use posting_service::config::PostingConfig;
use posting_service::startup::Application;
use service_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = PostingConfig::load().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    posting_service::services::metrics::init_metrics();

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
