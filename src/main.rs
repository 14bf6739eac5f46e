use anyhow::Context;
use medibook::config::get_configuration;
use medibook::startup::Application;
use medibook::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("medibook".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let config = get_configuration().context("Failed to read configuration")?;
    let application = Application::build(config).await?;
    tracing::info!(port = application.port(), "Listening");
    application.run_until_stopped().await?;

    Ok(())
}
