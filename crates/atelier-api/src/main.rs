mod api_doc;
mod auth;
mod error;
mod handlers;
mod setup;
mod state;

use atelier_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    setup::telemetry::init_telemetry();

    // Initialize the application (database, storage, services, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Periodic reconciliation sweep, when configured. The handle is dropped
    // on shutdown together with the runtime.
    let _sweep_task = (config.reconcile_interval_secs > 0)
        .then(|| state.reconcile.clone().start(config.reconcile_interval_secs));

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
