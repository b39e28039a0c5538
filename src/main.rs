use std::{net::TcpListener, sync::Arc, time::Duration};

use env_logger::Env;
use pagescout::{
    configuration::get_configuration,
    dal::{PgStore, Store},
    services::{Broadcaster, DroidFactory, Orchestrator},
    startup::run,
};
use sqlx::postgres::PgPoolOptions;
use tokio::runtime::Handle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration()?;

    let pool_options = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .max_lifetime(None);

    let connection_pool = pool_options.connect_lazy_with(configuration.database.with_db());
    sqlx::migrate!("./migrations").run(&connection_pool).await?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(connection_pool));
    let broadcaster = Arc::new(Broadcaster::new());
    let droid_factory = Arc::new(DroidFactory::new(&configuration.scraper.webdriver_url));
    let orchestrator = Orchestrator::new(
        store.clone(),
        broadcaster.clone(),
        droid_factory,
        &configuration.scraper,
        Handle::current(),
    );

    log::info!(
        "Listening on {} with {} browser workers",
        address,
        configuration.scraper.workers
    );
    run(
        listener,
        store,
        orchestrator.clone(),
        broadcaster,
        configuration.scraper,
    )?
    .await?;

    orchestrator.shutdown().await;
    Ok(())
}
