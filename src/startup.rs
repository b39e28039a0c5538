use std::{net::TcpListener, sync::Arc};

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};

use crate::{
    configuration::ScraperSettings,
    dal::Store,
    routes::{api_scope, configure_extractors, default_route},
    services::{Broadcaster, Orchestrator},
};

pub fn run(
    listener: TcpListener,
    store: Arc<dyn Store>,
    orchestrator: Orchestrator,
    broadcaster: Arc<Broadcaster>,
    scraper_settings: ScraperSettings,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn Store> = web::Data::from(store);
    let orchestrator = web::Data::new(orchestrator);
    let broadcaster = web::Data::from(broadcaster);
    let scraper_settings = web::Data::new(scraper_settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure_extractors)
            .service(default_route::default)
            .service(api_scope())
            .app_data(store.clone())
            .app_data(orchestrator.clone())
            .app_data(broadcaster.clone())
            .app_data(scraper_settings.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
