use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    config::logger::init();

    let cfg = config::get_config();
    if let Err(err) = infra::db::init().await {
        tracing::error!(target: "webpods::main", error = %err, "failed to initialize database");
        std::process::exit(1);
    }
    infra::storage::init();

    tracing::info!(
        target: "webpods::main",
        bind = %cfg.server.bind_addr,
        port = cfg.server.port,
        server_host = %cfg.server.server_host,
        "starting webpods"
    );

    tokio::spawn(webpods::job::rate_limit_reaper::run());
    tokio::spawn(webpods::job::cache_reporter::run());

    HttpServer::new(|| {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .configure(webpods::handler::http::router::configure)
    })
    .bind((cfg.server.bind_addr.as_str(), cfg.server.port))?
    .run()
    .await
}
