use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use sea_orm::{ConnectOptions, Database};
use tracing::info;

use fivecrowns_backend::config::AppConfig;
use fivecrowns_backend::mailer::LogMailer;
use fivecrowns_backend::{routes, telemetry, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = AppConfig::from_env().unwrap_or_else(|err| {
        eprintln!("configuration error: {err}");
        std::process::exit(1);
    });

    let mut connect = ConnectOptions::new(config.database_url.clone());
    connect.sqlx_logging(false);
    let db = Database::connect(connect).await.unwrap_or_else(|err| {
        eprintln!("database connection failed: {err}");
        std::process::exit(1);
    });

    let mailer = Arc::new(LogMailer::new(config.smtp.clone()));
    let app_state = AppState::new(db, &config, mailer);

    // Active games come back to life before the first socket connects.
    match app_state.games.rehydrate_active().await {
        Ok(count) => info!(count, "rehydrated active games"),
        Err(err) => tracing::error!(error = %err, "failed to rehydrate active games"),
    }

    let listen_port = config.listen_port;
    info!(listen_port, "starting fivecrowns backend");

    let data = web::Data::new(app_state.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", listen_port))?
    .run();

    let result = server.await;

    // Drain game queues (pending events persist), then drop the sockets.
    app_state.games.shutdown();
    let closed = app_state.hub.close_all();
    info!(closed, "server shut down");

    result
}
