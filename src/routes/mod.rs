use actix_web::web;

pub mod auth;
pub mod friends;
pub mod games;
pub mod health;
pub mod notifications;
pub mod realtime;
pub mod users;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure_routes)
        .configure(auth::configure_routes)
        .configure(games::configure_routes)
        .configure(friends::configure_routes)
        .configure(notifications::configure_routes)
        .configure(users::configure_routes)
        .configure(realtime::configure_routes);
}
