//! Websocket upgrade endpoint. Authentication happens on the socket via
//! `cmd.hello`, not at upgrade time, so reconnecting clients can open the
//! socket before their token refresh round-trips.

use actix_web::web;

use crate::ws::session;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(session::upgrade));
}
