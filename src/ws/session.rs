//! Websocket session actor.
//!
//! A socket must authenticate with `cmd.hello` before anything else; the
//! token is verified and the user resolved against the database, then the
//! connection is registered with the hub. Game commands require a prior
//! `cmd.joinGame`, which pins the game's queue handle in the session so
//! later commands enqueue synchronously in submission order.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::verify_token;
use crate::engine::{GameCommand, GameHandle, PlayerAction};
use crate::repos;
use crate::state::app_state::AppState;
use crate::ws::hub::{Outbound, SessionShutdown};
use crate::ws::protocol::{parse_client_msg, ClientMsg, ServerMsg, WireErrorCode};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);
/// Unauthenticated sockets are closed after this grace.
const AUTH_GRACE: Duration = Duration::from_secs(10);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(app_state);
    ws::start(session, &req, stream)
}

pub struct WsSession {
    conn_id: Uuid,
    app_state: web::Data<AppState>,
    user_id: Option<i64>,
    /// Queue handles for games this socket has joined.
    handles: HashMap<i64, GameHandle>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(app_state: web::Data<AppState>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            app_state,
            user_id: None,
            handles: HashMap::new(),
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "failed to serialize outbound ws message"),
        }
    }

    fn send_error(
        ctx: &mut ws::WebsocketContext<Self>,
        client_seq: Option<u64>,
        code: WireErrorCode,
        message: impl Into<String>,
    ) {
        Self::send_json(
            ctx,
            &ServerMsg::Error {
                client_seq,
                code,
                message: message.into(),
            },
        );
    }

    fn send_error_and_close(
        ctx: &mut ws::WebsocketContext<Self>,
        client_seq: Option<u64>,
        code: WireErrorCode,
        message: impl Into<String>,
    ) {
        Self::send_error(ctx, client_seq, code, message);
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Policy)));
        ctx.stop();
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(
                    conn_id = %actor.conn_id,
                    user_id = actor.user_id,
                    "ws heartbeat timed out"
                );
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn start_auth_grace(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_later(AUTH_GRACE, |actor, ctx| {
            if actor.user_id.is_none() {
                Self::send_error_and_close(
                    ctx,
                    None,
                    WireErrorCode::Unauthenticated,
                    "hello not received in time",
                );
            }
        });
    }

    fn handle_hello(&mut self, ctx: &mut ws::WebsocketContext<Self>, client_seq: u64, token: String) {
        if self.user_id.is_some() {
            Self::send_error(
                ctx,
                Some(client_seq),
                WireErrorCode::BadRequest,
                "already authenticated",
            );
            return;
        }
        let claims = match verify_token(&token, TokenKind::Access, &self.app_state.security) {
            Ok(claims) => claims,
            Err(_) => {
                Self::send_error_and_close(
                    ctx,
                    Some(client_seq),
                    WireErrorCode::Unauthenticated,
                    "invalid or expired token",
                );
                return;
            }
        };
        let Some(user_id) = claims.user_id() else {
            Self::send_error_and_close(
                ctx,
                Some(client_seq),
                WireErrorCode::Unauthenticated,
                "malformed subject claim",
            );
            return;
        };

        // The user row must still exist; a deleted account keeps a valid
        // signature until expiry. ctx.wait keeps inbound order intact.
        let app_state = self.app_state.clone();
        ctx.wait(
            async move { repos::users::find_by_id(app_state.db(), user_id).await }
                .into_actor(self)
                .map(move |result, actor, ctx| match result {
                    Ok(Some(user)) => {
                        actor.user_id = Some(user.id);
                        actor.app_state.hub.register_connection(
                            actor.conn_id,
                            user.id,
                            ctx.address().recipient::<Outbound>(),
                            ctx.address().recipient::<SessionShutdown>(),
                        );
                        Self::send_json(
                            ctx,
                            &ServerMsg::Hello {
                                client_seq,
                                user_id: user.id,
                            },
                        );
                    }
                    Ok(None) => Self::send_error_and_close(
                        ctx,
                        Some(client_seq),
                        WireErrorCode::Unauthenticated,
                        "unknown user",
                    ),
                    Err(err) => {
                        warn!(error = %err, "user lookup failed during hello");
                        Self::send_error_and_close(
                            ctx,
                            Some(client_seq),
                            WireErrorCode::ServerRetry,
                            "temporary failure, reconnect shortly",
                        );
                    }
                }),
        );
    }

    fn handle_join(&mut self, ctx: &mut ws::WebsocketContext<Self>, client_seq: u64, game_id: i64) {
        let Some(user_id) = self.user_id else {
            Self::send_error_and_close(ctx, Some(client_seq), WireErrorCode::Unauthenticated, "hello first");
            return;
        };
        if let Some(handle) = self.handles.get(&game_id) {
            // Re-join is a cheap resync.
            let _ = handle.send(GameCommand::Subscribe {
                conn_id: self.conn_id,
                user_id,
                client_seq,
            });
            return;
        }

        let app_state = self.app_state.clone();
        let conn_id = self.conn_id;
        // ctx.wait: later commands for this game must find the handle.
        ctx.wait(
            async move {
                let is_member = repos::memberships::is_member(app_state.db(), game_id, user_id)
                    .await
                    .unwrap_or(false);
                if !is_member {
                    return Err(WireErrorCode::NotInGame);
                }
                app_state
                    .games
                    .ensure(game_id)
                    .await
                    .map_err(|_| WireErrorCode::ServerRetry)
            }
            .into_actor(self)
            .map(move |result, actor, ctx| match result {
                Ok(handle) => {
                    let _ = handle.send(GameCommand::Subscribe {
                        conn_id,
                        user_id,
                        client_seq,
                    });
                    actor.handles.insert(game_id, handle);
                }
                Err(code) => Self::send_error(ctx, Some(client_seq), code, "cannot join game"),
            }),
        );
    }

    fn handle_game_command(
        &mut self,
        ctx: &mut ws::WebsocketContext<Self>,
        client_seq: u64,
        game_id: i64,
        action: PlayerAction,
    ) {
        let Some(user_id) = self.user_id else {
            Self::send_error_and_close(ctx, Some(client_seq), WireErrorCode::Unauthenticated, "hello first");
            return;
        };
        let Some(handle) = self.handles.get(&game_id) else {
            Self::send_error(
                ctx,
                Some(client_seq),
                WireErrorCode::NotInGame,
                "join the game before sending commands",
            );
            return;
        };
        let sent = handle.send(GameCommand::Play {
            conn_id: self.conn_id,
            user_id,
            client_seq,
            action,
        });
        if sent.is_err() {
            self.handles.remove(&game_id);
            Self::send_error(
                ctx,
                Some(client_seq),
                WireErrorCode::ServerRetry,
                "game queue restarted, re-join the game",
            );
        }
    }

    fn handle_msg(&mut self, ctx: &mut ws::WebsocketContext<Self>, msg: ClientMsg) {
        match msg {
            ClientMsg::Hello { client_seq, token } => self.handle_hello(ctx, client_seq, token),
            ClientMsg::JoinGame {
                client_seq,
                game_id,
            } => self.handle_join(ctx, client_seq, game_id),
            ClientMsg::LeaveGame { game_id, .. } => {
                self.handles.remove(&game_id);
                self.app_state.hub.unsubscribe(self.conn_id, game_id);
            }
            ClientMsg::StartGame {
                client_seq,
                game_id,
            } => self.handle_game_command(ctx, client_seq, game_id, PlayerAction::Start),
            ClientMsg::Draw {
                client_seq,
                game_id,
                source,
            } => self.handle_game_command(ctx, client_seq, game_id, PlayerAction::Draw(source)),
            ClientMsg::LayMelds {
                client_seq,
                game_id,
                melds,
            } => self.handle_game_command(ctx, client_seq, game_id, PlayerAction::LayMelds(melds)),
            ClientMsg::LayOff {
                client_seq,
                game_id,
                target_seat,
                meld_idx,
                cards,
            } => self.handle_game_command(
                ctx,
                client_seq,
                game_id,
                PlayerAction::LayOff {
                    target_seat,
                    meld_idx,
                    cards,
                },
            ),
            ClientMsg::Discard {
                client_seq,
                game_id,
                card,
            } => self.handle_game_command(ctx, client_seq, game_id, PlayerAction::Discard(card)),
            ClientMsg::GoOut {
                client_seq,
                game_id,
                melds,
                discard,
            } => self.handle_game_command(
                ctx,
                client_seq,
                game_id,
                PlayerAction::GoOut { melds, discard },
            ),
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "ws session started");
        self.start_heartbeat(ctx);
        self.start_auth_grace(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if self.user_id.is_some() {
            self.app_state.hub.unregister_connection(self.conn_id);
        }
        info!(conn_id = %self.conn_id, user_id = self.user_id, "ws session stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match parse_client_msg(&text) {
                    Ok(msg) => self.handle_msg(ctx, msg),
                    Err(failure) => {
                        Self::send_error(ctx, None, failure.code, failure.message);
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_error(ctx, None, WireErrorCode::BadRequest, "binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "ws protocol error");
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) -> Self::Result {
        Self::send_json(ctx, &msg.0);
    }
}

impl Handler<SessionShutdown> for WsSession {
    type Result = ();

    fn handle(&mut self, _msg: SessionShutdown, ctx: &mut Self::Context) -> Self::Result {
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Restart)));
        ctx.stop();
    }
}
