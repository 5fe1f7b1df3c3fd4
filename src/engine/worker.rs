//! Per-game command worker: the single writer for one game's state.
//!
//! Each live game has exactly one worker task draining an mpsc queue in
//! arrival order. A command is validated against a scratch copy of the
//! state, its event is persisted, and only then does the new state become
//! visible and fan out — so a crash between persist and broadcast loses
//! nothing that a reconnect cannot recover.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::cards::{Card, DECK_SIZE};
use crate::domain::events::GameEvent;
use crate::domain::melds::MeldSpec;
use crate::domain::projection::project_for;
use crate::domain::state::{GameState, GameStatus, Seat};
use crate::errors::domain::DomainError;
use crate::repos;
use crate::ws::hub::WsRegistry;
use crate::ws::protocol::{DrawSource, ServerMsg, WireErrorCode};

const PERSIST_ATTEMPTS: u32 = 3;
const PERSIST_BASE_DELAY_MS: u64 = 50;

/// A game-scoped player action from the wire.
#[derive(Debug, Clone)]
pub enum PlayerAction {
    Start,
    Draw(DrawSource),
    LayMelds(Vec<MeldSpec>),
    LayOff {
        target_seat: Seat,
        meld_idx: usize,
        cards: Vec<Card>,
    },
    Discard(Card),
    GoOut {
        melds: Vec<MeldSpec>,
        discard: Card,
    },
}

/// Everything a game worker consumes from its queue.
#[derive(Debug)]
pub enum GameCommand {
    /// Subscribe a connection and send it the current projection.
    Subscribe {
        conn_id: Uuid,
        user_id: i64,
        client_seq: u64,
    },
    /// A player command routed from a socket.
    Play {
        conn_id: Uuid,
        user_id: i64,
        client_seq: u64,
        action: PlayerAction,
    },
    /// Lobby membership grew (REST invite already wrote the row).
    PlayerJoined { user_id: i64 },
    /// Lobby membership shrank (REST leave already removed the row).
    PlayerLeft { user_id: i64 },
    /// Who holds the turn right now (None unless Active). Serialized with
    /// the command stream so the answer is never stale mid-command.
    QueryTurn {
        reply: tokio::sync::oneshot::Sender<Option<i64>>,
    },
    /// The host deleted the game; notify subscribers and stop.
    GameDeleted,
}

pub struct GameWorker {
    game_id: i64,
    host_user_id: i64,
    state: GameState,
    next_seq: i64,
    degraded: bool,
    db: DatabaseConnection,
    hub: Arc<WsRegistry>,
    rx: mpsc::UnboundedReceiver<GameCommand>,
}

impl GameWorker {
    pub fn new(
        game_id: i64,
        host_user_id: i64,
        state: GameState,
        next_seq: i64,
        db: DatabaseConnection,
        hub: Arc<WsRegistry>,
        rx: mpsc::UnboundedReceiver<GameCommand>,
    ) -> Self {
        Self {
            game_id,
            host_user_id,
            state,
            next_seq,
            degraded: false,
            db,
            hub,
            rx,
        }
    }

    /// Drain the queue until every sender is gone (server shutdown or game
    /// deletion). Commands already enqueued still execute.
    pub async fn run(mut self) {
        info!(game_id = self.game_id, "game worker started");
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                GameCommand::Subscribe {
                    conn_id,
                    user_id,
                    client_seq,
                } => self.handle_subscribe(conn_id, user_id, client_seq),
                GameCommand::Play {
                    conn_id,
                    user_id,
                    client_seq,
                    action,
                } => self.handle_play(conn_id, user_id, client_seq, action).await,
                GameCommand::PlayerJoined { user_id } => self.handle_membership(user_id, true),
                GameCommand::PlayerLeft { user_id } => self.handle_membership(user_id, false),
                GameCommand::QueryTurn { reply } => {
                    let holder = (self.state.status == GameStatus::Active)
                        .then(|| self.state.current_player().user_id);
                    let _ = reply.send(holder);
                }
                GameCommand::GameDeleted => {
                    for (conn_id, _) in self.hub.game_subscribers(self.game_id) {
                        self.hub.send_to_conn(
                            conn_id,
                            ServerMsg::GameDeleted {
                                game_id: self.game_id,
                            },
                        );
                    }
                    break;
                }
            }
        }
        self.hub.clear_game(self.game_id);
        info!(game_id = self.game_id, "game worker stopped");
    }

    fn handle_subscribe(&self, conn_id: Uuid, user_id: i64, client_seq: u64) {
        self.hub.subscribe(conn_id, self.game_id);
        self.hub.send_to_conn(
            conn_id,
            ServerMsg::State {
                client_seq: Some(client_seq),
                game: project_for(&self.state, user_id),
            },
        );
    }

    fn handle_membership(&mut self, user_id: i64, joined: bool) {
        let result = if joined {
            self.state.add_player(user_id).map(|_| ())
        } else {
            self.state.remove_player(user_id)
        };
        match result {
            Ok(()) => self.broadcast(None),
            Err(err) => warn!(
                game_id = self.game_id,
                user_id,
                joined,
                error = %err,
                "membership change rejected by state"
            ),
        }
    }

    async fn handle_play(
        &mut self,
        conn_id: Uuid,
        user_id: i64,
        client_seq: u64,
        action: PlayerAction,
    ) {
        if matches!(action, PlayerAction::Start) && user_id != self.host_user_id {
            self.send_error(
                conn_id,
                client_seq,
                WireErrorCode::BadRequest,
                "only the host can start the game",
            );
            return;
        }
        let Some(seat) = self.state.seat_of(user_id) else {
            self.send_error(
                conn_id,
                client_seq,
                WireErrorCode::NotInGame,
                "you are not seated in this game",
            );
            return;
        };

        // Validate against a scratch copy; the live state stays untouched
        // until the event is durable.
        let mut next = self.state.clone();
        let event = match apply_action(&mut next, seat, &action) {
            Ok(event) => event,
            Err(err) => {
                let code = err
                    .rule_kind()
                    .map(WireErrorCode::from)
                    .unwrap_or(WireErrorCode::BadRequest);
                self.send_error(conn_id, client_seq, code, err.to_string());
                return;
            }
        };

        if !self.persist_event(&event, user_id).await {
            if !self.degraded {
                warn!(game_id = self.game_id, "game degraded: event append exhausted retries");
            }
            self.degraded = true;
            self.send_error(
                conn_id,
                client_seq,
                WireErrorCode::ServerRetry,
                "command accepted but not yet durable, retry shortly",
            );
            return;
        }
        if self.degraded {
            info!(game_id = self.game_id, "game recovered from degraded state");
        }
        self.degraded = false;
        self.next_seq += 1;

        let status_before = self.state.status;
        self.state = next;
        if next_status_changed(status_before, self.state.status) {
            self.sync_status().await;
        }

        if self.state.status == GameStatus::Active && self.state.card_count() != DECK_SIZE {
            error!(
                game_id = self.game_id,
                cards = self.state.card_count(),
                "card conservation violated"
            );
        }

        self.broadcast(Some((conn_id, client_seq)));
    }

    /// Append with bounded backoff. Returns false once every attempt failed.
    async fn persist_event(&self, event: &GameEvent, actor_user_id: i64) -> bool {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(err) => {
                error!(game_id = self.game_id, error = %err, "failed to serialize event");
                return false;
            }
        };
        for attempt in 1..=PERSIST_ATTEMPTS {
            match repos::game_events::append(
                &self.db,
                self.game_id,
                self.next_seq,
                event.kind(),
                Some(actor_user_id),
                payload.clone(),
            )
            .await
            {
                Ok(_) => return true,
                Err(err) => {
                    warn!(
                        game_id = self.game_id,
                        seq = self.next_seq,
                        attempt,
                        error = %err,
                        "event append failed"
                    );
                    if attempt < PERSIST_ATTEMPTS {
                        let delay = PERSIST_BASE_DELAY_MS * 2u64.pow(attempt - 1);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }
        false
    }

    /// Mirror in-memory status transitions into the games table, and final
    /// scores into game_players when the game ends. Failures here are
    /// logged and retried implicitly on the next transition; the event log
    /// remains the source of truth.
    async fn sync_status(&self) {
        let status = match self.state.status {
            GameStatus::Lobby => crate::entities::games::GameStatus::Lobby,
            GameStatus::Active => crate::entities::games::GameStatus::Active,
            GameStatus::Finished => crate::entities::games::GameStatus::Finished,
        };
        if let Err(err) = repos::games::set_status(&self.db, self.game_id, status).await {
            error!(game_id = self.game_id, error = %err, "failed to sync game status");
        }
        if self.state.status == GameStatus::Finished {
            for player in &self.state.players {
                if let Err(err) = repos::memberships::set_final_score(
                    &self.db,
                    self.game_id,
                    player.user_id,
                    player.score as i32,
                )
                .await
                {
                    error!(
                        game_id = self.game_id,
                        user_id = player.user_id,
                        error = %err,
                        "failed to record final score"
                    );
                }
            }
        }
    }

    /// Fan out the current state, projected per viewer. The issuing
    /// connection gets its clientSeq echoed; everyone else gets a plain
    /// push. Snapshot order follows command order because this runs inside
    /// the single-writer loop.
    fn broadcast(&self, origin: Option<(Uuid, u64)>) {
        let mut projections: HashMap<i64, crate::domain::projection::GameProjection> =
            HashMap::new();
        for (conn_id, user_id) in self.hub.game_subscribers(self.game_id) {
            let projection = projections
                .entry(user_id)
                .or_insert_with(|| project_for(&self.state, user_id))
                .clone();
            let client_seq = match origin {
                Some((origin_conn, seq)) if origin_conn == conn_id => Some(seq),
                _ => None,
            };
            self.hub.send_to_conn(
                conn_id,
                ServerMsg::State {
                    client_seq,
                    game: projection,
                },
            );
        }
    }

    fn send_error(
        &self,
        conn_id: Uuid,
        client_seq: u64,
        code: WireErrorCode,
        message: impl Into<String>,
    ) {
        self.hub.send_to_conn(
            conn_id,
            ServerMsg::Error {
                client_seq: Some(client_seq),
                code,
                message: message.into(),
            },
        );
    }
}

fn next_status_changed(before: GameStatus, after: GameStatus) -> bool {
    before != after
}

/// Apply one player action to the state, producing the event to persist.
fn apply_action(
    state: &mut GameState,
    seat: Seat,
    action: &PlayerAction,
) -> Result<GameEvent, DomainError> {
    match action {
        PlayerAction::Start => {
            state.start_game()?;
            Ok(GameEvent::GameStarted)
        }
        PlayerAction::Draw(DrawSource::Stock) => {
            let card = state.draw_from_stock(seat)?;
            Ok(GameEvent::DrewFromStock { seat, card })
        }
        PlayerAction::Draw(DrawSource::Discard) => {
            let card = state.draw_from_discard(seat)?;
            Ok(GameEvent::DrewFromDiscard { seat, card })
        }
        PlayerAction::LayMelds(melds) => {
            state.lay_melds(seat, melds)?;
            Ok(GameEvent::LaidMelds {
                seat,
                melds: melds.clone(),
            })
        }
        PlayerAction::LayOff {
            target_seat,
            meld_idx,
            cards,
        } => {
            state.lay_off(seat, *target_seat, *meld_idx, cards)?;
            Ok(GameEvent::LaidOff {
                seat,
                target_seat: *target_seat,
                meld_idx: *meld_idx,
                cards: cards.clone(),
            })
        }
        PlayerAction::Discard(card) => {
            state.discard(seat, *card)?;
            Ok(GameEvent::Discarded { seat, card: *card })
        }
        PlayerAction::GoOut { melds, discard } => {
            state.go_out(seat, melds, *discard)?;
            Ok(GameEvent::WentOut {
                seat,
                melds: melds.clone(),
                discard: *discard,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_action_maps_commands_to_events() {
        let mut state = GameState::new(3, 77, &[1, 2]);
        let event = apply_action(&mut state, 0, &PlayerAction::Start).unwrap();
        assert_eq!(event.kind(), "gameStarted");

        let event = apply_action(&mut state, 0, &PlayerAction::Draw(DrawSource::Stock)).unwrap();
        match event {
            GameEvent::DrewFromStock { seat, .. } => assert_eq!(seat, 0),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn apply_action_rejects_out_of_turn_without_mutation() {
        let mut state = GameState::new(3, 77, &[1, 2]);
        state.start_game().unwrap();
        let before = state.clone();
        let err = apply_action(&mut state, 1, &PlayerAction::Draw(DrawSource::Stock)).unwrap_err();
        assert!(err.rule_kind().is_some());
        assert_eq!(state, before);
    }
}
