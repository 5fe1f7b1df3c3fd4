//! Registry of live game workers.
//!
//! One worker per game; workers are spawned lazily on first use and
//! rehydrated from the event log. A worker panic is contained to its own
//! task and its registry slot is reclaimed, so one broken game never takes
//! the others down.

use std::sync::Arc;

use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::domain::events::{apply, GameEvent};
use crate::domain::state::GameState;
use crate::engine::worker::{GameCommand, GameWorker};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::repos;
use crate::ws::hub::WsRegistry;

pub type GameHandle = mpsc::UnboundedSender<GameCommand>;

pub struct GameRegistry {
    db: DatabaseConnection,
    hub: Arc<WsRegistry>,
    workers: Arc<DashMap<i64, GameHandle>>,
    // Serializes worker spawns so a join race cannot create two writers
    // for the same game.
    spawn_lock: Mutex<()>,
}

impl GameRegistry {
    pub fn new(db: DatabaseConnection, hub: Arc<WsRegistry>) -> Arc<Self> {
        Arc::new(Self {
            db,
            hub,
            workers: Arc::new(DashMap::new()),
            spawn_lock: Mutex::new(()),
        })
    }

    /// Handle for a game's queue, spawning and rehydrating the worker on
    /// first use.
    pub async fn ensure(&self, game_id: i64) -> Result<GameHandle, AppError> {
        if let Some(handle) = self.workers.get(&game_id) {
            return Ok(handle.clone());
        }
        let _guard = self.spawn_lock.lock().await;
        if let Some(handle) = self.workers.get(&game_id) {
            return Ok(handle.clone());
        }

        let game = repos::games::find_by_id(&self.db, game_id)
            .await
            .map_err(|e| AppError::db("failed to load game", e))?
            .ok_or_else(|| {
                AppError::not_found(ErrorCode::GameNotFound, format!("game {game_id} not found"))
            })?;
        let members = repos::memberships::find_all_by_game(&self.db, game_id)
            .await
            .map_err(|e| AppError::db("failed to load members", e))?;
        let user_ids: Vec<i64> = members.iter().map(|m| m.user_id).collect();

        let mut state = GameState::new(game_id, game.rng_seed as u64, &user_ids);
        let rows = repos::game_events::load_all(&self.db, game_id)
            .await
            .map_err(|e| AppError::db("failed to load event log", e))?;
        let next_seq = rows.last().map(|row| row.seq + 1).unwrap_or(0);
        for row in rows {
            let event: GameEvent = serde_json::from_value(row.payload).map_err(|e| {
                AppError::internal(format!(
                    "game {game_id} event {} does not decode: {e}",
                    row.seq
                ))
            })?;
            apply(&mut state, &event).map_err(|e| {
                AppError::internal(format!(
                    "game {game_id} event {} does not replay: {e}",
                    row.seq
                ))
            })?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = GameWorker::new(
            game_id,
            game.created_by,
            state,
            next_seq,
            self.db.clone(),
            self.hub.clone(),
            rx,
        );
        let join = tokio::spawn(worker.run());
        let workers = self.workers.clone();
        let hub = self.hub.clone();
        tokio::spawn(async move {
            if let Err(err) = join.await {
                error!(game_id, error = %err, "game worker task aborted");
            }
            workers.remove(&game_id);
            hub.clear_game(game_id);
        });

        self.workers.insert(game_id, tx.clone());
        info!(game_id, next_seq, "game worker spawned");
        Ok(tx)
    }

    /// Enqueue onto an already-live worker; silently dropped if none (the
    /// next subscriber will rehydrate from the log and see the same data).
    pub fn send_if_live(&self, game_id: i64, cmd: GameCommand) {
        if let Some(handle) = self.workers.get(&game_id) {
            let _ = handle.send(cmd);
        }
    }

    /// Enqueue, spawning the worker if needed.
    pub async fn send(&self, game_id: i64, cmd: GameCommand) -> Result<(), AppError> {
        let handle = self.ensure(game_id).await?;
        handle
            .send(cmd)
            .map_err(|_| AppError::internal(format!("game {game_id} queue is closed")))
    }

    /// Ask a game's worker who currently holds the turn.
    pub async fn current_turn_user(&self, game_id: i64) -> Result<Option<i64>, AppError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.send(game_id, GameCommand::QueryTurn { reply: tx })
            .await?;
        rx.await
            .map_err(|_| AppError::internal(format!("game {game_id} worker dropped turn query")))
    }

    /// Tell a game's worker the game is gone, then drop our handle so the
    /// worker exits once its queue drains.
    pub fn notify_deleted(&self, game_id: i64) {
        if let Some((_, handle)) = self.workers.remove(&game_id) {
            let _ = handle.send(GameCommand::GameDeleted);
        }
    }

    /// Spawn workers for every Active game at startup so reconnecting
    /// players find live state immediately.
    pub async fn rehydrate_active(&self) -> Result<usize, AppError> {
        let ids = repos::games::active_game_ids(&self.db)
            .await
            .map_err(|e| AppError::db("failed to list active games", e))?;
        let mut count = 0;
        for game_id in ids {
            match self.ensure(game_id).await {
                Ok(_) => count += 1,
                Err(err) => error!(game_id, error = %err, "failed to rehydrate game"),
            }
        }
        Ok(count)
    }

    /// Drop every queue handle. Workers drain what is already enqueued,
    /// persist those events, and exit.
    pub fn shutdown(&self) {
        self.workers.clear();
    }

    pub fn live_count(&self) -> usize {
        self.workers.len()
    }
}
