//! Connection registry: the hub's fan-out surface.
//!
//! Tracks live socket sessions, which user each belongs to, and which game
//! each is subscribed to. Game workers and the notification service address
//! sockets exclusively through this registry; they never hold session
//! state themselves.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix::prelude::*;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// One outbound wire message for a session actor to serialize and send.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Outbound(pub ServerMsg);

/// Server-shutdown request delivered to every live session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SessionShutdown;

struct ConnEntry {
    user_id: i64,
    recipient: Recipient<Outbound>,
    shutdown: Recipient<SessionShutdown>,
    topics: HashSet<i64>,
}

#[derive(Default)]
pub struct WsRegistry {
    connections: DashMap<Uuid, ConnEntry>,
    users: DashMap<i64, HashSet<Uuid>>,
    game_subs: DashMap<i64, HashSet<Uuid>>,
    active_connections: AtomicUsize,
}

impl WsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(
        &self,
        conn_id: Uuid,
        user_id: i64,
        recipient: Recipient<Outbound>,
        shutdown: Recipient<SessionShutdown>,
    ) {
        self.connections.insert(
            conn_id,
            ConnEntry {
                user_id,
                recipient,
                shutdown,
                topics: HashSet::new(),
            },
        );
        self.users.entry(user_id).or_default().insert(conn_id);

        let active = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        info!(user_id, conn_id = %conn_id, active_connections = active, "ws connection registered");
    }

    pub fn unregister_connection(&self, conn_id: Uuid) {
        let Some((_, entry)) = self.connections.remove(&conn_id) else {
            warn!(conn_id = %conn_id, "unregister of unknown connection");
            return;
        };

        if let Some(mut conns) = self.users.get_mut(&entry.user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                drop(conns);
                self.users.remove(&entry.user_id);
            }
        }
        for game_id in entry.topics {
            if let Some(mut subs) = self.game_subs.get_mut(&game_id) {
                subs.remove(&conn_id);
            }
        }

        let active = self
            .active_connections
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1);
        info!(user_id = entry.user_id, conn_id = %conn_id, active_connections = active, "ws connection unregistered");
    }

    pub fn subscribe(&self, conn_id: Uuid, game_id: i64) {
        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.topics.insert(game_id);
            self.game_subs.entry(game_id).or_default().insert(conn_id);
        }
    }

    pub fn unsubscribe(&self, conn_id: Uuid, game_id: i64) {
        if let Some(mut entry) = self.connections.get_mut(&conn_id) {
            entry.topics.remove(&game_id);
        }
        if let Some(mut subs) = self.game_subs.get_mut(&game_id) {
            subs.remove(&conn_id);
        }
    }

    /// Drop a game's whole subscriber set (the game was deleted or its
    /// worker stopped).
    pub fn clear_game(&self, game_id: i64) {
        if let Some((_, subs)) = self.game_subs.remove(&game_id) {
            for conn_id in subs {
                if let Some(mut entry) = self.connections.get_mut(&conn_id) {
                    entry.topics.remove(&game_id);
                }
            }
        }
    }

    pub fn send_to_conn(&self, conn_id: Uuid, msg: ServerMsg) {
        if let Some(entry) = self.connections.get(&conn_id) {
            entry.recipient.do_send(Outbound(msg));
        }
    }

    /// Deliver to every live socket of a user. Returns how many sockets
    /// were addressed; zero means the user is offline.
    pub fn send_to_user(&self, user_id: i64, msg: ServerMsg) -> usize {
        let Some(conns) = self.users.get(&user_id) else {
            return 0;
        };
        let targets: Vec<Uuid> = conns.iter().copied().collect();
        drop(conns);
        for conn_id in &targets {
            self.send_to_conn(*conn_id, msg.clone());
        }
        targets.len()
    }

    /// Current subscribers of a game as `(conn_id, user_id)` pairs.
    pub fn game_subscribers(&self, game_id: i64) -> Vec<(Uuid, i64)> {
        let Some(subs) = self.game_subs.get(&game_id) else {
            return Vec::new();
        };
        subs.iter()
            .filter_map(|conn_id| {
                self.connections
                    .get(conn_id)
                    .map(|entry| (*conn_id, entry.user_id))
            })
            .collect()
    }

    /// Ask every live session to close. Used on server shutdown after the
    /// game queues have drained.
    pub fn close_all(&self) -> usize {
        // Collect first so no dashmap guard is held while sending.
        let targets: Vec<Recipient<SessionShutdown>> = self
            .connections
            .iter()
            .map(|entry| entry.shutdown.clone())
            .collect();
        let count = targets.len();
        for target in targets {
            target.do_send(SessionShutdown);
        }
        count
    }

    pub fn active_connections_count(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}
