//! In-process ledger store.
//!
//! Transactions are serialized: `begin` takes a single store-wide writer lock
//! and works on a private copy of the committed tables, which replaces them
//! on commit. Waiting for the writer lock is bounded by the lock wait limit,
//! so a blocked workflow fails with `StoreError::LockTimeout` just like a
//! PostgreSQL transaction would.
//!
//! Non-locking reads never touch the writer lock. They see the last
//! committed tables, whatever transaction is in flight.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::errors::{StoreError, StoreResult};
use super::repository::{LedgerStore, LedgerTx};
use crate::ledger::{Player, PlayerId};
use crate::tournament::{Entry, Tournament, TournamentId, Winner};

type EntryKey = (TournamentId, PlayerId);

#[derive(Debug, Clone, Default)]
struct Tables {
    players: BTreeMap<PlayerId, Player>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    entries: BTreeMap<EntryKey, Entry>,
    winners: BTreeMap<EntryKey, Winner>,
}

/// In-memory ledger store
///
/// Every transaction clones all four tables when it begins, so the cost of
/// `begin` grows with the amount of stored data. Meant for tests and local
/// runs, not for large ledgers.
#[derive(Clone)]
pub struct MemoryStore {
    writer: Arc<Mutex<()>>,
    committed: Arc<RwLock<Tables>>,
    lock_timeout: Duration,
}

impl MemoryStore {
    /// Default lock wait limit
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create an empty store
    pub fn new() -> Self {
        Self {
            writer: Arc::new(Mutex::new(())),
            committed: Arc::new(RwLock::new(Tables::default())),
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set the lock wait limit
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    async fn lock_writer(&self) -> StoreResult<OwnedMutexGuard<()>> {
        tokio::time::timeout(self.lock_timeout, Arc::clone(&self.writer).lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let writer = self.lock_writer().await?;
        let working = self.committed.read().await.clone();

        Ok(MemoryTx {
            _writer: writer,
            committed: Arc::clone(&self.committed),
            working,
        })
    }

    async fn get_player(&self, player_id: &str) -> StoreResult<Option<Player>> {
        Ok(self.committed.read().await.players.get(player_id).cloned())
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self
            .committed
            .read()
            .await
            .tournaments
            .get(&tournament_id)
            .cloned())
    }

    async fn get_entry(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> StoreResult<Option<Entry>> {
        let key = (tournament_id, player_id.to_string());
        Ok(self.committed.read().await.entries.get(&key).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        let _ = self.committed.read().await;
        Ok(())
    }

    /// Waits for in-flight transactions so none of them commits over the reset.
    async fn reset(&self) -> StoreResult<()> {
        let _writer = self.lock_writer().await?;
        *self.committed.write().await = Tables::default();
        Ok(())
    }
}

/// Open in-memory transaction holding the writer lock
pub struct MemoryTx {
    _writer: OwnedMutexGuard<()>,
    committed: Arc<RwLock<Tables>>,
    working: Tables,
}

fn insert_new<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V) -> StoreResult<()> {
    if table.contains_key(&key) {
        return Err(StoreError::AlreadyExists);
    }
    table.insert(key, value);
    Ok(())
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn get_player_for_update(&mut self, player_id: &str) -> StoreResult<Option<Player>> {
        Ok(self.working.players.get(player_id).cloned())
    }

    async fn get_players_for_update(
        &mut self,
        player_ids: &[PlayerId],
    ) -> StoreResult<HashMap<PlayerId, Player>> {
        Ok(player_ids
            .iter()
            .filter_map(|id| self.working.players.get(id))
            .map(|player| (player.player_id.clone(), player.clone()))
            .collect())
    }

    async fn insert_player(&mut self, player: &Player) -> StoreResult<()> {
        insert_new(
            &mut self.working.players,
            player.player_id.clone(),
            player.clone(),
        )
    }

    async fn update_player(&mut self, player: &Player) -> StoreResult<()> {
        if let Some(stored) = self.working.players.get_mut(&player.player_id) {
            stored.balance = player.balance;
        }
        Ok(())
    }

    async fn get_tournament_for_update(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        Ok(self.working.tournaments.get(&tournament_id).cloned())
    }

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        insert_new(
            &mut self.working.tournaments,
            tournament.id,
            tournament.clone(),
        )
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        if let Some(stored) = self.working.tournaments.get_mut(&tournament.id) {
            stored.state = tournament.state;
        }
        Ok(())
    }

    async fn get_entry(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> StoreResult<Option<Entry>> {
        let key = (tournament_id, player_id.to_string());
        Ok(self.working.entries.get(&key).cloned())
    }

    async fn insert_entry(&mut self, entry: &Entry) -> StoreResult<()> {
        let key = (entry.tournament_id, entry.player_id.clone());
        insert_new(&mut self.working.entries, key, entry.clone())
    }

    async fn insert_winner(&mut self, winner: &Winner) -> StoreResult<()> {
        let key = (winner.tournament_id, winner.player_id.clone());
        insert_new(&mut self.working.winners, key, winner.clone())
    }

    async fn commit(self) -> StoreResult<()> {
        let MemoryTx {
            _writer,
            committed,
            working,
        } = self;
        *committed.write().await = working;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
