//! Store traits and the PostgreSQL implementation.
//!
//! [`LedgerStore`] is the pool-level handle: it opens transactions and serves
//! non-locking reads. [`LedgerTx`] is one open transaction. Every `_for_update`
//! read takes an exclusive row lock that is held until commit or rollback.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::collections::HashMap;
use std::time::Duration;

use super::errors::{StoreError, StoreResult};
use crate::ledger::{Player, PlayerId};
use crate::tournament::{Entry, Tournament, TournamentId, TournamentState, Winner};

/// Pool-level store handle
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Transaction type produced by [`LedgerStore::begin`]
    type Tx: LedgerTx + 'static;

    /// Open a transaction. The lock wait limit applies to every lock it takes.
    async fn begin(&self) -> StoreResult<Self::Tx>;

    /// Get player by ID without locking
    async fn get_player(&self, player_id: &str) -> StoreResult<Option<Player>>;

    /// Get tournament by ID without locking
    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Get entry by tournament and primary player without locking
    async fn get_entry(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> StoreResult<Option<Entry>>;

    /// Check that the store is reachable
    async fn health_check(&self) -> StoreResult<()>;

    /// Discard all stored data
    async fn reset(&self) -> StoreResult<()>;
}

/// One open store transaction.
///
/// Dropping a transaction without calling [`LedgerTx::commit`] rolls it back.
#[async_trait]
pub trait LedgerTx: Send + Sized {
    /// Get player by ID, locking the row
    async fn get_player_for_update(&mut self, player_id: &str) -> StoreResult<Option<Player>>;

    /// Lock every existing player in `player_ids` in ascending ID order.
    ///
    /// Unknown IDs are absent from the returned map.
    async fn get_players_for_update(
        &mut self,
        player_ids: &[PlayerId],
    ) -> StoreResult<HashMap<PlayerId, Player>>;

    /// Insert a player, or `StoreError::AlreadyExists`
    async fn insert_player(&mut self, player: &Player) -> StoreResult<()>;

    /// Persist a player's balance
    async fn update_player(&mut self, player: &Player) -> StoreResult<()>;

    /// Get tournament by ID, locking the row
    async fn get_tournament_for_update(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>>;

    /// Insert a tournament, or `StoreError::AlreadyExists`
    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()>;

    /// Persist a tournament's state
    async fn update_tournament(&mut self, tournament: &Tournament) -> StoreResult<()>;

    /// Get entry by tournament and primary player
    async fn get_entry(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> StoreResult<Option<Entry>>;

    /// Insert an entry, or `StoreError::AlreadyExists`
    async fn insert_entry(&mut self, entry: &Entry) -> StoreResult<()>;

    /// Insert a winner, or `StoreError::AlreadyExists`
    async fn insert_winner(&mut self, winner: &Winner) -> StoreResult<()>;

    /// Commit the transaction
    async fn commit(self) -> StoreResult<()>;

    /// Roll the transaction back
    async fn rollback(self) -> StoreResult<()>;
}

/// Run `body` inside a store transaction.
///
/// Commits when `body` returns `Ok` and rolls back otherwise. A failed
/// commit is reported as the workflow's error.
///
/// # Arguments
///
/// * `store` - Store to open the transaction on
/// * `body` - Workflow body; it must own everything it captures
///
/// # Errors
///
/// * Whatever `body` returns, or the store error from `begin`/`commit`
pub async fn run_in_transaction<S, F, T, E>(store: &S, body: F) -> Result<T, E>
where
    S: LedgerStore + ?Sized,
    F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, Result<T, E>> + Send,
    T: Send,
    E: From<StoreError> + Send,
{
    let mut tx = store.begin().await?;

    match body(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

const SELECT_PLAYER: &str = "SELECT player_id, balance FROM players WHERE player_id = $1";
const SELECT_PLAYER_FOR_UPDATE: &str =
    "SELECT player_id, balance FROM players WHERE player_id = $1 FOR UPDATE";
const SELECT_PLAYERS_FOR_UPDATE: &str = "SELECT player_id, balance FROM players \
     WHERE player_id = ANY($1) ORDER BY player_id FOR UPDATE";

const SELECT_TOURNAMENT: &str =
    "SELECT tournament_id, entry_deposit, active FROM tournaments WHERE tournament_id = $1";
const SELECT_TOURNAMENT_FOR_UPDATE: &str = "SELECT tournament_id, entry_deposit, active \
     FROM tournaments WHERE tournament_id = $1 FOR UPDATE";

const SELECT_ENTRY: &str = "SELECT tournament_id, player_id, fee, backers \
     FROM tournament_entries WHERE tournament_id = $1 AND player_id = $2";

fn player_from_row(row: &PgRow) -> StoreResult<Player> {
    Ok(Player {
        player_id: row.try_get("player_id")?,
        balance: row.try_get("balance")?,
    })
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    let active: bool = row.try_get("active")?;
    Ok(Tournament {
        id: row.try_get("tournament_id")?,
        entry_deposit: row.try_get("entry_deposit")?,
        state: if active {
            TournamentState::Open
        } else {
            TournamentState::Finished
        },
    })
}

fn entry_from_row(row: &PgRow) -> StoreResult<Entry> {
    Ok(Entry {
        tournament_id: row.try_get("tournament_id")?,
        player_id: row.try_get("player_id")?,
        fee: row.try_get("fee")?,
        backers: serde_json::from_value(row.try_get("backers")?)?,
    })
}

async fn fetch_player<'c, X: PgExecutor<'c>>(
    executor: X,
    query: &'static str,
    player_id: &str,
) -> StoreResult<Option<Player>> {
    let row = sqlx::query(query)
        .bind(player_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(player_from_row).transpose()
}

async fn fetch_tournament<'c, X: PgExecutor<'c>>(
    executor: X,
    query: &'static str,
    tournament_id: TournamentId,
) -> StoreResult<Option<Tournament>> {
    let row = sqlx::query(query)
        .bind(tournament_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(tournament_from_row).transpose()
}

async fn fetch_entry<'c, X: PgExecutor<'c>>(
    executor: X,
    tournament_id: TournamentId,
    player_id: &str,
) -> StoreResult<Option<Entry>> {
    let row = sqlx::query(SELECT_ENTRY)
        .bind(tournament_id)
        .bind(player_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(entry_from_row).transpose()
}

fn inserted(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::AlreadyExists)
    } else {
        Ok(())
    }
}

/// PostgreSQL-backed ledger store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    /// Default row lock wait limit
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set the row lock wait limit applied to each transaction
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        let mut tx = self.pool.begin().await?;

        // SET does not accept bind parameters
        let statement = format!(
            "SET LOCAL lock_timeout = {}",
            self.lock_timeout.as_millis().max(1)
        );
        sqlx::query(&statement).execute(&mut *tx).await?;

        Ok(PgTx { tx })
    }

    async fn get_player(&self, player_id: &str) -> StoreResult<Option<Player>> {
        fetch_player(&self.pool, SELECT_PLAYER, player_id).await
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> StoreResult<Option<Tournament>> {
        fetch_tournament(&self.pool, SELECT_TOURNAMENT, tournament_id).await
    }

    async fn get_entry(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> StoreResult<Option<Entry>> {
        fetch_entry(&self.pool, tournament_id, player_id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn reset(&self) -> StoreResult<()> {
        super::schema::recreate_schema(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn get_player_for_update(&mut self, player_id: &str) -> StoreResult<Option<Player>> {
        fetch_player(&mut *self.tx, SELECT_PLAYER_FOR_UPDATE, player_id).await
    }

    async fn get_players_for_update(
        &mut self,
        player_ids: &[PlayerId],
    ) -> StoreResult<HashMap<PlayerId, Player>> {
        let rows = sqlx::query(SELECT_PLAYERS_FOR_UPDATE)
            .bind(player_ids)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter()
            .map(|row| player_from_row(row).map(|player| (player.player_id.clone(), player)))
            .collect()
    }

    async fn insert_player(&mut self, player: &Player) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO players (player_id, balance) VALUES ($1, $2) \
             ON CONFLICT (player_id) DO NOTHING",
        )
        .bind(&player.player_id)
        .bind(player.balance)
        .execute(&mut *self.tx)
        .await?;

        inserted(result.rows_affected())
    }

    async fn update_player(&mut self, player: &Player) -> StoreResult<()> {
        sqlx::query("UPDATE players SET balance = $2 WHERE player_id = $1")
            .bind(&player.player_id)
            .bind(player.balance)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn get_tournament_for_update(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        fetch_tournament(&mut *self.tx, SELECT_TOURNAMENT_FOR_UPDATE, tournament_id).await
    }

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO tournaments (tournament_id, entry_deposit, active) VALUES ($1, $2, $3) \
             ON CONFLICT (tournament_id) DO NOTHING",
        )
        .bind(tournament.id)
        .bind(tournament.entry_deposit)
        .bind(tournament.is_open())
        .execute(&mut *self.tx)
        .await?;

        inserted(result.rows_affected())
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        sqlx::query("UPDATE tournaments SET active = $2 WHERE tournament_id = $1")
            .bind(tournament.id)
            .bind(tournament.is_open())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn get_entry(
        &mut self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> StoreResult<Option<Entry>> {
        fetch_entry(&mut *self.tx, tournament_id, player_id).await
    }

    async fn insert_entry(&mut self, entry: &Entry) -> StoreResult<()> {
        let backers = serde_json::to_value(&entry.backers)?;
        let result = sqlx::query(
            "INSERT INTO tournament_entries (tournament_id, player_id, fee, backers) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (tournament_id, player_id) DO NOTHING",
        )
        .bind(entry.tournament_id)
        .bind(&entry.player_id)
        .bind(entry.fee)
        .bind(backers)
        .execute(&mut *self.tx)
        .await?;

        inserted(result.rows_affected())
    }

    async fn insert_winner(&mut self, winner: &Winner) -> StoreResult<()> {
        let backers = serde_json::to_value(&winner.backers)?;
        let result = sqlx::query(
            "INSERT INTO tournament_winners (tournament_id, player_id, prize, backers) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (tournament_id, player_id) DO NOTHING",
        )
        .bind(winner.tournament_id)
        .bind(&winner.player_id)
        .bind(winner.prize)
        .bind(backers)
        .execute(&mut *self.tx)
        .await?;

        inserted(result.rows_affected())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
