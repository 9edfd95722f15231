//! Settlement manager running the ledger workflows against a store.

use futures_util::future::BoxFuture;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::errors::{SettlementError, SettlementResult};
use crate::db::{LedgerStore, LedgerTx, StoreError, run_in_transaction};
use crate::ledger::{Conflict, Player, PlayerId};
use crate::tournament::{Entry, Tournament, TournamentId, Winner};

/// Settlement manager
///
/// Holds no mutable state of its own; every workflow is serialized against
/// concurrent callers by the store's row locks.
pub struct SettlementManager<S> {
    store: Arc<S>,
}

impl<S> Clone for SettlementManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> SettlementManager<S> {
    /// Create a new settlement manager
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn transact<T, F>(&self, body: F) -> SettlementResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, SettlementResult<T>> + Send,
    {
        run_in_transaction(self.store.as_ref(), body).await
    }

    /// Credit points to a player, creating the player if needed
    ///
    /// # Arguments
    ///
    /// * `player_id` - Player ID
    /// * `points` - Points to credit
    ///
    /// # Returns
    ///
    /// * `SettlementResult<Player>` - Player with the new balance
    pub async fn fund(&self, player_id: &str, points: i64) -> SettlementResult<Player> {
        self.adjust_balance(player_id, points).await
    }

    /// Debit points from a player, creating the player if needed
    ///
    /// # Errors
    ///
    /// * `Conflict::NegativeBalance` - Balance would drop below zero
    pub async fn take(&self, player_id: &str, points: i64) -> SettlementResult<Player> {
        let delta = points.checked_neg().ok_or(Conflict::BalanceOverflow)?;
        self.adjust_balance(player_id, delta).await
    }

    /// Apply a signed balance change to a player.
    ///
    /// The player row is created with a zero balance when it does not exist
    /// yet, so "player not found" never surfaces here.
    ///
    /// # Errors
    ///
    /// * `Conflict::NegativeBalance` - Balance would drop below zero
    /// * `Conflict::BalanceOverflow` - Balance would exceed `i64::MAX`
    /// * `SettlementError::Fault` - Store failure
    pub async fn adjust_balance(&self, player_id: &str, delta: i64) -> SettlementResult<Player> {
        let id = player_id.to_string();
        let result = self
            .transact(move |tx| Box::pin(adjust_in_tx(tx, id, delta)))
            .await;

        log_outcome(
            "adjust_balance",
            format_args!("player_id={}, delta={}", player_id, delta),
            &result,
        );
        result
    }

    /// Get a player's committed state without locking
    pub async fn balance(&self, player_id: &str) -> SettlementResult<Option<Player>> {
        let result = self.store.get_player(player_id).await;
        log_read("balance", format_args!("player_id={}", player_id), result)
    }

    /// Get a tournament's committed state without locking
    pub async fn tournament(
        &self,
        tournament_id: TournamentId,
    ) -> SettlementResult<Option<Tournament>> {
        let result = self.store.get_tournament(tournament_id).await;
        log_read(
            "tournament",
            format_args!("tournament_id={}", tournament_id),
            result,
        )
    }

    /// Get a committed entry without locking
    pub async fn entry(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
    ) -> SettlementResult<Option<Entry>> {
        let result = self.store.get_entry(tournament_id, player_id).await;
        log_read(
            "entry",
            format_args!("tournament_id={}, player_id={}", tournament_id, player_id),
            result,
        )
    }

    /// Announce a new tournament
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Caller-chosen tournament ID
    /// * `deposit` - Entry deposit, must be positive
    ///
    /// # Errors
    ///
    /// * `Conflict::InvalidDeposit` - Deposit is not positive
    /// * `Conflict::DuplicateTournament` - Tournament ID already taken
    pub async fn announce_tournament(
        &self,
        tournament_id: TournamentId,
        deposit: i64,
    ) -> SettlementResult<Tournament> {
        let result = match Tournament::new(tournament_id, deposit) {
            Ok(tournament) => {
                self.transact(move |tx| Box::pin(announce_in_tx(tx, tournament)))
                    .await
            }
            Err(conflict) => Err(conflict.into()),
        };

        log_outcome(
            "announce_tournament",
            format_args!("tournament_id={}, deposit={}", tournament_id, deposit),
            &result,
        );
        result
    }

    /// Join a tournament, splitting the deposit among the player and backers
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Tournament ID
    /// * `player_id` - Primary player
    /// * `backer_ids` - Additional backers, excluding the primary player
    ///
    /// # Errors
    ///
    /// * `Conflict::TournamentNotFound` - Unknown tournament
    /// * `Conflict::DuplicateEntry` - Player already entered this tournament
    /// * Any entry rule conflict (`TooManyBackers`, `TournamentFinished`,
    ///   `DuplicateBackers`, `PlayerNotFound`, `NegativeBalance`)
    pub async fn join_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: &str,
        backer_ids: &[PlayerId],
    ) -> SettlementResult<Entry> {
        let primary = player_id.to_string();
        let backers = backer_ids.to_vec();
        let result = self
            .transact(move |tx| Box::pin(join_in_tx(tx, tournament_id, primary, backers)))
            .await;

        log_outcome(
            "join_tournament",
            format_args!(
                "tournament_id={}, player_id={}, backers={:?}",
                tournament_id, player_id, backer_ids
            ),
            &result,
        );
        result
    }

    /// Finish a tournament and pay out prizes to each winning entry's backers
    ///
    /// Winners are processed in ascending player ID order.
    ///
    /// # Errors
    ///
    /// * `Conflict::TournamentNotFound` - Unknown tournament
    /// * `Conflict::AlreadyFinished` - Tournament was already resulted
    /// * `Conflict::EntryNotFound` - A winner has no entry in this tournament
    /// * `Conflict::InvalidPrize` - A prize is negative
    pub async fn result_tournament(
        &self,
        tournament_id: TournamentId,
        winners: BTreeMap<PlayerId, i64>,
    ) -> SettlementResult<Vec<Winner>> {
        let winner_ids: Vec<PlayerId> = winners.keys().cloned().collect();
        let result = self
            .transact(move |tx| Box::pin(result_in_tx(tx, tournament_id, winners)))
            .await;

        log_outcome(
            "result_tournament",
            format_args!("tournament_id={}, winners={:?}", tournament_id, winner_ids),
            &result,
        );
        result
    }

    /// Discard all ledger data
    pub async fn reset(&self) -> SettlementResult<()> {
        let result = self.store.reset().await.map_err(SettlementError::from);
        match &result {
            Ok(()) => log::warn!("Ledger store reset"),
            Err(e) => log::error!("reset failed: {}", e),
        }
        result
    }
}

fn log_outcome<T>(operation: &str, context: fmt::Arguments<'_>, result: &SettlementResult<T>) {
    match result {
        Ok(_) => log::info!("{} committed ({})", operation, context),
        Err(SettlementError::Conflict(conflict)) => {
            log::debug!("{} rejected ({}): {}", operation, context, conflict)
        }
        Err(SettlementError::Fault(e)) => log::error!("{} failed ({}): {}", operation, context, e),
    }
}

/// Reads cannot conflict, so only faults are logged.
fn log_read<T>(
    operation: &str,
    context: fmt::Arguments<'_>,
    result: Result<T, StoreError>,
) -> SettlementResult<T> {
    result.map_err(|e| {
        log::error!("{} failed ({}): {}", operation, context, e);
        SettlementError::Fault(e)
    })
}

/// Lock the player row, inserting it first when missing.
async fn get_or_create_player<X: LedgerTx>(tx: &mut X, player_id: &str) -> SettlementResult<Player> {
    if let Some(player) = tx.get_player_for_update(player_id).await? {
        return Ok(player);
    }

    let player = Player::new(player_id);
    match tx.insert_player(&player).await {
        Ok(()) => Ok(player),
        // A concurrent caller created it first; its insert has committed by now
        Err(StoreError::AlreadyExists) => Ok(tx
            .get_player_for_update(player_id)
            .await?
            .ok_or(StoreError::AlreadyExists)?),
        Err(e) => Err(e.into()),
    }
}

async fn adjust_in_tx<X: LedgerTx>(
    tx: &mut X,
    player_id: PlayerId,
    delta: i64,
) -> SettlementResult<Player> {
    let mut player = get_or_create_player(tx, &player_id).await?;
    player.adjust_balance(delta)?;
    tx.update_player(&player).await?;
    Ok(player)
}

async fn announce_in_tx<X: LedgerTx>(
    tx: &mut X,
    tournament: Tournament,
) -> SettlementResult<Tournament> {
    match tx.insert_tournament(&tournament).await {
        Ok(()) => Ok(tournament),
        Err(StoreError::AlreadyExists) => Err(Conflict::DuplicateTournament.into()),
        Err(e) => Err(e.into()),
    }
}

async fn join_in_tx<X: LedgerTx>(
    tx: &mut X,
    tournament_id: TournamentId,
    player_id: PlayerId,
    backer_ids: Vec<PlayerId>,
) -> SettlementResult<Entry> {
    let tournament = tx
        .get_tournament_for_update(tournament_id)
        .await?
        .ok_or(Conflict::TournamentNotFound)?;

    let participant_ids: Vec<PlayerId> = std::iter::once(&player_id)
        .chain(&backer_ids)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut players = tx.get_players_for_update(&participant_ids).await?;

    let entry = tournament.create_entry(&player_id, &backer_ids)?;
    entry.deduct_deposit(&mut players)?;

    match tx.insert_entry(&entry).await {
        Ok(()) => {}
        Err(StoreError::AlreadyExists) => return Err(Conflict::DuplicateEntry.into()),
        Err(e) => return Err(e.into()),
    }

    for player in players.values() {
        tx.update_player(player).await?;
    }

    Ok(entry)
}

async fn result_in_tx<X: LedgerTx>(
    tx: &mut X,
    tournament_id: TournamentId,
    winners: BTreeMap<PlayerId, i64>,
) -> SettlementResult<Vec<Winner>> {
    let mut tournament = tx
        .get_tournament_for_update(tournament_id)
        .await?
        .ok_or(Conflict::TournamentNotFound)?;
    tournament.mark_finished()?;
    tx.update_tournament(&tournament).await?;

    let mut results = Vec::with_capacity(winners.len());
    let mut backer_ids = BTreeSet::new();
    for (player_id, prize) in &winners {
        let entry = tx
            .get_entry(tournament_id, player_id)
            .await?
            .ok_or(Conflict::EntryNotFound)?;
        let winner = entry.create_result(*prize)?;
        backer_ids.extend(winner.backers.iter().map(|b| b.player_id.clone()));
        results.push(winner);
    }

    // One bulk fetch in ascending ID order across every winner's backers
    let backer_ids: Vec<PlayerId> = backer_ids.into_iter().collect();
    let mut players = tx.get_players_for_update(&backer_ids).await?;

    for winner in &results {
        winner.payout_prize(&mut players)?;
        tx.insert_winner(winner).await?;
    }

    for player in players.values() {
        tx.update_player(player).await?;
    }

    Ok(results)
}
