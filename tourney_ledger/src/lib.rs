//! # Tourney Ledger
//!
//! A points ledger for backed tournament entries.
//!
//! Players hold non-negative point balances. A tournament has a fixed entry
//! deposit; a player may enter alone or with backers who share the deposit,
//! and later share any prize in the same proportions. All money movement runs
//! inside store transactions that lock every touched row in ascending ID
//! order, so concurrent workflows never deadlock on each other.
//!
//! ## Core Modules
//!
//! - [`ledger`]: Players, the point split, and the conflict taxonomy
//! - [`tournament`]: Tournaments, entries, and results
//! - [`db`]: Store traits, the PostgreSQL and in-memory stores, schema
//! - [`settlement`]: Transactional workflows over a store
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tourney_ledger::db::MemoryStore;
//! use tourney_ledger::settlement::SettlementManager;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tourney_ledger::settlement::SettlementError> {
//! let manager = SettlementManager::new(Arc::new(MemoryStore::new()));
//!
//! manager.fund("P1", 100).await?;
//! manager.announce_tournament(1, 60).await?;
//! manager.join_tournament(1, "P1", &[]).await?;
//!
//! assert_eq!(manager.balance("P1").await?.map(|p| p.balance), Some(40));
//! # Ok(())
//! # }
//! ```

/// Players, point split, and business-rule conflicts.
pub mod ledger;
pub use ledger::{Conflict, LedgerResult, Player, PlayerId, split_points};

/// Tournament entities.
pub mod tournament;
pub use tournament::{Backer, Entry, Tournament, TournamentId, TournamentState, Winner};

/// Storage layer.
pub mod db;

/// Settlement workflows.
pub mod settlement;
pub use settlement::{SettlementError, SettlementManager, SettlementResult};
