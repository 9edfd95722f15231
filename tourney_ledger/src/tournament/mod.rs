//! Tournament entities for backed entries.
//!
//! This module provides:
//! - Tournament lifecycle (open -> finished, exactly once)
//! - Entry creation, splitting the entry deposit across a player and backers
//! - Deposit collection from locked player balances
//! - Result creation and prize payout in the same proportions
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use tourney_ledger::ledger::Player;
//! use tourney_ledger::tournament::Tournament;
//!
//! let tournament = Tournament::new(1, 100).unwrap();
//! let entry = tournament
//!     .create_entry("P1", &["P2".to_string(), "P3".to_string()])
//!     .unwrap();
//! assert_eq!(entry.backers[0].points, 34);
//!
//! let mut players: HashMap<_, _> = ["P1", "P2", "P3"]
//!     .into_iter()
//!     .map(|id| {
//!         let mut p = Player::new(id);
//!         p.adjust_balance(50).unwrap();
//!         (id.to_string(), p)
//!     })
//!     .collect();
//! entry.deduct_deposit(&mut players).unwrap();
//! assert_eq!(players["P1"].balance, 16);
//! ```

pub mod models;

pub use models::{Backer, Entry, Tournament, TournamentId, TournamentState, Winner};
