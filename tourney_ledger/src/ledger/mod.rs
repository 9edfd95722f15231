//! Points ledger primitives.
//!
//! This module provides:
//! - [`Player`] accounts with a guarded balance
//! - [`split_points`], the largest-remainder split shared by deposits and prizes
//! - [`Conflict`], the taxonomy of business-rule violations
//!
//! ## Example
//!
//! ```
//! use tourney_ledger::ledger::{Conflict, Player};
//!
//! let mut player = Player::new("P1");
//! player.adjust_balance(100).unwrap();
//! assert_eq!(player.adjust_balance(-120), Err(Conflict::NegativeBalance));
//! assert_eq!(player.balance, 100);
//! ```

pub mod errors;
pub mod player;
pub mod split;

pub use errors::{Conflict, LedgerResult};
pub use player::{Player, PlayerId};
pub use split::split_points;
