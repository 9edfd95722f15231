//! Player account model.

use serde::{Deserialize, Serialize};

use super::errors::{Conflict, LedgerResult};

/// Player ID type
pub type PlayerId = String;

/// Player account holding a points balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_id: PlayerId,
    pub balance: i64,
}

impl Player {
    /// Create a player with a zero balance
    pub fn new(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            balance: 0,
        }
    }

    /// Add `delta` (possibly negative) to the balance.
    ///
    /// # Errors
    ///
    /// * `Conflict::NegativeBalance` - The new balance would be below zero
    /// * `Conflict::BalanceOverflow` - The new balance does not fit in an `i64`
    ///
    /// The player is left untouched on error.
    pub fn adjust_balance(&mut self, delta: i64) -> LedgerResult<()> {
        let balance = self
            .balance
            .checked_add(delta)
            .ok_or(Conflict::BalanceOverflow)?;
        if balance < 0 {
            return Err(Conflict::NegativeBalance);
        }
        self.balance = balance;
        Ok(())
    }
}
