//! Ledger conflict types.

use thiserror::Error;

/// Business-rule violations.
///
/// A conflict is always caller-correctable: the request was well-formed but
/// the current ledger state does not allow it. Conflicts abort the enclosing
/// transaction and are never retried by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    /// Tournament entry deposit must be positive
    #[error("invalid tournament deposit value, must be greater than 0")]
    InvalidDeposit,

    /// Tournament prize must not be negative
    #[error("invalid tournament prize value, must not be negative")]
    InvalidPrize,

    /// More participants than deposit points
    #[error("too many player backers")]
    TooManyBackers,

    /// Same player listed twice in one entry
    #[error("duplicate backers")]
    DuplicateBackers,

    /// Tournament no longer accepts entries
    #[error("tournament is finished")]
    TournamentFinished,

    /// Tournament was already resulted
    #[error("tournament is already finished")]
    AlreadyFinished,

    /// Operation would drive a balance below zero
    #[error("operation would result in negative player balance")]
    NegativeBalance,

    /// Operation would overflow a balance
    #[error("operation would overflow player balance")]
    BalanceOverflow,

    /// Tournament ID already taken
    #[error("duplicate tournament")]
    DuplicateTournament,

    /// Player already joined this tournament
    #[error("duplicate tournament entry")]
    DuplicateEntry,

    /// Player record missing
    #[error("player not found")]
    PlayerNotFound,

    /// Tournament record missing
    #[error("tournament not found")]
    TournamentNotFound,

    /// Tournament entry record missing
    #[error("tournament entry not found")]
    EntryNotFound,
}

impl Conflict {
    /// Stable, machine-readable reason code for transport layers.
    pub fn reason(&self) -> &'static str {
        match self {
            Conflict::InvalidDeposit => "invalid_deposit",
            Conflict::InvalidPrize => "invalid_prize",
            Conflict::TooManyBackers => "too_many_backers",
            Conflict::DuplicateBackers => "duplicate_backers",
            Conflict::TournamentFinished => "tournament_finished",
            Conflict::AlreadyFinished => "already_finished",
            Conflict::NegativeBalance => "negative_balance",
            Conflict::BalanceOverflow => "balance_overflow",
            Conflict::DuplicateTournament => "duplicate_tournament",
            Conflict::DuplicateEntry => "duplicate_entry",
            Conflict::PlayerNotFound => "player_not_found",
            Conflict::TournamentNotFound => "tournament_not_found",
            Conflict::EntryNotFound => "entry_not_found",
        }
    }
}

/// Result type for entity-level ledger operations
pub type LedgerResult<T> = Result<T, Conflict>;
