//! Tournament data models and the money-moving entity operations.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::ledger::{Conflict, LedgerResult, Player, PlayerId, split_points};

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentState {
    /// Accepting entries
    Open,
    /// Resulted, terminal
    Finished,
}

/// Tournament with a fixed entry deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub entry_deposit: i64,
    pub state: TournamentState,
}

/// One participant's share of an entry fee or a prize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backer {
    pub player_id: PlayerId,
    pub points: i64,
}

/// Tournament entry: a primary player and the backers who paid the deposit.
///
/// `backers[0]` is always the primary player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub fee: i64,
    pub backers: Vec<Backer>,
}

/// Tournament result for one winning entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub prize: i64,
    pub backers: Vec<Backer>,
}

fn has_duplicates(ids: &[&str]) -> bool {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().any(|id| !seen.insert(*id))
}

fn split_among<'a>(points: i64, ids: impl ExactSizeIterator<Item = &'a str>) -> Vec<Backer> {
    let parts = split_points(points, ids.len());
    ids.zip(parts)
        .map(|(player_id, points)| Backer {
            player_id: player_id.to_string(),
            points,
        })
        .collect()
}

impl Tournament {
    /// Create a new open tournament.
    ///
    /// # Errors
    ///
    /// * `Conflict::InvalidDeposit` - `deposit` is not positive
    pub fn new(id: TournamentId, deposit: i64) -> LedgerResult<Self> {
        if deposit <= 0 {
            return Err(Conflict::InvalidDeposit);
        }
        Ok(Self {
            id,
            entry_deposit: deposit,
            state: TournamentState::Open,
        })
    }

    /// Whether the tournament still accepts entries
    pub fn is_open(&self) -> bool {
        self.state == TournamentState::Open
    }

    /// Transition Open -> Finished.
    ///
    /// # Errors
    ///
    /// * `Conflict::AlreadyFinished` - The tournament was finished before; state is unchanged
    pub fn mark_finished(&mut self) -> LedgerResult<()> {
        if !self.is_open() {
            return Err(Conflict::AlreadyFinished);
        }
        self.state = TournamentState::Finished;
        Ok(())
    }

    /// Build the entry for `player_id` backed by `backer_ids`.
    ///
    /// The deposit is split across `[player_id] + backer_ids` in that order,
    /// the primary player absorbing the remainder first.
    ///
    /// # Errors
    ///
    /// * `Conflict::TooManyBackers` - Fewer deposit points than participants
    /// * `Conflict::TournamentFinished` - The tournament is finished
    /// * `Conflict::DuplicateBackers` - A participant is listed twice
    pub fn create_entry(&self, player_id: &str, backer_ids: &[PlayerId]) -> LedgerResult<Entry> {
        let ids: Vec<&str> = std::iter::once(player_id)
            .chain(backer_ids.iter().map(String::as_str))
            .collect();

        if self.entry_deposit < ids.len() as i64 {
            return Err(Conflict::TooManyBackers);
        }
        if !self.is_open() {
            return Err(Conflict::TournamentFinished);
        }
        if has_duplicates(&ids) {
            return Err(Conflict::DuplicateBackers);
        }

        Ok(Entry {
            tournament_id: self.id,
            player_id: player_id.to_string(),
            fee: self.entry_deposit,
            backers: split_among(self.entry_deposit, ids.into_iter()),
        })
    }
}

impl Entry {
    /// IDs of every participant, primary player first
    pub fn participant_ids(&self) -> impl ExactSizeIterator<Item = &str> {
        self.backers.iter().map(|b| b.player_id.as_str())
    }

    /// Debit every backer's share from `players`.
    ///
    /// All balances are validated before any is changed, so on error the
    /// map is left exactly as it was.
    ///
    /// # Errors
    ///
    /// * `Conflict::PlayerNotFound` - A backer is missing from `players`
    /// * `Conflict::NegativeBalance` - A backer cannot cover their share
    pub fn deduct_deposit(&self, players: &mut HashMap<PlayerId, Player>) -> LedgerResult<()> {
        apply_shares(&self.backers, players, |balance, points| {
            let balance = balance.checked_sub(points).ok_or(Conflict::BalanceOverflow)?;
            if balance < 0 {
                return Err(Conflict::NegativeBalance);
            }
            Ok(balance)
        })
    }

    /// Split `prize` across this entry's backers.
    ///
    /// # Errors
    ///
    /// * `Conflict::InvalidPrize` - `prize` is negative
    pub fn create_result(&self, prize: i64) -> LedgerResult<Winner> {
        if prize < 0 {
            return Err(Conflict::InvalidPrize);
        }
        Ok(Winner {
            tournament_id: self.tournament_id,
            player_id: self.player_id.clone(),
            prize,
            backers: split_among(prize, self.participant_ids()),
        })
    }
}

impl Winner {
    /// Credit every backer's share to `players`.
    ///
    /// On error the map is left exactly as it was.
    ///
    /// # Errors
    ///
    /// * `Conflict::PlayerNotFound` - A backer is missing from `players`
    /// * `Conflict::BalanceOverflow` - A credit would overflow a balance
    pub fn payout_prize(&self, players: &mut HashMap<PlayerId, Player>) -> LedgerResult<()> {
        apply_shares(&self.backers, players, |balance, points| {
            balance.checked_add(points).ok_or(Conflict::BalanceOverflow)
        })
    }
}

/// Validate every share against a scratch copy of the affected balances,
/// then write the new balances back in one pass.
fn apply_shares<F>(
    backers: &[Backer],
    players: &mut HashMap<PlayerId, Player>,
    step: F,
) -> LedgerResult<()>
where
    F: Fn(i64, i64) -> LedgerResult<i64>,
{
    let mut pending: HashMap<&str, i64> = HashMap::with_capacity(backers.len());
    for backer in backers {
        let current = match pending.get(backer.player_id.as_str()) {
            Some(balance) => *balance,
            None => {
                players
                    .get(&backer.player_id)
                    .ok_or(Conflict::PlayerNotFound)?
                    .balance
            }
        };
        pending.insert(&backer.player_id, step(current, backer.points)?);
    }

    for (player_id, balance) in pending {
        if let Some(player) = players.get_mut(player_id) {
            player.balance = balance;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backer(player_id: &str, points: i64) -> Backer {
        Backer {
            player_id: player_id.to_string(),
            points,
        }
    }

    fn players(balances: &[(&str, i64)]) -> HashMap<PlayerId, Player> {
        balances
            .iter()
            .map(|(id, balance)| {
                (
                    id.to_string(),
                    Player {
                        player_id: id.to_string(),
                        balance: *balance,
                    },
                )
            })
            .collect()
    }

    fn ids(ids: &[&str]) -> Vec<PlayerId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn tournament(deposit: i64, state: TournamentState) -> Tournament {
        Tournament {
            id: 123,
            entry_deposit: deposit,
            state,
        }
    }

    #[test]
    fn test_has_duplicates() {
        assert!(!has_duplicates(&[]));
        assert!(!has_duplicates(&["a", "b"]));
        assert!(!has_duplicates(&["a", "b", "c"]));
        assert!(has_duplicates(&["a", "b", "a"]));
    }

    #[test]
    fn test_new_tournament() {
        assert_eq!(Tournament::new(1, 0), Err(Conflict::InvalidDeposit));
        assert_eq!(Tournament::new(1, -5), Err(Conflict::InvalidDeposit));

        let t = Tournament::new(7, 1000).unwrap();
        assert_eq!(t.id, 7);
        assert_eq!(t.entry_deposit, 1000);
        assert!(t.is_open());
    }

    #[test]
    fn test_mark_finished() {
        let mut t = tournament(10, TournamentState::Open);
        assert!(t.mark_finished().is_ok());
        assert_eq!(t.state, TournamentState::Finished);

        assert_eq!(t.mark_finished(), Err(Conflict::AlreadyFinished));
        assert_eq!(t.state, TournamentState::Finished);
    }

    #[test]
    fn test_create_entry_errors() {
        let open = TournamentState::Open;
        let cases = [
            ("too low deposit", 3, open, vec!["P2", "P3", "P4"], Conflict::TooManyBackers),
            ("finished", 1, TournamentState::Finished, vec![], Conflict::TournamentFinished),
            ("duplicate backers", 100, open, vec!["P2", "P2"], Conflict::DuplicateBackers),
            ("duplicate player backer", 100, open, vec!["P1", "P2"], Conflict::DuplicateBackers),
        ];

        for (msg, deposit, state, backers, err) in cases {
            let t = tournament(deposit, state);
            assert_eq!(t.create_entry("P1", &ids(&backers)), Err(err), "{msg}");
        }
    }

    #[test]
    fn test_create_entry_single_player() {
        let entry = tournament(1, TournamentState::Open)
            .create_entry("P1", &[])
            .unwrap();
        assert_eq!(
            entry,
            Entry {
                tournament_id: 123,
                player_id: "P1".to_string(),
                fee: 1,
                backers: vec![backer("P1", 1)],
            }
        );
    }

    #[test]
    fn test_create_entry_with_backers() {
        let entry = tournament(100, TournamentState::Open)
            .create_entry("P1", &ids(&["P2", "P3"]))
            .unwrap();
        assert_eq!(entry.fee, 100);
        assert_eq!(
            entry.backers,
            vec![backer("P1", 34), backer("P2", 33), backer("P3", 33)]
        );
    }

    #[test]
    fn test_deduct_deposit_empty() {
        let entry = Entry {
            tournament_id: 1,
            player_id: "P1".to_string(),
            fee: 0,
            backers: vec![],
        };
        let mut map = players(&[]);
        assert!(entry.deduct_deposit(&mut map).is_ok());
        assert!(map.is_empty());
    }

    #[test]
    fn test_deduct_deposit_missing_player() {
        let entry = Entry {
            tournament_id: 1,
            player_id: "P1".to_string(),
            fee: 2,
            backers: vec![backer("P1", 1), backer("P2", 1)],
        };
        let mut map = players(&[("P1", 100)]);
        assert_eq!(entry.deduct_deposit(&mut map), Err(Conflict::PlayerNotFound));
        assert_eq!(map, players(&[("P1", 100)]));
    }

    #[test]
    fn test_deduct_deposit_is_all_or_nothing() {
        let entry = Entry {
            tournament_id: 1,
            player_id: "P1".to_string(),
            fee: 250,
            backers: vec![backer("P1", 50), backer("P2", 200)],
        };
        let mut map = players(&[("P1", 100), ("P2", 100)]);
        assert_eq!(entry.deduct_deposit(&mut map), Err(Conflict::NegativeBalance));
        assert_eq!(map, players(&[("P1", 100), ("P2", 100)]));
    }

    #[test]
    fn test_deduct_deposit_valid() {
        let entry = Entry {
            tournament_id: 1,
            player_id: "P1".to_string(),
            fee: 0,
            backers: vec![
                backer("P1", 1),
                backer("P2", 5),
                backer("P3", -150),
                backer("P4", 0),
            ],
        };
        let mut map = players(&[("P1", 100), ("P2", 100), ("P3", 100), ("P4", 100)]);
        assert!(entry.deduct_deposit(&mut map).is_ok());
        assert_eq!(
            map,
            players(&[("P1", 99), ("P2", 95), ("P3", 250), ("P4", 100)])
        );
    }

    #[test]
    fn test_deduct_deposit_accumulates_repeated_backer() {
        let entry = Entry {
            tournament_id: 1,
            player_id: "P1".to_string(),
            fee: 120,
            backers: vec![backer("P1", 60), backer("P1", 60)],
        };
        let mut map = players(&[("P1", 100)]);
        assert_eq!(entry.deduct_deposit(&mut map), Err(Conflict::NegativeBalance));
        assert_eq!(map, players(&[("P1", 100)]));
    }

    #[test]
    fn test_create_result() {
        let entry = Entry {
            tournament_id: 123,
            player_id: "P1".to_string(),
            fee: 100,
            backers: vec![backer("P1", 34), backer("P3", 33), backer("P3", 33)],
        };

        assert_eq!(entry.create_result(-100), Err(Conflict::InvalidPrize));

        let winner = entry.create_result(500).unwrap();
        assert_eq!(
            winner,
            Winner {
                tournament_id: 123,
                player_id: "P1".to_string(),
                prize: 500,
                backers: vec![backer("P1", 167), backer("P3", 167), backer("P3", 166)],
            }
        );
    }

    #[test]
    fn test_create_result_without_backers() {
        let entry = Entry {
            tournament_id: 0,
            player_id: String::new(),
            fee: 0,
            backers: vec![],
        };
        let winner = entry.create_result(100).unwrap();
        assert_eq!(winner.prize, 100);
        assert!(winner.backers.is_empty());
    }

    #[test]
    fn test_payout_prize_missing_player() {
        let winner = Winner {
            tournament_id: 1,
            player_id: "P1".to_string(),
            prize: 1,
            backers: vec![backer("P1", 1)],
        };
        let mut map = players(&[]);
        assert_eq!(winner.payout_prize(&mut map), Err(Conflict::PlayerNotFound));
        assert!(map.is_empty());
    }

    #[test]
    fn test_payout_prize_valid() {
        let winner = Winner {
            tournament_id: 1,
            player_id: "P1".to_string(),
            prize: 0,
            backers: vec![
                backer("P1", 1),
                backer("P2", 5),
                backer("P3", -150),
                backer("P4", 0),
            ],
        };
        let mut map = players(&[("P1", 100), ("P2", 100), ("P3", 100), ("P4", 100)]);
        assert!(winner.payout_prize(&mut map).is_ok());
        assert_eq!(
            map,
            players(&[("P1", 101), ("P2", 105), ("P3", -50), ("P4", 100)])
        );
    }

    #[test]
    fn test_payout_prize_overflow_leaves_map_untouched() {
        let winner = Winner {
            tournament_id: 1,
            player_id: "P1".to_string(),
            prize: 2,
            backers: vec![backer("P1", 1), backer("P2", 1)],
        };
        let mut map = players(&[("P1", 0), ("P2", i64::MAX)]);
        assert_eq!(winner.payout_prize(&mut map), Err(Conflict::BalanceOverflow));
        assert_eq!(map, players(&[("P1", 0), ("P2", i64::MAX)]));
    }

    #[test]
    fn test_tournament_json_shape() {
        let json = serde_json::to_value(tournament(100, TournamentState::Open)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 123, "entryDeposit": 100, "state": "open"})
        );
    }
}
