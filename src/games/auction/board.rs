//! Columns of ranked cards and the meeples climbing them.
//!
//! Every column has an unbounded bottom row (rank 0), one card per rank
//! `1..=height`, and an unbounded top row (rank `height + 1`). A meeple's
//! location is the only record of where it is; card occupancy is derived
//! from it, so a meeple can never sit on two cards at once.

use serde::{Deserialize, Serialize};

use crate::engine::models::PlayerId;
use super::cards::Card;
use super::types::{ColumnId, Faction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "row", rename_all = "lowercase")]
pub enum Location {
    Bottom,
    Cell { rank: usize, cell: usize },
    Top,
}

impl Location {
    /// Scenario key, e.g. `bottom`, `r3.1`, `top`.
    pub fn to_key(&self) -> String {
        match self {
            Location::Bottom => "bottom".into(),
            Location::Top => "top".into(),
            Location::Cell { rank, cell } => format!("r{}.{}", rank, cell),
        }
    }

    pub fn from_key(key: &str) -> Option<Location> {
        match key {
            "bottom" => Some(Location::Bottom),
            "top" => Some(Location::Top),
            _ => {
                let (rank, cell) = key.strip_prefix('r')?.split_once('.')?;
                Some(Location::Cell {
                    rank: rank.parse().ok()?,
                    cell: cell.parse().ok()?,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeple {
    pub id: usize,
    pub owner: PlayerId,
    pub column: ColumnId,
    pub location: Location,
}

impl Meeple {
    /// Scenario key, e.g. `c2:r3.0`.
    pub fn placement_key(&self) -> String {
        format!("c{}:{}", self.column, self.location.to_key())
    }
}

/// Parse a `c<column>:<location>` placement key.
pub fn parse_placement(key: &str) -> Option<(ColumnId, Location)> {
    let (column, location) = key.strip_prefix('c')?.split_once(':')?;
    Some((column.parse().ok()?, Location::from_key(location)?))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    /// `cards[0]` is rank 1.
    pub cards: Vec<Card>,
}

impl Column {
    pub fn height(&self) -> usize {
        self.cards.len()
    }

    pub fn top_rank(&self) -> usize {
        self.cards.len() + 1
    }

    pub fn card_at(&self, rank: usize) -> Option<&Card> {
        if rank == 0 {
            return None;
        }
        self.cards.get(rank - 1)
    }
}

/// A legal move of one meeple up one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    pub meeple: usize,
    /// Target cell on the next card; `None` when moving into the top row.
    pub cell: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub meeple: usize,
    pub column: ColumnId,
    pub from: Location,
    pub to: Location,
    /// The opponent meeple pushed down into `from`, if any.
    pub bumped: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub columns: Vec<Column>,
    pub meeples: Vec<Meeple>,
}

impl Board {
    /// Deal `cards` into `n_columns` columns of `n_ranks` cards each, cycling
    /// through the deck if it runs short, and start one meeple per player in
    /// the bottom row of every column.
    pub fn deal(cards: &[Card], n_columns: usize, n_ranks: usize, players: &[PlayerId]) -> Self {
        let mut deck = cards.iter().cycle();
        let columns = (1..=n_columns)
            .map(|id| Column {
                id,
                cards: (0..n_ranks).filter_map(|_| deck.next().cloned()).collect(),
            })
            .collect();

        let mut board = Board {
            columns,
            meeples: Vec::new(),
        };
        for pid in players {
            for column in 1..=n_columns {
                board.add_meeple(pid, column, Location::Bottom);
            }
        }
        board
    }

    pub fn add_meeple(&mut self, owner: &str, column: ColumnId, location: Location) -> usize {
        let id = self.meeples.len();
        self.meeples.push(Meeple {
            id,
            owner: owner.into(),
            column,
            location,
        });
        id
    }

    pub fn column(&self, column: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column)
    }

    pub fn card_at(&self, column: ColumnId, rank: usize) -> Option<&Card> {
        self.column(column)?.card_at(rank)
    }

    pub fn meeple(&self, id: usize) -> Option<&Meeple> {
        self.meeples.get(id)
    }

    pub fn meeples_of<'a>(&'a self, player_id: &'a str) -> impl Iterator<Item = &'a Meeple> + 'a {
        self.meeples.iter().filter(move |m| m.owner == player_id)
    }

    /// Rank number of a location within `column`.
    pub fn rank_of(&self, column: ColumnId, location: Location) -> usize {
        match location {
            Location::Bottom => 0,
            Location::Cell { rank, .. } => rank,
            Location::Top => self.column(column).map(|c| c.top_rank()).unwrap_or(1),
        }
    }

    pub fn faction_at(&self, column: ColumnId, location: Location) -> Option<Faction> {
        match location {
            Location::Cell { rank, cell } => self.card_at(column, rank)?.cell_faction(cell),
            Location::Bottom | Location::Top => None,
        }
    }

    pub fn meeple_faction(&self, meeple: &Meeple) -> Option<Faction> {
        self.faction_at(meeple.column, meeple.location)
    }

    pub fn occupant(&self, column: ColumnId, location: Location) -> Option<&Meeple> {
        match location {
            Location::Cell { .. } => self
                .meeples
                .iter()
                .find(|m| m.column == column && m.location == location),
            Location::Bottom | Location::Top => None,
        }
    }

    /// Whether `location` exists in `column` and can hold a meeple.
    pub fn is_valid_location(&self, column: ColumnId, location: Location) -> bool {
        match location {
            Location::Bottom | Location::Top => self.column(column).is_some(),
            Location::Cell { rank, cell } => self
                .card_at(column, rank)
                .map(|card| cell < card.capacity())
                .unwrap_or(false),
        }
    }

    /// Count of a player's meeples sitting on cards of `rank` in any column.
    pub fn meeples_at_rank(&self, player_id: &str, rank: usize) -> usize {
        self.meeples_of(player_id)
            .filter(|m| matches!(m.location, Location::Cell { rank: r, .. } if r == rank))
            .count()
    }

    pub fn max_height(&self) -> usize {
        self.columns.iter().map(|c| c.height()).max().unwrap_or(0)
    }

    /// Every column's top row holds at least one meeple.
    pub fn top_row_full(&self) -> bool {
        !self.columns.is_empty()
            && self.columns.iter().all(|c| {
                self.meeples
                    .iter()
                    .any(|m| m.column == c.id && m.location == Location::Top)
            })
    }

    fn target_of(&self, meeple: &Meeple) -> Option<(usize, Option<&Card>)> {
        let column = self.column(meeple.column)?;
        let rank = self.rank_of(meeple.column, meeple.location);
        if rank >= column.top_rank() {
            return None;
        }
        let next = rank + 1;
        Some((next, column.card_at(next)))
    }

    /// All advances available to `player_id` in `column`.
    pub fn valid_advances(&self, column: ColumnId, player_id: &str) -> Vec<Advance> {
        let mut advances = Vec::new();
        for meeple in self.meeples_of(player_id).filter(|m| m.column == column) {
            let Some((next, card)) = self.target_of(meeple) else {
                continue;
            };
            match card {
                None => advances.push(Advance {
                    meeple: meeple.id,
                    cell: None,
                }),
                Some(card) => {
                    for cell in 0..card.capacity() {
                        let target = Location::Cell { rank: next, cell };
                        let own = self
                            .occupant(column, target)
                            .map(|m| m.owner == player_id)
                            .unwrap_or(false);
                        if !own {
                            advances.push(Advance {
                                meeple: meeple.id,
                                cell: Some(cell),
                            });
                        }
                    }
                }
            }
        }
        advances
    }

    /// Move a meeple up one rank. An opponent on the target cell is bumped
    /// down into the location the mover left.
    pub fn advance(&mut self, meeple_id: usize, cell: Option<usize>) -> Result<AdvanceOutcome, String> {
        let meeple = self
            .meeple(meeple_id)
            .ok_or_else(|| format!("unknown meeple {}", meeple_id))?;
        let (next, card) = self
            .target_of(meeple)
            .ok_or_else(|| format!("meeple {} is already in the top row", meeple_id))?;

        let to = match (card, cell) {
            (None, None) => Location::Top,
            (None, Some(_)) => return Err("the top row has no cells".into()),
            (Some(_), None) => return Err(format!("a cell on rank {} must be chosen", next)),
            (Some(card), Some(cell)) => {
                if cell >= card.capacity() {
                    return Err(format!(
                        "card {} has no cell {} (capacity {})",
                        card.name,
                        cell,
                        card.capacity()
                    ));
                }
                Location::Cell { rank: next, cell }
            }
        };

        let column = meeple.column;
        let from = meeple.location;
        let owner = meeple.owner.clone();

        let bumped = match self.occupant(column, to) {
            Some(other) if other.owner == owner => {
                return Err("cannot bump your own meeple".into());
            }
            Some(other) => Some(other.id),
            None => None,
        };

        if let Some(other) = bumped {
            self.meeples[other].location = from;
        }
        self.meeples[meeple_id].location = to;

        Ok(AdvanceOutcome {
            meeple: meeple_id,
            column,
            from,
            to,
            bumped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::auction::cards::CardKind;

    fn card(name: &str, kind: CardKind, factions: &[Faction]) -> Card {
        Card {
            name: name.into(),
            kind,
            factions: factions.to_vec(),
        }
    }

    fn small_board() -> Board {
        let cards = vec![
            card("single-red", CardKind::Single, &[Faction::Red]),
            card("dual-blue-gold", CardKind::Dual, &[Faction::Blue, Faction::Gold]),
        ];
        Board::deal(&cards, 1, 2, &["p0".to_string(), "p1".to_string()])
    }

    #[test]
    fn test_location_keys() {
        for loc in [Location::Bottom, Location::Top, Location::Cell { rank: 3, cell: 1 }] {
            assert_eq!(Location::from_key(&loc.to_key()), Some(loc));
        }
        assert_eq!(Location::from_key("r3"), None);
        assert_eq!(parse_placement("c2:r1.0"), Some((2, Location::Cell { rank: 1, cell: 0 })));
        assert_eq!(parse_placement("2:r1.0"), None);
    }

    #[test]
    fn test_deal_cycles_deck() {
        let cards = vec![card("single-red", CardKind::Single, &[Faction::Red])];
        let board = Board::deal(&cards, 3, 2, &["p0".to_string()]);
        assert_eq!(board.columns.len(), 3);
        assert!(board.columns.iter().all(|c| c.height() == 2));
        assert_eq!(board.meeples.len(), 3);
        assert!(board.meeples.iter().all(|m| m.location == Location::Bottom));
    }

    #[test]
    fn test_advance_into_free_cell() {
        let mut board = small_board();
        let advances = board.valid_advances(1, "p0");
        assert_eq!(advances, vec![Advance { meeple: 0, cell: Some(0) }]);

        let outcome = board.advance(0, Some(0)).unwrap();
        assert_eq!(outcome.from, Location::Bottom);
        assert_eq!(outcome.to, Location::Cell { rank: 1, cell: 0 });
        assert_eq!(outcome.bumped, None);
        assert_eq!(board.meeple_faction(&board.meeples[0]), Some(Faction::Red));
    }

    #[test]
    fn test_advance_bumps_opponent_down() {
        let mut board = small_board();
        board.advance(0, Some(0)).unwrap();
        // p1's meeple (id 1) climbs into the occupied single card.
        let outcome = board.advance(1, Some(0)).unwrap();
        assert_eq!(outcome.bumped, Some(0));
        assert_eq!(board.meeples[0].location, Location::Bottom);
        assert_eq!(board.meeples[1].location, Location::Cell { rank: 1, cell: 0 });
        let occupied: Vec<_> = board
            .meeples
            .iter()
            .filter(|m| m.location == Location::Cell { rank: 1, cell: 0 })
            .collect();
        assert_eq!(occupied.len(), 1);
    }

    #[test]
    fn test_cannot_bump_own_meeple() {
        let mut board = small_board();
        board.add_meeple("p0", 1, Location::Bottom);
        board.advance(0, Some(0)).unwrap();
        assert!(board.valid_advances(1, "p0").iter().all(|a| a.meeple != 2));
        assert!(board.advance(2, Some(0)).is_err());
    }

    #[test]
    fn test_advance_to_top_and_stop() {
        let mut board = small_board();
        board.advance(0, Some(0)).unwrap();
        board.advance(0, Some(1)).unwrap();
        assert_eq!(board.meeple_faction(&board.meeples[0]), Some(Faction::Gold));
        assert!(board.advance(0, Some(0)).is_err());
        board.advance(0, None).unwrap();
        assert_eq!(board.meeples[0].location, Location::Top);
        assert_eq!(board.meeple_faction(&board.meeples[0]), None);
        assert!(board.valid_advances(1, "p0").is_empty());
        assert!(board.advance(0, None).is_err());
        assert!(board.top_row_full());
    }

    #[test]
    fn test_meeples_at_rank() {
        let mut board = small_board();
        board.advance(0, Some(0)).unwrap();
        assert_eq!(board.meeples_at_rank("p0", 1), 1);
        assert_eq!(board.meeples_at_rank("p0", 0), 0);
        assert_eq!(board.meeples_at_rank("p1", 1), 0);
    }
}
