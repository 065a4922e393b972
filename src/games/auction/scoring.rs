//! Colour-match scoring for an advancing meeple and end-of-round rank scoring.

use std::collections::BTreeMap;

use super::board::Board;
use super::types::{Faction, PlayerState};

/// Score for a meeple of `player` that just arrived on a `faction` cell:
/// the player's meeples of that faction, plus their non-clear bid cards
/// carrying it, plus their score-track markers of it.
pub fn color_match_delta(board: &Board, player: &PlayerState, faction: Faction) -> u32 {
    let meeples = board
        .meeples_of(&player.player_id)
        .filter(|m| board.meeple_faction(m) == Some(faction))
        .count();
    let cards = player.bid_cards.iter().filter(|c| c.matches(faction)).count();
    let markers = player.markers.iter().filter(|&&f| f == faction).count();
    (meeples + cards + markers) as u32
}

/// `sum(meeples at rank r * r)` over the card ranks. The bottom and top rows
/// never score.
pub fn rank_score(board: &Board, player_id: &str) -> u32 {
    (1..=board.max_height())
        .map(|rank| (board.meeples_at_rank(player_id, rank) * rank) as u32)
        .sum()
}

/// Rank score for every player, keyed by player id.
pub fn score_round_end(board: &Board, players: &[PlayerState]) -> BTreeMap<String, u32> {
    players
        .iter()
        .map(|p| (p.player_id.clone(), rank_score(board, &p.player_id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::auction::board::Location;
    use crate::games::auction::cards::{Card, CardKind};
    use crate::games::auction::types::{BidCard, BidState};
    use proptest::prelude::*;

    fn board_of(cards: Vec<Card>, n_ranks: usize) -> Board {
        Board::deal(&cards, 1, n_ranks, &[])
    }

    fn single(f: Faction) -> Card {
        Card {
            name: format!("single-{}", f),
            kind: CardKind::Single,
            factions: vec![f],
        }
    }

    fn player(cards: Vec<BidCard>, markers: Vec<Faction>) -> PlayerState {
        PlayerState {
            player_id: "p".into(),
            color: "orange".into(),
            coins: 0,
            score: 0,
            markers,
            bid_cards: cards,
        }
    }

    fn committed(name: &str, factions: Vec<Faction>, state: BidState) -> BidCard {
        let mut card = BidCard::new(name, 2, factions);
        card.state = state;
        card.column = Some(1);
        card
    }

    #[test]
    fn test_color_match_example() {
        // One red meeple, two non-clear red cards, one red marker.
        let mut board = board_of(vec![single(Faction::Red)], 1);
        board.add_meeple("p", 1, Location::Cell { rank: 1, cell: 0 });
        let p = player(
            vec![
                committed("bid-2-red", vec![Faction::Red], BidState::Won),
                committed("bid-2-red-blue", vec![Faction::Red, Faction::Blue], BidState::Outbid),
                committed("bid-3-red", vec![Faction::Red], BidState::Clear),
                committed("bid-2-gold", vec![Faction::Gold], BidState::Cancelled),
            ],
            vec![Faction::Red, Faction::Blue],
        );
        assert_eq!(color_match_delta(&board, &p, Faction::Red), 1 + 2 + 1);
    }

    #[test]
    fn test_color_match_ignores_other_players() {
        let mut board = board_of(vec![single(Faction::Red), single(Faction::Red)], 2);
        board.add_meeple("p", 1, Location::Cell { rank: 1, cell: 0 });
        board.add_meeple("q", 1, Location::Cell { rank: 2, cell: 0 });
        let p = player(vec![], vec![]);
        assert_eq!(color_match_delta(&board, &p, Faction::Red), 1);
        assert_eq!(color_match_delta(&board, &p, Faction::Blue), 0);
    }

    #[test]
    fn test_rank_score_excludes_bottom_and_top() {
        let mut board = board_of(vec![single(Faction::Red); 3], 3);
        board.add_meeple("p", 1, Location::Bottom);
        board.add_meeple("p", 1, Location::Top);
        assert_eq!(rank_score(&board, "p"), 0);
        board.add_meeple("p", 1, Location::Cell { rank: 3, cell: 0 });
        assert_eq!(rank_score(&board, "p"), 3);
    }

    #[test]
    fn test_score_round_end_per_player() {
        let cards = vec![
            Card {
                name: "black".into(),
                kind: CardKind::Black,
                factions: vec![Faction::Black],
            };
            2
        ];
        let mut board = board_of(cards, 2);
        board.add_meeple("p", 1, Location::Cell { rank: 2, cell: 0 });
        board.add_meeple("p", 1, Location::Cell { rank: 2, cell: 1 });
        board.add_meeple("q", 1, Location::Cell { rank: 1, cell: 0 });
        let players = vec![
            player(vec![], vec![]),
            PlayerState {
                player_id: "q".into(),
                ..player(vec![], vec![])
            },
        ];
        let scores = score_round_end(&board, &players);
        assert_eq!(scores["p"], 4);
        assert_eq!(scores["q"], 1);
    }

    proptest! {
        #[test]
        fn prop_one_more_meeple_adds_its_rank(
            placements in prop::collection::vec((1usize..=4, 0usize..3), 0..8),
            extra_rank in 1usize..=4,
        ) {
            let black = Card {
                name: "black".into(),
                kind: CardKind::Black,
                factions: vec![Faction::Black],
            };
            let mut board = board_of(vec![black; 4], 4);
            for (rank, cell) in placements {
                board.add_meeple("p", 1, Location::Cell { rank, cell });
            }
            let before = rank_score(&board, "p");
            board.add_meeple("p", 1, Location::Cell { rank: extra_rank, cell: 0 });
            prop_assert_eq!(rank_score(&board, "p"), before + extra_rank as u32);
        }
    }
}
