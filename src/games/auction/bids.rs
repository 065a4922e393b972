//! Bid ledger and per-column bid resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::models::PlayerId;
use super::rules::TiePolicy;
use super::types::{BidState, ColumnId, PlayerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub player_id: PlayerId,
    pub column: ColumnId,
    pub value: u32,
}

/// Result of resolving one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOutcome {
    /// Nobody bid on the column.
    NoBids,
    /// Ties eliminated the top of the field and nobody won.
    AllCancelled {
        cancelled: Vec<PlayerId>,
        outbid: Vec<PlayerId>,
    },
    Won {
        winner: PlayerId,
        value: u32,
        cancelled: Vec<PlayerId>,
        outbid: Vec<PlayerId>,
    },
}

impl ColumnOutcome {
    pub fn winner(&self) -> Option<&str> {
        match self {
            ColumnOutcome::Won { winner, .. } => Some(winner.as_str()),
            _ => None,
        }
    }

    pub fn cancelled(&self) -> &[PlayerId] {
        match self {
            ColumnOutcome::NoBids => &[],
            ColumnOutcome::AllCancelled { cancelled, .. } | ColumnOutcome::Won { cancelled, .. } => {
                cancelled
            }
        }
    }

    pub fn outbid(&self) -> &[PlayerId] {
        match self {
            ColumnOutcome::NoBids => &[],
            ColumnOutcome::AllCancelled { outbid, .. } | ColumnOutcome::Won { outbid, .. } => outbid,
        }
    }
}

/// Resolve the bids placed on a single column.
///
/// Bids are sorted by value, highest first. A unique maximum wins. A tied
/// maximum is cancelled as a group; under [`TiePolicy::Cascade`] the next
/// highest value is then considered, under [`TiePolicy::Void`] the column
/// has no winner and the lower bids are outbid.
pub fn resolve_column(bids: &[Bid], policy: TiePolicy) -> ColumnOutcome {
    if bids.is_empty() {
        return ColumnOutcome::NoBids;
    }

    // Stable sort keeps seat order inside equal values.
    let mut remaining: Vec<&Bid> = bids.iter().collect();
    remaining.sort_by(|a, b| b.value.cmp(&a.value));

    let mut cancelled = Vec::new();
    while let Some(top) = remaining.first() {
        let max = top.value;
        let tied = remaining.iter().take_while(|b| b.value == max).count();

        if tied == 1 {
            let outbid = remaining[1..].iter().map(|b| b.player_id.clone()).collect();
            return ColumnOutcome::Won {
                winner: top.player_id.clone(),
                value: max,
                cancelled,
                outbid,
            };
        }

        cancelled.extend(remaining.drain(..tied).map(|b| b.player_id.clone()));

        if policy == TiePolicy::Void {
            let outbid = remaining.iter().map(|b| b.player_id.clone()).collect();
            return ColumnOutcome::AllCancelled { cancelled, outbid };
        }
    }

    ColumnOutcome::AllCancelled {
        cancelled,
        outbid: Vec::new(),
    }
}

/// Bids for the current round, grouped by column. Rebuilt from the players'
/// committed bid cards whenever it is needed.
#[derive(Debug, Clone, Default)]
pub struct BidLedger {
    columns: BTreeMap<ColumnId, Vec<Bid>>,
}

impl BidLedger {
    pub fn from_players(players: &[PlayerState]) -> Self {
        let mut ledger = Self::default();
        for player in players {
            for card in &player.bid_cards {
                if card.state != BidState::Committed {
                    continue;
                }
                if let Some(column) = card.column {
                    ledger.record(Bid {
                        player_id: player.player_id.clone(),
                        column,
                        value: card.value,
                    });
                }
            }
        }
        ledger
    }

    pub fn record(&mut self, bid: Bid) {
        self.columns.entry(bid.column).or_default().push(bid);
    }

    pub fn bids_for(&self, column: ColumnId) -> &[Bid] {
        self.columns.get(&column).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.columns.values().all(|v| v.is_empty())
    }

    /// Resolve every column `1..=n_columns`, in column order.
    pub fn resolve_all(&self, n_columns: usize, policy: TiePolicy) -> Vec<(ColumnId, ColumnOutcome)> {
        (1..=n_columns)
            .map(|column| (column, resolve_column(self.bids_for(column), policy)))
            .collect()
    }
}

/// Flag each player's committed card on `column` with the resolution result.
pub fn mark_bid_cards(players: &mut [PlayerState], column: ColumnId, outcome: &ColumnOutcome) {
    for player in players.iter_mut() {
        let new_state = if outcome.winner() == Some(player.player_id.as_str()) {
            BidState::Won
        } else if outcome.cancelled().contains(&player.player_id) {
            BidState::Cancelled
        } else if outcome.outbid().contains(&player.player_id) {
            BidState::Outbid
        } else {
            continue;
        };
        for card in player.bid_cards.iter_mut() {
            if card.state == BidState::Committed && card.column == Some(column) {
                card.state = new_state;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::auction::types::{BidCard, Faction};
    use proptest::prelude::*;

    fn bid(pid: &str, value: u32) -> Bid {
        Bid {
            player_id: pid.into(),
            column: 1,
            value,
        }
    }

    #[test]
    fn test_no_bids() {
        assert_eq!(resolve_column(&[], TiePolicy::Cascade), ColumnOutcome::NoBids);
        assert_eq!(resolve_column(&[], TiePolicy::Void), ColumnOutcome::NoBids);
    }

    #[test]
    fn test_single_bid_wins() {
        let outcome = resolve_column(&[bid("a", 1)], TiePolicy::Cascade);
        assert_eq!(outcome.winner(), Some("a"));
    }

    #[test]
    fn test_highest_bid_wins_and_outbids() {
        let outcome = resolve_column(&[bid("a", 2), bid("b", 4), bid("c", 1)], TiePolicy::Cascade);
        assert_eq!(
            outcome,
            ColumnOutcome::Won {
                winner: "b".into(),
                value: 4,
                cancelled: vec![],
                outbid: vec!["a".into(), "c".into()],
            }
        );
    }

    #[test]
    fn test_tie_cascades_to_next_bid() {
        let outcome = resolve_column(&[bid("a", 3), bid("b", 3), bid("c", 2)], TiePolicy::Cascade);
        assert_eq!(
            outcome,
            ColumnOutcome::Won {
                winner: "c".into(),
                value: 2,
                cancelled: vec!["a".into(), "b".into()],
                outbid: vec![],
            }
        );
    }

    #[test]
    fn test_tie_void_policy_has_no_winner() {
        let outcome = resolve_column(&[bid("a", 3), bid("b", 3), bid("c", 2)], TiePolicy::Void);
        assert_eq!(
            outcome,
            ColumnOutcome::AllCancelled {
                cancelled: vec!["a".into(), "b".into()],
                outbid: vec!["c".into()],
            }
        );
    }

    #[test]
    fn test_transitive_ties_cancel_everyone() {
        let bids = [bid("a", 3), bid("b", 3), bid("c", 2), bid("d", 2)];
        let outcome = resolve_column(&bids, TiePolicy::Cascade);
        assert_eq!(outcome.winner(), None);
        assert_eq!(outcome.cancelled().len(), 4);
        assert_ne!(outcome, ColumnOutcome::NoBids);
    }

    #[test]
    fn test_ledger_from_players() {
        let mut card = BidCard::new("bid-3-red", 3, vec![Faction::Red]);
        card.state = BidState::Committed;
        card.column = Some(2);
        let clear = BidCard::new("bid-1-red", 1, vec![Faction::Red]);
        let player = PlayerState {
            player_id: "p0".into(),
            color: "orange".into(),
            coins: 5,
            score: 0,
            markers: vec![],
            bid_cards: vec![card, clear],
        };
        let ledger = BidLedger::from_players(&[player]);
        assert!(ledger.bids_for(1).is_empty());
        assert_eq!(ledger.bids_for(2), &[Bid { player_id: "p0".into(), column: 2, value: 3 }]);

        let all = ledger.resolve_all(3, TiePolicy::Cascade);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].1, ColumnOutcome::NoBids);
        assert_eq!(all[1].1.winner(), Some("p0"));
    }

    #[test]
    fn test_mark_bid_cards() {
        let make = |pid: &str, value: u32| {
            let mut card = BidCard::new(&format!("bid-{}-red", value), value, vec![Faction::Red]);
            card.state = BidState::Committed;
            card.column = Some(1);
            PlayerState {
                player_id: pid.into(),
                color: "x".into(),
                coins: 10,
                score: 0,
                markers: vec![],
                bid_cards: vec![card],
            }
        };
        let mut players = vec![make("a", 3), make("b", 3), make("c", 2), make("d", 1)];
        let bids: Vec<Bid> = BidLedger::from_players(&players).bids_for(1).to_vec();
        let outcome = resolve_column(&bids, TiePolicy::Cascade);
        mark_bid_cards(&mut players, 1, &outcome);

        assert_eq!(players[0].bid_cards[0].state, BidState::Cancelled);
        assert_eq!(players[1].bid_cards[0].state, BidState::Cancelled);
        assert_eq!(players[2].bid_cards[0].state, BidState::Won);
        assert_eq!(players[3].bid_cards[0].state, BidState::Outbid);
    }

    fn arb_bids() -> impl Strategy<Value = Vec<Bid>> {
        prop::collection::vec(1u32..6, 0..7).prop_map(|values| {
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| Bid {
                    player_id: format!("p{}", i),
                    column: 1,
                    value: v,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_winner_strictly_beats_remaining(bids in arb_bids()) {
            let outcome = resolve_column(&bids, TiePolicy::Cascade);
            if let ColumnOutcome::Won { winner, value, cancelled, outbid } = &outcome {
                prop_assert!(!cancelled.contains(winner));
                for b in &bids {
                    if outbid.contains(&b.player_id) {
                        prop_assert!(b.value < *value);
                    }
                }
                let holders = bids.iter().filter(|b| b.value == *value).count();
                prop_assert_eq!(holders, 1);
            }
        }

        #[test]
        fn prop_tied_maximum_never_wins(bids in arb_bids()) {
            let outcome = resolve_column(&bids, TiePolicy::Cascade);
            if let Some(max) = bids.iter().map(|b| b.value).max() {
                let at_max: Vec<&Bid> = bids.iter().filter(|b| b.value == max).collect();
                if at_max.len() > 1 {
                    for b in at_max {
                        prop_assert!(outcome.winner() != Some(b.player_id.as_str()));
                        prop_assert!(outcome.cancelled().contains(&b.player_id));
                    }
                }
            }
        }

        #[test]
        fn prop_every_bidder_accounted_once(bids in arb_bids()) {
            for policy in [TiePolicy::Cascade, TiePolicy::Void] {
                let outcome = resolve_column(&bids, policy);
                let winners = outcome.winner().into_iter().count();
                prop_assert_eq!(
                    winners + outcome.cancelled().len() + outcome.outbid().len(),
                    bids.len()
                );
            }
        }
    }
}
