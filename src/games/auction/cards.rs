//! Card kinds, the card catalog, and the per-session context that owns them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{BidCard, Faction};

/// Card subtype. Decides how many meeples a card holds and which faction each
/// cell carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Single,
    Dual,
    Black,
}

impl CardKind {
    pub fn max_cells(self) -> usize {
        match self {
            CardKind::Single => 1,
            CardKind::Dual => 2,
            CardKind::Black => 3,
        }
    }

    /// Faction of `cell` on a card of this kind carrying `factions`.
    pub fn cell_faction(self, factions: &[Faction], cell: usize) -> Option<Faction> {
        if cell >= self.max_cells() {
            return None;
        }
        match self {
            CardKind::Black => Some(Faction::Black),
            CardKind::Single | CardKind::Dual => {
                factions.get(cell).or_else(|| factions.first()).copied()
            }
        }
    }
}

/// A column card. Cards are identified by name in scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub kind: CardKind,
    pub factions: Vec<Faction>,
}

impl Card {
    pub fn capacity(&self) -> usize {
        self.kind.max_cells()
    }

    pub fn cell_faction(&self, cell: usize) -> Option<Faction> {
        self.kind.cell_faction(&self.factions, cell)
    }

    /// Faction awarded as a score-track marker when a meeple tops out above
    /// this card.
    pub fn marker_faction(&self) -> Faction {
        match self.kind {
            CardKind::Black => Faction::Black,
            _ => self.factions.first().copied().unwrap_or(Faction::Black),
        }
    }
}

/// Name-addressable card specs plus the copy counts that make up a deck.
#[derive(Debug, Clone)]
pub struct CardCatalog {
    column_cards: BTreeMap<String, (Card, usize)>,
    bid_cards: BTreeMap<String, (BidCard, usize)>,
}

impl CardCatalog {
    pub fn empty() -> Self {
        Self {
            column_cards: BTreeMap::new(),
            bid_cards: BTreeMap::new(),
        }
    }

    /// The standard set: 3 copies of each single, one of each dual pair,
    /// 2 black cards; bid cards 1..=4 in every colour plus dual-faction 2s.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();

        for f in Faction::COLORS {
            catalog.add_column_card(
                Card {
                    name: format!("single-{}", f),
                    kind: CardKind::Single,
                    factions: vec![f],
                },
                3,
            );
        }
        for (i, a) in Faction::COLORS.iter().enumerate() {
            for b in &Faction::COLORS[i + 1..] {
                catalog.add_column_card(
                    Card {
                        name: format!("dual-{}-{}", a, b),
                        kind: CardKind::Dual,
                        factions: vec![*a, *b],
                    },
                    1,
                );
            }
        }
        catalog.add_column_card(
            Card {
                name: "black".into(),
                kind: CardKind::Black,
                factions: vec![Faction::Black],
            },
            2,
        );

        for f in Faction::COLORS {
            for value in 1..=4 {
                let name = format!("bid-{}-{}", value, f);
                catalog.add_bid_card(BidCard::new(&name, value, vec![f]), 1);
            }
        }
        for (i, a) in Faction::COLORS.iter().enumerate() {
            for b in &Faction::COLORS[i + 1..] {
                let name = format!("bid-2-{}-{}", a, b);
                catalog.add_bid_card(BidCard::new(&name, 2, vec![*a, *b]), 1);
            }
        }

        catalog
    }

    pub fn add_column_card(&mut self, card: Card, copies: usize) {
        self.column_cards.insert(card.name.clone(), (card, copies));
    }

    pub fn add_bid_card(&mut self, card: BidCard, copies: usize) {
        self.bid_cards.insert(card.name.clone(), (card, copies));
    }

    pub fn column_card(&self, name: &str) -> Option<&Card> {
        self.column_cards.get(name).map(|(c, _)| c)
    }

    /// A fresh, clear copy of the named bid card.
    pub fn bid_card(&self, name: &str) -> Option<BidCard> {
        self.bid_cards.get(name).map(|(c, _)| {
            let mut card = c.clone();
            card.clear();
            card
        })
    }

    pub fn column_deck(&self) -> Vec<Card> {
        self.column_cards
            .values()
            .flat_map(|(c, n)| std::iter::repeat(c.clone()).take(*n))
            .collect()
    }

    pub fn bid_deck(&self) -> Vec<BidCard> {
        self.bid_cards
            .values()
            .flat_map(|(c, n)| std::iter::repeat(c.clone()).take(*n))
            .collect()
    }
}

/// Everything a game session looks up by name or seat. Created when a session
/// starts and dropped with it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub catalog: CardCatalog,
    pub color_scheme: Vec<String>,
}

impl SessionContext {
    pub fn standard() -> Self {
        Self {
            catalog: CardCatalog::standard(),
            color_scheme: ["orange", "teal", "violet", "white", "brown"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn color_for(&self, seat: usize) -> String {
        if self.color_scheme.is_empty() {
            return format!("seat-{}", seat);
        }
        self.color_scheme[seat % self.color_scheme.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_kind_capacity() {
        assert_eq!(CardKind::Single.max_cells(), 1);
        assert_eq!(CardKind::Dual.max_cells(), 2);
        assert_eq!(CardKind::Black.max_cells(), 3);
    }

    #[test]
    fn test_cell_factions() {
        let dual = [Faction::Red, Faction::Gold];
        assert_eq!(CardKind::Dual.cell_faction(&dual, 0), Some(Faction::Red));
        assert_eq!(CardKind::Dual.cell_faction(&dual, 1), Some(Faction::Gold));
        assert_eq!(CardKind::Dual.cell_faction(&dual, 2), None);
        assert_eq!(CardKind::Single.cell_faction(&[Faction::Blue], 0), Some(Faction::Blue));
        assert_eq!(CardKind::Black.cell_faction(&[], 2), Some(Faction::Black));
    }

    #[test]
    fn test_standard_catalog_sizes() {
        let catalog = CardCatalog::standard();
        assert_eq!(catalog.column_deck().len(), 12 + 6 + 2);
        assert_eq!(catalog.bid_deck().len(), 16 + 6);
        assert!(catalog.column_card("dual-red-blue").is_some());
        assert!(catalog.column_card("dual-blue-red").is_none());
        let bid = catalog.bid_card("bid-3-green").unwrap();
        assert_eq!(bid.value, 3);
        assert!(bid.is_clear());
    }

    #[test]
    fn test_color_scheme_wraps() {
        let ctx = SessionContext::standard();
        assert_eq!(ctx.color_for(0), "orange");
        assert_eq!(ctx.color_for(5), "orange");
    }
}
