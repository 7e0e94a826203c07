use crate::{CardCount, ACE};

/// A player's or the dealer's cards. The value is always derived from the
/// cards, never stored on its own.
#[derive(Debug, Clone, Default)]
pub struct Hand {
    cards: Vec<u8>,
    card_count: CardCount,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(3),
            card_count: CardCount::default(),
        }
    }

    /// Note that this won't check if the ranks are valid.
    pub fn from_cards(cards: &[u8]) -> Hand {
        let mut hand = Hand::new();
        for &card in cards {
            hand.receive_card(card);
        }
        hand
    }

    pub fn receive_card(&mut self, card: u8) {
        self.cards.push(card);
        self.card_count.add_card(card);
    }

    /// Splits off the second card into a new hand, leaving the first one here.
    pub fn split(&mut self) -> Hand {
        let mut new_hand = Hand::new();
        if let Some(card) = self.cards.pop() {
            self.card_count.remove_card(card);
            new_hand.receive_card(card);
        }
        new_hand
    }

    pub fn get_cards(&self) -> &[u8] {
        &self.cards
    }

    pub fn get_card_count(&self) -> &CardCount {
        &self.card_count
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn value(&self) -> u16 {
        self.card_count.value_and_soft().0
    }

    pub fn is_soft(&self) -> bool {
        self.card_count.value_and_soft().1
    }

    pub fn bust(&self) -> bool {
        self.value() > 21
    }

    pub fn is_natural(&self) -> bool {
        self.card_count.is_natural()
    }

    pub fn pair_rank(&self) -> Option<u8> {
        self.card_count.pair_rank()
    }

    pub fn is_pair_of_aces(&self) -> bool {
        self.pair_rank() == Some(ACE)
    }

    /// Whether a dealer holding this hand must draw another card.
    pub fn dealer_must_hit(&self, dealer_hit_on_soft17: bool) -> bool {
        let (value, soft) = self.card_count.value_and_soft();
        value < 17 || value == 17 && soft && dealer_hit_on_soft17
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.card_count = CardCount::default();
    }
}
