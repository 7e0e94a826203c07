use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{BlackjackError, BlackjackResult, CardCount, TEN};

/// How many shuffles `hilo_generator` tries before giving up on a target.
const MAX_GENERATOR_ATTEMPTS: usize = 10_000;
/// Width of the accepted band around the target true count.
const TRUE_COUNT_TOLERANCE: f64 = 0.3;

/// Represents a shoe in the real world. Cards are dealt from the end of the
/// sequence, so the last element is the next card.
#[derive(Debug, Clone)]
pub struct Shoe {
    number_of_decks: u8,
    cut_card_index: usize,
    cards: Vec<u8>,
    card_count: CardCount,
    cards_dealt: usize,
    rng: StdRng,
}

impl Shoe {
    /// Creates a new shoe with ordered cards. The random generator used by
    /// every later shuffle is seeded with `seed`.
    pub fn new(number_of_decks: u8, cut_card_proportion: f64, seed: u64) -> Shoe {
        let card_count = CardCount::with_number_of_decks(number_of_decks);
        Shoe {
            number_of_decks,
            cut_card_index: (cut_card_proportion * card_count.get_total() as f64) as usize,
            cards: card_count.to_cards(),
            card_count,
            cards_dealt: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the dealt cards back into the shoe and shuffles.
    pub fn shuffle(&mut self) {
        self.card_count = CardCount::with_number_of_decks(self.number_of_decks);
        self.cards = self.card_count.to_cards();
        self.cards.shuffle(&mut self.rng);
        self.cards_dealt = 0;
        debug!(number_of_decks = self.number_of_decks, "shoe shuffled");
    }

    /// Returns the dealt cards back into the shoe, and shuffles. This method makes sure the given
    /// first few cards are dealt first, in the given order. Fails if the shoe doesn't hold them.
    pub fn shuffle_with_firsts(&mut self, firsts: &[u8]) -> BlackjackResult<()> {
        let mut rest = CardCount::with_number_of_decks(self.number_of_decks);
        let firsts_count = CardCount::from_cards(firsts)?;
        if !rest.contains(&firsts_count) {
            return Err(BlackjackError::InvalidConfig(String::from(
                "the given first cards are not all in the shoe",
            )));
        }
        rest -= &firsts_count;

        let mut cards = rest.to_cards();
        cards.shuffle(&mut self.rng);
        cards.extend(firsts.iter().rev());
        self.cards = cards;
        self.card_count = CardCount::with_number_of_decks(self.number_of_decks);
        self.cards_dealt = 0;
        Ok(())
    }

    /// Deals the next card.
    pub fn deal_card(&mut self) -> BlackjackResult<u8> {
        let card = self.cards.pop().ok_or(BlackjackError::EmptyShoe)?;
        self.card_count.remove_card(card);
        self.cards_dealt += 1;
        Ok(card)
    }

    /// Checks if the cut card has been reached.
    pub fn reached_cut_card(&self) -> bool {
        self.cards_dealt >= self.cut_card_index
    }

    /// The cards still in the shoe.
    pub fn get_card_count(&self) -> &CardCount {
        &self.card_count
    }

    /// The cards dealt since the last shuffle.
    pub fn cards_seen(&self) -> CardCount {
        let mut seen = CardCount::with_number_of_decks(self.number_of_decks);
        seen -= &self.card_count;
        seen
    }

    /// The remaining cards in draw order, last element first.
    pub fn remaining_cards(&self) -> &[u8] {
        &self.cards
    }

    pub fn number_of_decks(&self) -> u8 {
        self.number_of_decks
    }
}

/// Hi-Lo true count of a shoe from the cards still in it.
pub fn unseen_hilo_true_count(unseen: &[u8]) -> f64 {
    if unseen.is_empty() {
        return 0.0;
    }
    let running_count: i32 = unseen.iter().map(|&card| unseen_hilo_value(card)).sum();
    running_count as f64 / (unseen.len() as f64 / 52.0)
}

// Signs are reversed because these are the cards not yet seen.
fn unseen_hilo_value(card: u8) -> i32 {
    match card {
        2..=6 => -1,
        c if c >= TEN => 1,
        _ => 0,
    }
}

/// Generates a randomly ordered shoe (draw order, last element first) whose
/// Hi-Lo true count lies within 0.3 of `true_count`, on the side away from
/// zero. The shoe starts from `number_of_decks` minus `cards_present` and
/// keeps at least as many cards as remain at the cut card.
pub fn hilo_generator<R: Rng>(
    rng: &mut R,
    true_count: f64,
    number_of_decks: u8,
    cut_card_proportion: f64,
    cards_present: &[u8],
) -> BlackjackResult<Vec<u8>> {
    let max_true_count = if true_count >= 0.0 {
        true_count + TRUE_COUNT_TOLERANCE
    } else {
        true_count
    };
    let min_true_count = if true_count <= 0.0 {
        true_count - TRUE_COUNT_TOLERANCE
    } else {
        true_count
    };

    let mut all_cards = CardCount::with_number_of_decks(number_of_decks);
    let present = CardCount::from_cards(cards_present)?;
    if !all_cards.contains(&present) {
        return Err(BlackjackError::InvalidConfig(String::from(
            "the present cards are not all in the shoe",
        )));
    }
    all_cards -= &present;
    let min_len = (52.0 * number_of_decks as f64 * (1.0 - cut_card_proportion)).ceil() as usize;

    let mut shoe = all_cards.to_cards();
    for _ in 0..MAX_GENERATOR_ATTEMPTS {
        shoe.shuffle(rng);
        // Every prefix is a shoe with some cards already drawn from its end.
        let mut running_count: i32 = shoe.iter().map(|&card| unseen_hilo_value(card)).sum();
        let mut good_lengths = Vec::new();
        for len in (min_len.max(1)..=shoe.len()).rev() {
            let tc = running_count as f64 / (len as f64 / 52.0);
            if min_true_count <= tc && tc <= max_true_count {
                good_lengths.push(len);
            }
            running_count -= unseen_hilo_value(shoe[len - 1]);
        }
        if let Some(&len) = good_lengths.choose(rng) {
            shoe.truncate(len);
            return Ok(shoe);
        }
    }

    Err(BlackjackError::InvalidConfig(format!(
        "cannot generate a shoe with a true count of {}",
        true_count
    )))
}
