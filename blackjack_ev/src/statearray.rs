use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{AddAssign, Index, RangeInclusive, SubAssign};

use crate::{BlackjackError, BlackjackResult, ACE, MIN_RANK, TEN};

const MOD: u128 = 3817949514078926267; // A prime number with 62 bits.
const BASE: u128 = 211;
const POW_BASE: [u128; 10] = get_powers_of_base();

const fn get_powers_of_base() -> [u128; 10] {
    let mut ret: [u128; 10] = [0; 10];
    ret[0] = 1;

    let mut i = 1;
    while i < ret.len() {
        ret[i] = ret[i - 1] * BASE % MOD;
        i += 1;
    }

    ret
}

/// Position of a rank in a `[_; 10]` array indexed from rank 2 to the ace.
pub(crate) const fn rank_index(rank: u8) -> usize {
    (rank - MIN_RANK) as usize
}

/// Memo table keyed by any canonical state. Entries are created lazily and
/// are never evicted, so the table lives and grows as long as its owner.
#[derive(Debug, Clone)]
pub struct StateArray<K, V> {
    data: HashMap<K, V>,
}

impl<K: Hash + Eq, V> StateArray<K, V> {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn contains_state(&self, state: &K) -> bool {
        self.data.contains_key(state)
    }

    pub fn get(&self, state: &K) -> Option<&V> {
        self.data.get(state)
    }

    pub fn insert(&mut self, state: K, value: V) {
        self.data.insert(state, value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Hash + Eq, V> Default for StateArray<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The numbers of each card rank (2 to 10, then the ace as 11). Used both for
/// hands and for shoe compositions.
///
/// Equal counts always produce the same hash, so the card order of a hand or
/// a shoe never matters when this is used as a memo key.
#[derive(Clone, Copy, Debug, Default)]
pub struct CardCount {
    counts: [u16; 10],
    hash_value: u128,
    sum: u32,
    total: u16,
}

impl CardCount {
    pub fn new(counts: &[u16; 10]) -> CardCount {
        let mut card_count = CardCount {
            counts: *counts,
            hash_value: 0,
            sum: 0,
            total: 0,
        };

        card_count.propagate_counts();

        card_count
    }

    /// A full shoe: `4 * n` of every rank except the ten-valued rank, which
    /// has `16 * n`.
    pub fn with_number_of_decks(number_of_decks: u8) -> CardCount {
        let mut counts = [number_of_decks as u16 * 4; 10];
        counts[rank_index(TEN)] = number_of_decks as u16 * 16;
        Self::new(&counts)
    }

    pub fn from_cards(cards: &[u8]) -> BlackjackResult<CardCount> {
        let mut card_count = CardCount::default();
        for &card in cards {
            validate_rank(card)?;
            card_count.add_card(card);
        }
        Ok(card_count)
    }

    /// Every card rank, from 2 to the ace.
    pub const fn ranks() -> RangeInclusive<u8> {
        MIN_RANK..=ACE
    }

    /// Add a card of given rank.
    ///
    /// Note that this method won't check if the rank is valid.
    pub fn add_card(&mut self, rank: u8) {
        let index = rank_index(rank);
        self.counts[index] += 1;
        self.hash_value = (self.hash_value + POW_BASE[index]) % MOD;
        self.sum += rank as u32;
        self.total += 1;
    }

    /// Remove a card of given rank.
    ///
    /// Note that this method won't check if the rank is valid. It also
    /// won't check if the number of the given rank is already 0.
    pub fn remove_card(&mut self, rank: u8) {
        let index = rank_index(rank);
        self.counts[index] -= 1;
        self.hash_value = (self.hash_value + MOD - POW_BASE[index]) % MOD;
        self.sum -= rank as u32;
        self.total -= 1;
    }

    /// Note that this method treats every ace as 11.
    pub fn get_sum(&self) -> u32 {
        self.sum
    }

    pub fn get_total(&self) -> u16 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Hand value with as many aces demoted to 1 as needed to stay at or
    /// below 21, and whether an ace still counts as 11.
    pub fn value_and_soft(&self) -> (u16, bool) {
        let mut value = self.sum;
        let mut aces = self.counts[rank_index(ACE)];
        while value > 21 && aces > 0 {
            value -= 10;
            aces -= 1;
        }
        (u16::try_from(value).unwrap_or(u16::MAX), aces > 0)
    }

    pub fn bust(&self) -> bool {
        self.value_and_soft().0 > 21
    }

    pub fn is_natural(&self) -> bool {
        self.total == 2 && self.counts[rank_index(ACE)] == 1 && self.counts[rank_index(TEN)] == 1
    }

    /// Returns the paired rank if these are exactly two cards of one rank.
    pub fn pair_rank(&self) -> Option<u8> {
        if self.total != 2 {
            return None;
        }
        Self::ranks().find(|&rank| self[rank] == 2)
    }

    /// Whether every card of `other` is also available here.
    pub fn contains(&self, other: &CardCount) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(mine, theirs)| mine >= theirs)
    }

    /// The cards in ascending rank order.
    pub fn to_cards(&self) -> Vec<u8> {
        let mut cards = Vec::with_capacity(self.total as usize);
        for rank in Self::ranks() {
            for _ in 0..self[rank] {
                cards.push(rank);
            }
        }
        cards
    }

    /// Hi-Lo running count of these cards when they have been seen: +1 for 2
    /// to 6, -1 for ten-valued cards and aces.
    pub fn hilo_running_count(&self) -> i32 {
        let low: i32 = (2..=6).map(|rank| self[rank] as i32).sum();
        let high = self[TEN] as i32 + self[ACE] as i32;
        low - high
    }

    /// Hi-Lo true count when these are the cards seen from a shoe of
    /// `number_of_decks`: the running count per remaining deck.
    pub fn hilo_true_count(&self, number_of_decks: u8) -> f64 {
        let cards_left = (number_of_decks as f64 * 52.0 - self.total as f64).max(1.0);
        self.hilo_running_count() as f64 / (cards_left / 52.0)
    }

    /// The cards of a full shoe of `number_of_decks` that are not in `self`.
    pub fn unseen_from_seen(&self, number_of_decks: u8) -> BlackjackResult<CardCount> {
        let mut unseen = CardCount::with_number_of_decks(number_of_decks);
        if !unseen.contains(self) {
            return Err(BlackjackError::InvalidConfig(format!(
                "more cards seen than a {}-deck shoe holds",
                number_of_decks
            )));
        }
        unseen -= self;
        Ok(unseen)
    }

    fn propagate_counts(&mut self) {
        self.hash_value = 0;
        self.sum = 0;
        self.total = 0;
        for (i, rank) in Self::ranks().enumerate() {
            self.hash_value += (self.counts[i] as u128) * POW_BASE[i];
            self.sum += rank as u32 * self.counts[i] as u32;
            self.total += self.counts[i];
        }
        self.hash_value %= MOD;
    }
}

pub(crate) fn validate_rank(rank: u8) -> BlackjackResult<()> {
    if CardCount::ranks().contains(&rank) {
        Ok(())
    } else {
        Err(BlackjackError::InvalidCard(rank))
    }
}

impl SubAssign<&CardCount> for CardCount {
    fn sub_assign(&mut self, rhs: &CardCount) {
        for i in 0..self.counts.len() {
            self.counts[i] -= rhs.counts[i];
        }

        self.hash_value = (self.hash_value + MOD - rhs.hash_value) % MOD;
        self.total -= rhs.total;
        self.sum -= rhs.sum;
    }
}

impl AddAssign<&CardCount> for CardCount {
    fn add_assign(&mut self, rhs: &CardCount) {
        for i in 0..self.counts.len() {
            self.counts[i] += rhs.counts[i];
        }

        self.hash_value = (self.hash_value + rhs.hash_value) % MOD;
        self.total += rhs.total;
        self.sum += rhs.sum;
    }
}

impl Index<u8> for CardCount {
    type Output = u16;
    fn index(&self, rank: u8) -> &Self::Output {
        &self.counts[rank_index(rank)]
    }
}

impl Hash for CardCount {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u128(self.hash_value);
    }
}

impl PartialEq for CardCount {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}

impl Eq for CardCount {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn generate_random_counts(rng: &mut StdRng, number_of_decks: u8) -> [u16; 10] {
        let mut counts: [u16; 10] = [0; 10];
        for rank in CardCount::ranks() {
            let limit = if rank == TEN { 16 } else { 4 };
            counts[rank_index(rank)] = rng.gen_range(0..=number_of_decks as u16 * limit);
        }
        counts
    }

    fn horner_method(counts: &[u16; 10]) -> u128 {
        let mut ret: u128 = 0;
        for i in (0..10).rev() {
            ret = (ret * BASE + (counts[i] as u128)) % MOD;
        }

        ret
    }

    #[test]
    fn hash_of_card_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for _turn in 0..10 {
            let counts = generate_random_counts(&mut rng, 8);
            let card_count = CardCount::new(&counts);
            assert_eq!(card_count.hash_value, horner_method(&counts));
        }
    }

    #[test]
    fn add_and_remove_keep_hash_in_sync() {
        let mut rng = StdRng::seed_from_u64(11);
        for _turn in 0..10 {
            let mut counts = generate_random_counts(&mut rng, 8);
            let mut card_count = CardCount::new(&counts);
            let rank: u8 = rng.gen_range(2..=11);

            counts[rank_index(rank)] += 1;
            card_count.add_card(rank);
            assert_eq!(card_count.hash_value, horner_method(&counts));

            counts[rank_index(rank)] -= 1;
            card_count.remove_card(rank);
            assert_eq!(card_count.hash_value, horner_method(&counts));
            assert_eq!(card_count, CardCount::new(&counts));
        }
    }

    #[test]
    fn full_shoe_composition() {
        let shoe = CardCount::with_number_of_decks(6);
        for rank in 2..=9 {
            assert_eq!(shoe[rank], 24);
        }
        assert_eq!(shoe[TEN], 96);
        assert_eq!(shoe[ACE], 24);
        assert_eq!(shoe.get_total(), 312);
        assert_eq!(shoe.to_cards().len(), 312);
    }

    #[test]
    fn card_order_does_not_matter() {
        let a = CardCount::from_cards(&[2, 10, 11, 5]).unwrap();
        let b = CardCount::from_cards(&[11, 5, 2, 10]).unwrap();
        assert_eq!(a, b);
        let mut sa: StateArray<CardCount, i32> = StateArray::new();
        sa.insert(a, 666);
        assert_eq!(sa.get(&b), Some(&666));
        assert!(sa.contains_state(&b));
    }

    #[test]
    fn soft_and_hard_values() {
        let hand = CardCount::from_cards(&[11, 6]).unwrap();
        assert_eq!(hand.value_and_soft(), (17, true));
        let hand = CardCount::from_cards(&[11, 6, 10]).unwrap();
        assert_eq!(hand.value_and_soft(), (17, false));
        let hand = CardCount::from_cards(&[11, 11]).unwrap();
        assert_eq!(hand.value_and_soft(), (12, true));
        let hand = CardCount::from_cards(&[11, 11, 11, 10, 9]).unwrap();
        assert_eq!(hand.value_and_soft(), (22, false));
        assert!(hand.bust());
        assert!(CardCount::from_cards(&[10, 11]).unwrap().is_natural());
        assert!(!CardCount::from_cards(&[5, 5, 11]).unwrap().is_natural());
    }

    #[test]
    fn pairs_and_invalid_ranks() {
        assert_eq!(CardCount::from_cards(&[8, 8]).unwrap().pair_rank(), Some(8));
        assert_eq!(CardCount::from_cards(&[8, 9]).unwrap().pair_rank(), None);
        assert_eq!(CardCount::from_cards(&[8, 8, 8]).unwrap().pair_rank(), None);
        assert!(matches!(
            CardCount::from_cards(&[1]),
            Err(BlackjackError::InvalidCard(1))
        ));
        assert!(CardCount::from_cards(&[12]).is_err());
    }

    #[test]
    fn hilo_counts() {
        let seen = CardCount::from_cards(&[2, 3, 4, 7, 8, 9, 10, 11]).unwrap();
        assert_eq!(seen.hilo_running_count(), 1);
        let seen = CardCount::from_cards(&[2; 26]).unwrap();
        // 26 cards seen from one deck leaves half a deck.
        assert_eq!(seen.hilo_true_count(1), 52.0);
    }

    #[test]
    fn unseen_from_seen() {
        let seen = CardCount::from_cards(&[11, 11, 11]).unwrap();
        let unseen = seen.unseen_from_seen(6).unwrap();
        assert_eq!(unseen[ACE], 21);
        assert_eq!(unseen.get_total(), 309);
        let too_many = CardCount::from_cards(&[11; 5]).unwrap();
        assert!(too_many.unseen_from_seen(1).is_err());
    }

    #[test]
    fn card_count_add_sub_assign() {
        let mut cc1 = CardCount::new(&[1, 2, 3, 0, 0, 0, 0, 0, 5, 6]);
        let original = cc1;
        assert_eq!(cc1.get_total(), 17);
        let cc2 = CardCount::new(&[10, 10, 10, 0, 6, 0, 0, 0, 20, 20]);
        cc1 += &cc2;
        assert_eq!(cc1.hash_value, horner_method(&cc1.counts));
        assert_eq!(cc1.get_total(), 17 + cc2.get_total());
        assert_eq!(cc1.get_sum(), original.get_sum() + cc2.get_sum());
        cc1 -= &cc2;
        assert_eq!(cc1, original);
        assert_eq!(cc1.hash_value, original.hash_value);
    }

    #[test]
    fn largest_shoe_keeps_its_sum() {
        let mut shoe = CardCount::with_number_of_decks(u8::MAX);
        assert_eq!(shoe.get_total(), 52 * 255);
        assert_eq!(shoe.get_sum(), 380 * 255);
        shoe.remove_card(ACE);
        assert_eq!(shoe.get_sum(), 380 * 255 - 11);
    }
}
