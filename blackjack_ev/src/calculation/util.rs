use crate::statearray::rank_index;
use crate::{CardCount, ACE, TEN};

/// Probability of each rank (indexed from 2 to the ace) being the next card
/// drawn from `unseen`.
///
/// When the dealer has peeked and found no blackjack, the hole card is known
/// not to complete one. The draw is then conditioned on that: every possible
/// hole card is taken out in turn, weighted by its probability among the
/// non-blackjack ranks. An empty composition yields all zeros.
pub fn draw_probabilities(unseen: &CardCount, dealer_up_card: u8, dealer_peeked: bool) -> [f64; 10] {
    let blackjack_rank = match dealer_up_card {
        ACE => TEN,
        TEN => ACE,
        _ => 0,
    };
    if !dealer_peeked || blackjack_rank == 0 {
        return plain_probabilities(unseen);
    }

    let total = unseen.get_total();
    let total_without_blackjack = total - unseen[blackjack_rank];
    if total < 2 || total_without_blackjack == 0 {
        return plain_probabilities(unseen);
    }

    let mut probabilities = [0.0; 10];
    let total_after_hole_card = (total - 1) as f64;
    for hole_card in CardCount::ranks() {
        if hole_card == blackjack_rank || unseen[hole_card] == 0 {
            continue;
        }
        let p_hole_card = unseen[hole_card] as f64 / total_without_blackjack as f64;
        for card in CardCount::ranks() {
            let mut remaining = unseen[card] as f64;
            if card == hole_card {
                remaining -= 1.0;
            }
            probabilities[rank_index(card)] += remaining / total_after_hole_card * p_hole_card;
        }
    }
    probabilities
}

pub(crate) fn plain_probabilities(unseen: &CardCount) -> [f64; 10] {
    let mut probabilities = [0.0; 10];
    let total = unseen.get_total();
    if total == 0 {
        return probabilities;
    }
    for card in CardCount::ranks() {
        probabilities[rank_index(card)] = unseen[card] as f64 / total as f64;
    }
    probabilities
}

/// Probabilities of the dealer's hole card once a peek has ruled out a
/// blackjack with a one-card hand worth `dealer_value`.
pub(crate) fn no_blackjack_probabilities(unseen: &CardCount, dealer_value: u16) -> [f64; 10] {
    let mut probabilities = [0.0; 10];
    let completes_blackjack = |card: u8| card as u16 + dealer_value == 21;
    let total: u16 = CardCount::ranks()
        .filter(|&card| !completes_blackjack(card))
        .map(|card| unseen[card])
        .sum();
    if total == 0 {
        return probabilities;
    }
    for card in CardCount::ranks() {
        if !completes_blackjack(card) {
            probabilities[rank_index(card)] = unseen[card] as f64 / total as f64;
        }
    }
    probabilities
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_composition(rng: &mut StdRng) -> CardCount {
        let mut counts = [0u16; 10];
        for count in counts.iter_mut() {
            *count = rng.gen_range(0..=24);
        }
        counts[rank_index(TEN)] = rng.gen_range(1..=96);
        counts[rank_index(ACE)] = rng.gen_range(1..=24);
        CardCount::new(&counts)
    }

    #[test]
    fn probabilities_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let unseen = random_composition(&mut rng);
            for up in CardCount::ranks() {
                for peeked in [false, true] {
                    let sum: f64 = draw_probabilities(&unseen, up, peeked).iter().sum();
                    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
                }
                let sum: f64 = no_blackjack_probabilities(&unseen, up as u16).iter().sum();
                assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn peek_makes_tens_likelier_under_an_ace() {
        let unseen = CardCount::with_number_of_decks(1);
        let plain = draw_probabilities(&unseen, ACE, false);
        let peeked = draw_probabilities(&unseen, ACE, true);
        assert!(peeked[rank_index(TEN)] > plain[rank_index(TEN)]);
        assert!(peeked[rank_index(5)] < plain[rank_index(5)]);
        assert_eq!(draw_probabilities(&unseen, 7, true), plain);
    }

    #[test]
    fn hole_card_cannot_complete_blackjack() {
        let unseen = CardCount::with_number_of_decks(2);
        assert_eq!(no_blackjack_probabilities(&unseen, 11)[rank_index(TEN)], 0.0);
        assert_eq!(no_blackjack_probabilities(&unseen, 10)[rank_index(ACE)], 0.0);
    }

    #[test]
    fn empty_composition_has_no_draws() {
        let empty = CardCount::default();
        assert_eq!(draw_probabilities(&empty, ACE, true), [0.0; 10]);
        assert_eq!(no_blackjack_probabilities(&empty, 10), [0.0; 10]);
    }
}
