use super::util::{no_blackjack_probabilities, plain_probabilities};
use super::Solver;
use crate::statearray::rank_index;
use crate::{CardCount, ACE};

/// Distribution of the dealer's final hand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DealerOutcomes {
    bust: f64,
    // Index 0 to 4 for a final total of 17 to 21.
    totals: [f64; 5],
    natural: f64,
}

impl DealerOutcomes {
    pub fn p_bust(&self) -> f64 {
        self.bust
    }

    pub fn p_natural(&self) -> f64 {
        self.natural
    }

    /// Probability of the dealer ending on `total` without a natural.
    pub fn p_total(&self, total: u16) -> f64 {
        match total {
            17..=21 => self.totals[(total - 17) as usize],
            _ => 0.0,
        }
    }

    /// Chance of a player standing on `player_value` beating the dealer, with
    /// a push counted as half a win. A dealer natural beats every total.
    pub fn beat_probability(&self, player_value: u16) -> f64 {
        if player_value > 21 {
            return 0.0;
        }
        let mut p = self.bust;
        for dealer_value in 17..=21 {
            let p_total = self.p_total(dealer_value);
            if dealer_value < player_value {
                p += p_total;
            } else if dealer_value == player_value {
                p += p_total * 0.5;
            }
        }
        p
    }

    fn add_assign_with_p(&mut self, rhs: &Self, p: f64) {
        self.bust += rhs.bust * p;
        for i in 0..self.totals.len() {
            self.totals[i] += rhs.totals[i] * p;
        }
        self.natural += rhs.natural * p;
    }

    fn end_with(&mut self, dealer_value: u16, natural: bool, p: f64) {
        if dealer_value > 21 {
            self.bust += p;
        } else if natural {
            self.natural += p;
        } else {
            self.totals[(dealer_value - 17) as usize] += p;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct DealerState {
    value: u16,
    soft: bool,
    unseen: CardCount,
    more_than_one_card: bool,
    peeked: bool,
    hit_soft17: bool,
}

/// The dealer's hand after drawing `card`. At most one ace is demoted, which
/// is always enough since the dealer only draws below 17 or on soft 17.
fn dealer_draw(value: u16, soft: bool, card: u8) -> (u16, bool) {
    let mut value = value + card as u16;
    let mut aces = soft as u8 + (card == ACE) as u8;
    if value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }
    (value, aces > 0)
}

fn dealer_must_hit(value: u16, soft: bool, hit_soft17: bool) -> bool {
    value < 17 || value == 17 && soft && hit_soft17
}

impl Solver {
    /// Final-hand distribution of a dealer holding `dealer_value` and drawing
    /// from `unseen`. With a single card and a peek that found nothing, the
    /// hole card is drawn from the ranks that cannot complete a blackjack.
    ///
    /// A composition that runs dry before the dealer stands contributes no
    /// outcome at all.
    pub(super) fn dealer_outcomes(
        &mut self,
        dealer_value: u16,
        soft: bool,
        unseen: &CardCount,
        more_than_one_card: bool,
        peeked: bool,
        hit_soft17: bool,
    ) -> DealerOutcomes {
        let state = DealerState {
            value: dealer_value,
            soft,
            unseen: *unseen,
            more_than_one_card,
            peeked: peeked && !more_than_one_card,
            hit_soft17,
        };
        if let Some(outcomes) = self.dealer_memo.get(&state) {
            return *outcomes;
        }

        let probabilities = if state.peeked {
            no_blackjack_probabilities(unseen, dealer_value)
        } else {
            plain_probabilities(unseen)
        };

        let mut outcomes = DealerOutcomes::default();
        for card in CardCount::ranks() {
            let p = probabilities[rank_index(card)];
            if p == 0.0 {
                continue;
            }
            let (value, soft) = dealer_draw(dealer_value, soft, card);
            if dealer_must_hit(value, soft, hit_soft17) {
                let mut next_unseen = *unseen;
                next_unseen.remove_card(card);
                let next = self.dealer_outcomes(value, soft, &next_unseen, true, peeked, hit_soft17);
                outcomes.add_assign_with_p(&next, p);
            } else {
                outcomes.end_with(value, !more_than_one_card && value == 21, p);
            }
        }

        self.dealer_memo.insert(state, outcomes);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TEN;
    use approx::assert_abs_diff_eq;

    fn total_probability(outcomes: &DealerOutcomes) -> f64 {
        outcomes.p_bust() + outcomes.p_natural() + (17..=21).map(|v| outcomes.p_total(v)).sum::<f64>()
    }

    #[test]
    fn outcomes_form_a_distribution() {
        let mut solver = Solver::new();
        let unseen = CardCount::with_number_of_decks(6);
        for up in CardCount::ranks() {
            for peeked in [false, true] {
                for hit_soft17 in [false, true] {
                    let outcomes =
                        solver.dealer_outcomes(up as u16, up == ACE, &unseen, false, peeked, hit_soft17);
                    assert_abs_diff_eq!(total_probability(&outcomes), 1.0, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn peek_rules_out_naturals() {
        let mut solver = Solver::new();
        let unseen = CardCount::with_number_of_decks(6);
        let peeked = solver.dealer_outcomes(11, true, &unseen, false, true, false);
        assert_eq!(peeked.p_natural(), 0.0);
        let unpeeked = solver.dealer_outcomes(11, true, &unseen, false, false, false);
        assert_abs_diff_eq!(unpeeked.p_natural(), 96.0 / 312.0, epsilon = 1e-12);
        let ten = solver.dealer_outcomes(TEN as u16, false, &unseen, false, false, false);
        assert_abs_diff_eq!(ten.p_natural(), 24.0 / 312.0, epsilon = 1e-12);
    }

    #[test]
    fn beat_probability_is_monotone() {
        let mut solver = Solver::new();
        let unseen = CardCount::with_number_of_decks(6);
        for up in CardCount::ranks() {
            let outcomes = solver.dealer_outcomes(up as u16, up == ACE, &unseen, false, true, false);
            let mut last = 0.0;
            for player_value in 4..=21 {
                let p = outcomes.beat_probability(player_value);
                assert!(p + 1e-15 >= last, "up {} value {}", up, player_value);
                last = p;
            }
            assert_eq!(outcomes.beat_probability(22), 0.0);
            // Below 17 only a dealer bust wins.
            assert_eq!(outcomes.beat_probability(16), outcomes.p_bust());
        }
    }

    #[test]
    fn dealer_soft_17_rule() {
        assert!(!dealer_must_hit(17, true, false));
        assert!(dealer_must_hit(17, true, true));
        assert!(!dealer_must_hit(17, false, true));
        assert_eq!(dealer_draw(16, true, ACE), (17, true));
        assert_eq!(dealer_draw(16, false, ACE), (17, false));
        assert_eq!(dealer_draw(16, true, TEN), (16, false));
    }

    #[test]
    fn dealer_memo_is_reused() {
        let mut solver = Solver::new();
        let unseen = CardCount::with_number_of_decks(1);
        let first = solver.dealer_outcomes(6, false, &unseen, false, false, false);
        let entries = solver.dealer_cache_len();
        let second = solver.dealer_outcomes(6, false, &unseen, false, false, false);
        assert_eq!(first, second);
        assert_eq!(entries, solver.dealer_cache_len());
    }
}
