use approx::assert_abs_diff_eq;
use blackjack_ev::calculation::{ExpectationAll, SolveOptions, Solver};
use blackjack_ev::{CardCount, ACE, TEN};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn six_decks_without_three_aces() -> CardCount {
    let mut unseen = CardCount::with_number_of_decks(6);
    for _ in 0..3 {
        unseen.remove_card(ACE);
    }
    unseen
}

fn assert_expectations(actual: ExpectationAll, expected: [f64; 6]) {
    let values = [
        actual.stand,
        actual.hit,
        actual.double,
        actual.split,
        actual.surrender,
        actual.insurance,
    ];
    for (value, expected) in values.into_iter().zip(expected) {
        if expected == -f64::INFINITY {
            assert!(!ExpectationAll::is_available(value), "{} should be unavailable", value);
        } else {
            assert_abs_diff_eq!(value, expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn pair_of_aces_against_an_ace() {
    let mut solver = Solver::new();
    let options = SolveOptions {
        max_splits: 1,
        ..Default::default()
    };
    let ex = solver
        .solve(&[ACE, ACE], ACE, &six_decks_without_three_aces(), options)
        .unwrap();
    assert_expectations(
        ex,
        [
            -0.6664582487827273,
            -0.022205703672547265,
            -0.6202385156597964,
            0.1271437956545917,
            -0.5,
            -0.033980582524271885,
        ],
    );
}

#[test]
fn pair_of_tens_against_a_ten() {
    let mut solver = Solver::new();
    let options = SolveOptions {
        max_splits: 2,
        ..Default::default()
    };
    let ex = solver
        .solve(&[TEN, TEN], TEN, &six_decks_without_three_aces(), options)
        .unwrap();
    assert_expectations(
        ex,
        [
            0.5542589949582133,
            -0.8662002899228858,
            -1.7324005798457716,
            // Recomputed with the reference solver; older published figures
            // read 0.03259440081835285.
            0.03264991092613634,
            -0.5,
            -f64::INFINITY,
        ],
    );
}

#[test]
fn only_the_composition_matters() {
    let mut rng = StdRng::seed_from_u64(21);
    let mut cards = CardCount::with_number_of_decks(1).to_cards();
    for card in [9, 7, 10] {
        let index = cards.iter().position(|&c| c == card).unwrap();
        cards.remove(index);
    }
    let mut results = Vec::new();
    for _ in 0..3 {
        cards.shuffle(&mut rng);
        let unseen = CardCount::from_cards(&cards).unwrap();
        let ex = Solver::new()
            .solve(&[9, 7], TEN, &unseen, SolveOptions::default())
            .unwrap();
        results.push(ex);
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn higher_totals_beat_the_dealer_more_often() {
    let mut solver = Solver::new();
    let unseen = CardCount::with_number_of_decks(2);
    let options = SolveOptions::default();
    for up in CardCount::ranks() {
        let mut last = 0.0;
        for value in 4..=21 {
            let p = solver.beat_probability(value, up, &unseen, &options).unwrap();
            assert!(p + 1e-15 >= last, "up {} value {}", up, value);
            last = p;
        }
    }
}

/// Split expectation of a pair of eights against a ten from a shoe holding
/// only eights and tens, enumerated without any caching. The dealer stands
/// on 18 or 20 with the hole card and the player busts on any third card
/// past 16.
mod eights_and_tens {
    use super::*;

    #[derive(Clone, Copy)]
    struct Shoe {
        eights: u16,
        tens: u16,
    }

    impl Shoe {
        fn total(&self) -> f64 {
            (self.eights + self.tens) as f64
        }

        fn draws(&self) -> Vec<(u16, f64, Shoe)> {
            let mut draws = Vec::new();
            if self.eights > 0 {
                let rest = Shoe {
                    eights: self.eights - 1,
                    ..*self
                };
                draws.push((8, self.eights as f64 / self.total(), rest));
            }
            if self.tens > 0 {
                let rest = Shoe {
                    tens: self.tens - 1,
                    ..*self
                };
                draws.push((10, self.tens as f64 / self.total(), rest));
            }
            draws
        }

        fn to_card_count(self) -> CardCount {
            let mut counts = [0u16; 10];
            counts[6] = self.eights;
            counts[8] = self.tens;
            CardCount::new(&counts)
        }
    }

    fn stand(value: u16, shoe: Shoe) -> f64 {
        if value > 21 {
            return -1.0;
        }
        let mut beat = 0.0;
        for (hole, p, _) in shoe.draws() {
            let dealer = 10 + hole;
            if value > dealer {
                beat += p;
            } else if value == dealer {
                beat += p * 0.5;
            }
        }
        beat * 2.0 - 1.0
    }

    fn best(first: u16, second: u16, shoe: Shoe, splits: u8) -> f64 {
        let value = first + second;
        let mut best = stand(value, shoe);

        let mut hit = 0.0;
        let mut double = 0.0;
        for (card, p, rest) in shoe.draws() {
            // Three cards from eights and tens stand or bust.
            hit += p * stand(value + card, rest);
            double += p * stand(value + card, rest) * 2.0;
        }
        best = best.max(hit).max(double);
        if first == second && splits > 0 {
            best = best.max(split(first, shoe, splits));
        }
        best
    }

    fn split(rank: u16, shoe: Shoe, splits: u8) -> f64 {
        let remaining = splits - 1;
        let mut total = 0.0;
        for (card, p, first_rest) in shoe.draws() {
            for (card2, p2, both_rest) in first_rest.draws() {
                let (first_budget, second_budget) = if card == rank {
                    (remaining, 0)
                } else {
                    (0, remaining)
                };
                total += p
                    * p2
                    * (best(rank, card, both_rest, first_budget) + best(rank, card2, both_rest, second_budget));
            }
        }
        total
    }

    #[test]
    fn split_budget_matches_enumeration() {
        for (eights, tens) in [(6, 6), (4, 9), (9, 3)] {
            let shoe = Shoe { eights, tens };
            for budget in [1, 2] {
                let mut solver = Solver::new();
                let options = SolveOptions {
                    max_splits: budget,
                    ..Default::default()
                };
                let ex = solver
                    .solve(&[8, 8], TEN, &shoe.to_card_count(), options)
                    .unwrap();
                assert_abs_diff_eq!(ex.split, split(8, shoe, budget), epsilon = 1e-12);
            }
        }
    }
}
