use super::util::draw_probabilities;
use super::{SolveOptions, Solver};
use crate::statearray::rank_index;
use crate::{CardCount, ACE};

impl Solver {
    /// Expected return of splitting a pair of `pair_rank`, summed over both
    /// sub-hands.
    ///
    /// The first sub-hand draws, then the second draws from what is left, and
    /// both are played against the same remaining composition. The remaining
    /// split budget goes to whichever sub-hand was dealt another `pair_rank`,
    /// the first one winning when both were. Split aces without further
    /// decisions just stand on their two cards.
    pub(super) fn split_expectation(
        &mut self,
        pair_rank: u8,
        dealer_up_card: u8,
        unseen: &CardCount,
        options: SolveOptions,
        probabilities: &[f64; 10],
    ) -> f64 {
        let remaining_splits = options.max_splits.saturating_sub(1);
        let sub_options = SolveOptions {
            can_double: options.can_double && options.allow_das,
            can_insure: false,
            can_surrender: false,
            ..options
        };
        let peeked = options.peek_policy.dealer_peeks(dealer_up_card);
        let aces_stand = pair_rank == ACE && !options.allow_decisions_after_split_aces;

        let mut expectation = 0.0;
        for card in CardCount::ranks() {
            if unseen[card] == 0 {
                continue;
            }
            let mut first_unseen = *unseen;
            first_unseen.remove_card(card);
            let second_probabilities = draw_probabilities(&first_unseen, dealer_up_card, peeked);

            for card2 in CardCount::ranks() {
                if first_unseen[card2] == 0 {
                    continue;
                }
                let mut both_unseen = first_unseen;
                both_unseen.remove_card(card2);
                let weight = probabilities[rank_index(card)] * second_probabilities[rank_index(card2)];

                let mut first = CardCount::default();
                first.add_card(pair_rank);
                first.add_card(card);
                let mut second = CardCount::default();
                second.add_card(pair_rank);
                second.add_card(card2);

                let value = if aces_stand {
                    self.stand_expectation(first.value_and_soft().0, dealer_up_card, &both_unseen, &options)
                        + self.stand_expectation(
                            second.value_and_soft().0,
                            dealer_up_card,
                            &both_unseen,
                            &options,
                        )
                } else {
                    let (first_splits, second_splits) = if pair_rank == ACE {
                        (0, 0)
                    } else if card == pair_rank {
                        (remaining_splits, 0)
                    } else {
                        (0, remaining_splits)
                    };
                    self.best_expectation(
                        &first,
                        dealer_up_card,
                        &both_unseen,
                        SolveOptions {
                            max_splits: first_splits,
                            ..sub_options
                        },
                    ) + self.best_expectation(
                        &second,
                        dealer_up_card,
                        &both_unseen,
                        SolveOptions {
                            max_splits: second_splits,
                            ..sub_options
                        },
                    )
                };
                expectation += value * weight;
            }
        }
        expectation
    }
}
