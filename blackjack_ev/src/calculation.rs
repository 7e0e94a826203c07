mod dealer_play;
mod split_ex;
mod util;

use tracing::debug;

use crate::statearray::{rank_index, validate_rank};
use crate::{
    BlackjackError, BlackjackResult, CardCount, Decision, PeekPolicy, Rule, StateArray, ACE, TEN,
};

use self::dealer_play::DealerState;
pub use self::dealer_play::DealerOutcomes;
pub use self::util::draw_probabilities;

const SURRENDER_EXPECTATION: f64 = -0.5;

/// Expected returns of every action, in units of the initial bet. An action
/// that is not available holds `-f64::INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectationAll {
    pub stand: f64,
    pub hit: f64,
    pub double: f64,
    pub split: f64,
    pub surrender: f64,

    pub insurance: f64,
}

impl Default for ExpectationAll {
    fn default() -> Self {
        Self {
            stand: -f64::INFINITY,
            hit: -f64::INFINITY,
            double: -f64::INFINITY,
            split: -f64::INFINITY,
            surrender: -f64::INFINITY,

            insurance: -f64::INFINITY,
        }
    }
}

impl ExpectationAll {
    pub fn is_available(expectation: f64) -> bool {
        expectation != -f64::INFINITY
    }

    pub fn get(&self, decision: Decision) -> f64 {
        match decision {
            Decision::Stand => self.stand,
            Decision::Hit => self.hit,
            Decision::Double => self.double,
            Decision::Split => self.split,
            Decision::Surrender => self.surrender,
        }
    }

    /// The best playing decision. Ties go to the earlier of stand, hit,
    /// double, split and surrender.
    pub fn get_max_expectation(&self) -> (f64, Decision) {
        let (mut mx_ex, mut decision) = (self.stand, Decision::Stand);
        if mx_ex < self.hit {
            (mx_ex, decision) = (self.hit, Decision::Hit);
        }
        if mx_ex < self.double {
            (mx_ex, decision) = (self.double, Decision::Double);
        }
        if mx_ex < self.split {
            (mx_ex, decision) = (self.split, Decision::Split);
        }
        if mx_ex < self.surrender {
            (mx_ex, decision) = (self.surrender, Decision::Surrender);
        }

        (mx_ex, decision)
    }
}

/// The best action with its expectation, and the expectation of insurance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMove {
    pub decision: Decision,
    pub expectation: f64,
    pub insurance: f64,
}

impl BestMove {
    pub fn should_insure(&self) -> bool {
        self.insurance > 0.0
    }
}

/// Eligibility flags and table rules of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SolveOptions {
    pub can_double: bool,
    pub can_insure: bool,
    pub can_surrender: bool,
    pub max_splits: u8,
    pub peek_policy: PeekPolicy,
    pub allow_das: bool,
    pub dealer_hit_on_soft17: bool,
    pub allow_decisions_after_split_aces: bool,
}

impl SolveOptions {
    /// Options for the first decision of a round under `rule`.
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            can_double: true,
            can_insure: true,
            can_surrender: rule.allow_late_surrender,
            max_splits: rule.max_splits,
            peek_policy: rule.peek_policy,
            allow_das: rule.allow_das,
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            allow_decisions_after_split_aces: rule.allow_decisions_after_split_aces,
        }
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self::from_rule(&Rule::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PlayerState {
    hand: CardCount,
    dealer_up_card: u8,
    unseen: CardCount,
    options: SolveOptions,
}

/// Exact expected-value solver.
///
/// Results are pure functions of the hand, the dealer's up card, the unseen
/// composition and the options, so every computed state is memoized for the
/// lifetime of the solver.
#[derive(Debug, Clone)]
pub struct Solver {
    player_memo: StateArray<PlayerState, ExpectationAll>,
    dealer_memo: StateArray<DealerState, DealerOutcomes>,
    payout_insurance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::with_insurance_payout(Rule::default().payout_insurance)
    }

    /// Insurance costs half the bet and pays `payout_insurance` to 1.
    pub fn with_insurance_payout(payout_insurance: f64) -> Self {
        Self {
            player_memo: StateArray::new(),
            dealer_memo: StateArray::new(),
            payout_insurance,
        }
    }

    /// Expected returns of every action for `hand` against `dealer_up_card`,
    /// with `unseen` the cards that may still be drawn (the dealer's hole card
    /// included).
    pub fn solve(
        &mut self,
        hand: &[u8],
        dealer_up_card: u8,
        unseen: &CardCount,
        options: SolveOptions,
    ) -> BlackjackResult<ExpectationAll> {
        validate_rank(dealer_up_card)?;
        let hand = CardCount::from_cards(hand)?;
        if hand.is_empty() {
            return Err(BlackjackError::EmptyHand);
        }
        if unseen.is_empty() {
            return Err(BlackjackError::EmptyShoe);
        }

        let expectations = self.solve_card_count(&hand, dealer_up_card, unseen, options);
        debug!(
            player_states = self.player_memo.len(),
            dealer_states = self.dealer_memo.len(),
            "solved"
        );
        Ok(expectations)
    }

    /// Like `solve`, but only reports the best action and insurance.
    pub fn best_move(
        &mut self,
        hand: &[u8],
        dealer_up_card: u8,
        unseen: &CardCount,
        options: SolveOptions,
    ) -> BlackjackResult<BestMove> {
        let expectations = self.solve(hand, dealer_up_card, unseen, options)?;
        let (expectation, decision) = expectations.get_max_expectation();
        Ok(BestMove {
            decision,
            expectation,
            insurance: expectations.insurance,
        })
    }

    /// Chance of a final `hand_value` beating the dealer, a push counting as
    /// half. The dealer resolves from `dealer_up_card` drawing from `unseen`.
    pub fn beat_probability(
        &mut self,
        hand_value: u16,
        dealer_up_card: u8,
        unseen: &CardCount,
        options: &SolveOptions,
    ) -> BlackjackResult<f64> {
        validate_rank(dealer_up_card)?;
        if unseen.is_empty() {
            return Err(BlackjackError::EmptyShoe);
        }
        let peeked = options.peek_policy.dealer_peeks(dealer_up_card);
        let outcomes = self.dealer_outcomes(
            dealer_up_card as u16,
            dealer_up_card == ACE,
            unseen,
            false,
            peeked,
            options.dealer_hit_on_soft17,
        );
        Ok(outcomes.beat_probability(hand_value))
    }

    pub fn player_cache_len(&self) -> usize {
        self.player_memo.len()
    }

    pub fn dealer_cache_len(&self) -> usize {
        self.dealer_memo.len()
    }

    pub fn clear(&mut self) {
        self.player_memo.clear();
        self.dealer_memo.clear();
    }

    /// Clears the eligibility that the hand shape rules out, so equivalent
    /// states share one memo entry.
    fn solve_card_count(
        &mut self,
        hand: &CardCount,
        dealer_up_card: u8,
        unseen: &CardCount,
        mut options: SolveOptions,
    ) -> ExpectationAll {
        if !(hand.get_total() == 1 || hand.pair_rank().is_some()) {
            options.max_splits = 0;
        }
        if hand.get_total() > 2 {
            options.can_double = false;
            options.can_insure = false;
            options.can_surrender = false;
        }

        let state = PlayerState {
            hand: *hand,
            dealer_up_card,
            unseen: *unseen,
            options,
        };
        if let Some(expectations) = self.player_memo.get(&state) {
            return *expectations;
        }
        let expectations = self.calculate_expectations(&state);
        self.player_memo.insert(state, expectations);
        expectations
    }

    fn best_expectation(
        &mut self,
        hand: &CardCount,
        dealer_up_card: u8,
        unseen: &CardCount,
        options: SolveOptions,
    ) -> f64 {
        self.solve_card_count(hand, dealer_up_card, unseen, options)
            .get_max_expectation()
            .0
    }

    /// Expected return of standing on `hand_value`.
    fn stand_expectation(
        &mut self,
        hand_value: u16,
        dealer_up_card: u8,
        unseen: &CardCount,
        options: &SolveOptions,
    ) -> f64 {
        let peeked = options.peek_policy.dealer_peeks(dealer_up_card);
        let outcomes = self.dealer_outcomes(
            dealer_up_card as u16,
            dealer_up_card == ACE,
            unseen,
            false,
            peeked,
            options.dealer_hit_on_soft17,
        );
        outcomes.beat_probability(hand_value) * 2.0 - 1.0
    }

    fn calculate_expectations(&mut self, state: &PlayerState) -> ExpectationAll {
        let PlayerState {
            hand,
            dealer_up_card: up,
            unseen,
            options,
        } = *state;
        let mut ex = ExpectationAll::default();

        let (value, _) = hand.value_and_soft();
        if value > 21 {
            ex.stand = -1.0;
            return ex;
        }

        let peeked = options.peek_policy.dealer_peeks(up);
        let probabilities = draw_probabilities(&unseen, up, peeked);

        ex.stand = self.stand_expectation(value, up, &unseen, &options);

        if options.can_double && hand.get_total() == 2 {
            let mut profit = 0.0;
            for card in CardCount::ranks() {
                if unseen[card] == 0 {
                    continue;
                }
                let mut next_hand = hand;
                next_hand.add_card(card);
                let mut next_unseen = unseen;
                next_unseen.remove_card(card);
                let (next_value, _) = next_hand.value_and_soft();
                profit += self.stand_expectation(next_value, up, &next_unseen, &options)
                    * probabilities[rank_index(card)];
            }
            ex.double = profit * 2.0;
        }

        if options.can_surrender && hand.get_total() == 2 {
            ex.surrender = SURRENDER_EXPECTATION;
        }

        if options.can_insure && up == ACE && hand.get_total() == 2 {
            // Insurance is decided before the peek, so the tens are not conditioned.
            let p_ten = unseen[TEN] as f64 / unseen.get_total() as f64;
            ex.insurance = 0.5 * self.payout_insurance * p_ten - 0.5 * (1.0 - p_ten);
        }

        let after_hit = SolveOptions {
            can_insure: false,
            can_surrender: false,
            ..options
        };
        let mut profit = 0.0;
        for card in CardCount::ranks() {
            if unseen[card] == 0 {
                continue;
            }
            let p = probabilities[rank_index(card)];
            let mut next_hand = hand;
            next_hand.add_card(card);
            if next_hand.value_and_soft().0 <= 21 {
                let mut next_unseen = unseen;
                next_unseen.remove_card(card);
                profit += self.best_expectation(&next_hand, up, &next_unseen, after_hit) * p;
            } else {
                profit -= p;
            }
        }
        ex.hit = profit;

        if let Some(pair_rank) = hand.pair_rank() {
            if options.max_splits >= 1 {
                ex.split = self.split_expectation(pair_rank, up, &unseen, options, &probabilities);
            }
        }

        ex
    }
}
