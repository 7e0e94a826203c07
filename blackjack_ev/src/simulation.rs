pub mod hand;
pub mod shoe;
pub mod statistics;

use blackjack_ev_macros::allowed_phase;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::betting::Better;
use crate::strategy::{MoveContext, Mover};
use crate::{BlackjackError, BlackjackResult, CardCount, Decision, Rule, ACE, TEN};

use self::hand::Hand;
use self::shoe::Shoe;
pub use self::statistics::{SimulationResult, Statistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    DealInitialCards,
    PlaceBets,
    PlayHands,
    DealerPlayAndSummary,
    StartNewShoe,
}

/// How one player hand ended before the dealer plays.
#[derive(Debug, Clone, Copy, PartialEq)]
enum HandResult {
    Standing { value: u16, wager: f64 },
    Bust { wager: f64 },
    Surrendered,
}

/// What one round did to the player, in money units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundOutcome {
    pub bet: u32,
    pub profit: f64,
    pub wagered: f64,
    pub splits: u8,
    pub insured: bool,
}

/// Observer of a running simulation. Every method does nothing by default.
pub trait SimulatorEventHandler {
    fn on_shuffle(&mut self, _shoe: &Shoe) {}
    fn on_bet_money(&mut self, _bet: u32) {}
    fn on_make_decision(&mut self, _decision: Decision, _hand: &Hand) {}
    fn on_summary_game(&mut self, _outcome: &RoundOutcome, _dealer_hand: &Hand) {}
}

impl SimulatorEventHandler for () {}

/// A single-seat blackjack table driven round by round. Each method may only
/// be called in its own phase; `play_round` runs a whole round.
///
/// Note that a round with a zero bet is still played, so the cards it uses
/// leave the shoe.
pub struct Table {
    rule: Rule,

    current_game_phase: GamePhase,
    shoe: Shoe,
    dealer_hand: Hand,
    player_hand: Hand,
    bet: u32,

    results: Vec<HandResult>,
    // Set when the round was decided by a natural before any play.
    early_profit: Option<f64>,
    insurance_profit: f64,
    insured: bool,
    splits: u8,
}

impl Table {
    pub fn new(rule: &Rule, seed: u64) -> BlackjackResult<Table> {
        rule.validate()?;
        let mut shoe = Shoe::new(rule.number_of_decks, rule.cut_card_proportion, seed);
        shoe.shuffle();
        Ok(Table {
            rule: *rule,
            current_game_phase: GamePhase::DealInitialCards,
            shoe,
            dealer_hand: Hand::new(),
            player_hand: Hand::new(),
            bet: 0,
            results: Vec::with_capacity(4),
            early_profit: None,
            insurance_profit: 0.0,
            insured: false,
            splits: 0,
        })
    }

    pub fn play_round(
        &mut self,
        mover: &mut dyn Mover,
        better: &mut dyn Better,
        handler: &mut dyn SimulatorEventHandler,
    ) -> BlackjackResult<RoundOutcome> {
        self.deal_initial_cards()?;
        let bet = self.place_bets(better)?;
        handler.on_bet_money(bet);
        self.play_hands(mover, handler)?;
        let outcome = self.dealer_plays_and_summary()?;
        handler.on_summary_game(&outcome, &self.dealer_hand);
        self.start_new_shoe_if_necessary(handler)?;
        Ok(outcome)
    }

    /// Deals the dealer's up card, the hole card, then the player's two cards.
    #[allowed_phase(DealInitialCards)]
    pub fn deal_initial_cards(&mut self) -> BlackjackResult<()> {
        self.new_game();
        for _ in 0..2 {
            let card = self.shoe.deal_card()?;
            self.dealer_hand.receive_card(card);
        }
        for _ in 0..2 {
            let card = self.shoe.deal_card()?;
            self.player_hand.receive_card(card);
        }
        self.current_game_phase = GamePhase::PlaceBets;
        Ok(())
    }

    #[allowed_phase(PlaceBets)]
    pub fn place_bets(&mut self, better: &mut dyn Better) -> BlackjackResult<u32> {
        self.bet = better.get_bet(&self.cards_seen(), self.rule.number_of_decks)?;
        self.current_game_phase = GamePhase::PlayHands;
        Ok(self.bet)
    }

    /// Asks for the first decision, settles insurance and naturals, then plays
    /// the player's hands to the end.
    #[allowed_phase(PlayHands)]
    pub fn play_hands(
        &mut self,
        mover: &mut dyn Mover,
        handler: &mut dyn SimulatorEventHandler,
    ) -> BlackjackResult<()> {
        let up = self.dealer_up_card();
        let hand = std::mem::take(&mut self.player_hand);
        let can_insure = up == ACE;
        let can_split = hand.pair_rank().is_some() && self.rule.max_splits > 0;
        let (decision, insure) = self.ask_mover(mover, &hand, true, can_split, true)?;

        if insure && can_insure {
            self.insured = true;
            self.insurance_profit = if self.dealer_hand.get_cards()[1] == TEN {
                0.5 * self.rule.payout_insurance
            } else {
                -0.5
            };
        }

        let dealer_natural = self.dealer_hand.is_natural();
        if dealer_natural && self.rule.peek_policy.dealer_peeks(up) {
            self.early_profit = Some(if hand.is_natural() { 0.0 } else { -1.0 });
        } else if hand.is_natural() {
            self.early_profit = Some(if dealer_natural {
                0.0
            } else {
                self.rule.payout_blackjack
            });
        } else {
            self.splits =
                self.play_hand(mover, handler, hand.clone(), self.rule.max_splits, false, false, Some(decision))?;
        }
        self.player_hand = hand;

        self.current_game_phase = GamePhase::DealerPlayAndSummary;
        Ok(())
    }

    /// The dealer draws if any hand is still standing, then every hand is
    /// settled. Profits are multiplied by the bet.
    #[allowed_phase(DealerPlayAndSummary)]
    pub fn dealer_plays_and_summary(&mut self) -> BlackjackResult<RoundOutcome> {
        let mut wagered = if self.insured { 0.5 } else { 0.0 };
        let main_profit = match self.early_profit {
            Some(profit) => {
                wagered += 1.0;
                profit
            }
            None => {
                let dealer_natural = self.dealer_hand.is_natural();
                let any_standing = self
                    .results
                    .iter()
                    .any(|result| matches!(result, HandResult::Standing { .. }));
                if any_standing && !dealer_natural {
                    while self.dealer_hand.dealer_must_hit(self.rule.dealer_hit_on_soft17) {
                        let card = self.shoe.deal_card()?;
                        self.dealer_hand.receive_card(card);
                    }
                }
                let dealer_value = self.dealer_hand.value();
                let dealer_bust = self.dealer_hand.bust();

                let mut profit = 0.0;
                for result in &self.results {
                    let (wager, hand_profit) = match *result {
                        HandResult::Surrendered => (1.0, -0.5),
                        HandResult::Bust { wager } => (wager, -wager),
                        // Only reached without a peek: a dealer natural takes every live wager.
                        HandResult::Standing { wager, .. } if dealer_natural => (wager, -wager),
                        HandResult::Standing { value, wager } => {
                            if dealer_bust || value > dealer_value {
                                (wager, wager)
                            } else if value == dealer_value {
                                (wager, 0.0)
                            } else {
                                (wager, -wager)
                            }
                        }
                    };
                    wagered += wager;
                    profit += hand_profit;
                }
                profit
            }
        };

        let bet = self.bet as f64;
        self.current_game_phase = GamePhase::StartNewShoe;
        Ok(RoundOutcome {
            bet: self.bet,
            profit: (main_profit + self.insurance_profit) * bet,
            wagered: wagered * bet,
            splits: self.splits,
            insured: self.insured,
        })
    }

    /// Shuffles when the cut card has come out. Returns whether it did.
    #[allowed_phase(StartNewShoe)]
    pub fn start_new_shoe_if_necessary(
        &mut self,
        handler: &mut dyn SimulatorEventHandler,
    ) -> BlackjackResult<bool> {
        let reshuffle = self.shoe.reached_cut_card();
        if reshuffle {
            self.shoe.shuffle();
            handler.on_shuffle(&self.shoe);
        }
        self.current_game_phase = GamePhase::DealInitialCards;
        Ok(reshuffle)
    }

    /// The cards the player has seen since the last shuffle. The dealer's hole
    /// card stays hidden until the dealer plays.
    pub fn cards_seen(&self) -> CardCount {
        let mut seen = self.shoe.cards_seen();
        if let Some(&hole) = self.dealer_hand.get_cards().get(1) {
            seen.remove_card(hole);
        }
        seen
    }

    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    pub fn player_hand(&self) -> &Hand {
        &self.player_hand
    }

    pub fn shoe_mut(&mut self) -> &mut Shoe {
        &mut self.shoe
    }

    pub fn current_game_phase(&self) -> GamePhase {
        self.current_game_phase
    }

    fn dealer_up_card(&self) -> u8 {
        self.dealer_hand.get_cards()[0]
    }

    fn new_game(&mut self) {
        self.dealer_hand.clear();
        self.player_hand.clear();
        self.bet = 0;
        self.results.clear();
        self.early_profit = None;
        self.insurance_profit = 0.0;
        self.insured = false;
        self.splits = 0;
    }

    fn ask_mover(
        &self,
        mover: &mut dyn Mover,
        hand: &Hand,
        can_double: bool,
        can_split: bool,
        first_decision: bool,
    ) -> BlackjackResult<(Decision, bool)> {
        let up = self.dealer_up_card();
        let cards_seen = self.cards_seen();
        let ctx = MoveContext {
            hand_value: hand.value(),
            soft: hand.is_soft(),
            dealer_up_card: up,
            can_double,
            can_split,
            can_surrender: first_decision && self.rule.allow_late_surrender,
            can_insure: first_decision && up == ACE,
            hand_cards: hand.get_cards(),
            cards_seen: &cards_seen,
            number_of_decks: self.rule.number_of_decks,
            rule: &self.rule,
        };
        mover.get_move(&ctx)
    }

    /// Plays `hand` to the end, recording every finished hand. Returns how
    /// many splits were made, so the caller can hand the rest of the budget
    /// to the next hand.
    #[allow(clippy::too_many_arguments)]
    fn play_hand(
        &mut self,
        mover: &mut dyn Mover,
        handler: &mut dyn SimulatorEventHandler,
        mut hand: Hand,
        splits_remaining: u8,
        from_split: bool,
        from_split_aces: bool,
        mut pending: Option<Decision>,
    ) -> BlackjackResult<u8> {
        let mut initial = !from_split;
        loop {
            let can_double = hand.len() == 2 && (self.rule.allow_das || !from_split);
            let can_split = splits_remaining > 0 && hand.pair_rank().is_some() && !from_split_aces;
            let can_surrender = initial && self.rule.allow_late_surrender;
            let decision = match pending.take() {
                Some(decision) => decision,
                None => self.ask_mover(mover, &hand, can_double, can_split, initial)?.0,
            };
            handler.on_make_decision(decision, &hand);

            match decision {
                Decision::Stand => {
                    self.results.push(HandResult::Standing {
                        value: hand.value(),
                        wager: 1.0,
                    });
                    return Ok(0);
                }
                Decision::Hit => {
                    hand.receive_card(self.shoe.deal_card()?);
                    if hand.bust() {
                        self.results.push(HandResult::Bust { wager: 1.0 });
                        return Ok(0);
                    }
                    initial = false;
                }
                Decision::Double if can_double => {
                    hand.receive_card(self.shoe.deal_card()?);
                    self.results.push(if hand.bust() {
                        HandResult::Bust { wager: 2.0 }
                    } else {
                        HandResult::Standing {
                            value: hand.value(),
                            wager: 2.0,
                        }
                    });
                    return Ok(0);
                }
                Decision::Surrender if can_surrender => {
                    self.results.push(HandResult::Surrendered);
                    return Ok(0);
                }
                Decision::Split if can_split => {
                    let aces = hand.is_pair_of_aces();
                    let one_card_only = aces && !self.rule.allow_decisions_after_split_aces;
                    let remaining = splits_remaining - 1;
                    let mut second = hand.split();

                    hand.receive_card(self.shoe.deal_card()?);
                    let used_first = if one_card_only {
                        self.stand_split_ace(&hand);
                        0
                    } else {
                        let budget = if aces { 0 } else { remaining };
                        self.play_hand(mover, handler, hand, budget, true, aces, None)?
                    };

                    second.receive_card(self.shoe.deal_card()?);
                    let used_second = if one_card_only {
                        self.stand_split_ace(&second);
                        0
                    } else {
                        let budget = if aces { 0 } else { remaining.saturating_sub(used_first) };
                        self.play_hand(mover, handler, second, budget, true, aces, None)?
                    };
                    return Ok(1 + used_first + used_second);
                }
                _ => return Err(BlackjackError::InvalidAction { decision }),
            }
        }
    }

    fn stand_split_ace(&mut self, hand: &Hand) {
        self.results.push(HandResult::Standing {
            value: hand.value(),
            wager: 1.0,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub hands: u64,
    /// Zero uses every available core.
    pub workers: usize,
    pub seed: u64,
    /// Rounds per risk-of-ruin window, zero to skip the measure.
    pub ruin_window: usize,
    pub ruin_bankroll: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            hands: 100_000,
            workers: 0,
            seed: 0,
            ruin_window: 1_000,
            ruin_bankroll: 100.0,
        }
    }
}

/// Plays `config.hands` rounds on one table.
pub fn simulate(
    rule: &Rule,
    config: &SimulationConfig,
    mover: &mut dyn Mover,
    better: &mut dyn Better,
    handler: &mut dyn SimulatorEventHandler,
) -> BlackjackResult<SimulationResult> {
    let mut table = Table::new(rule, config.seed)?;
    let mut statistics = Statistics::new(config.ruin_window, config.ruin_bankroll);
    info!(hands = config.hands, seed = config.seed, "simulation started");
    for _ in 0..config.hands {
        let outcome = table.play_round(mover, better, handler)?;
        statistics.record(&outcome);
    }
    let result = statistics.finish();
    info!(
        hands = result.hands,
        average_return = result.average_return,
        "simulation finished"
    );
    Ok(result)
}

/// Splits the rounds over independent workers, each with its own table, seed
/// and policies built by `make_mover` and `make_better`, then averages their
/// results. The first error of any worker is returned.
pub fn simulate_parallel<F, G>(
    rule: &Rule,
    config: &SimulationConfig,
    make_mover: F,
    make_better: G,
) -> BlackjackResult<SimulationResult>
where
    F: Fn() -> BlackjackResult<Box<dyn Mover>> + Sync,
    G: Fn() -> BlackjackResult<Box<dyn Better>> + Sync,
{
    rule.validate()?;
    let workers = if config.workers == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        config.workers
    };
    let workers = workers.min(config.hands.max(1) as usize);

    let mut master = StdRng::seed_from_u64(config.seed);
    let base = config.hands / workers as u64;
    let extra = config.hands % workers as u64;
    let jobs: Vec<(usize, SimulationConfig)> = (0..workers)
        .map(|index| {
            let hands = base + u64::from((index as u64) < extra);
            let worker_config = SimulationConfig {
                hands,
                seed: master.gen(),
                ..*config
            };
            (index, worker_config)
        })
        .collect();
    info!(workers, hands = config.hands, "parallel simulation started");

    let results = jobs
        .into_par_iter()
        .map(|(index, worker_config)| {
            let mut mover = make_mover()?;
            let mut better = make_better()?;
            let result = simulate(rule, &worker_config, mover.as_mut(), better.as_mut(), &mut ())?;
            debug!(worker = index, average_return = result.average_return, "worker finished");
            Ok(result)
        })
        .collect::<BlackjackResult<Vec<_>>>()?;

    let result = SimulationResult::average(&results);
    info!(
        hands = result.hands,
        average_return = result.average_return,
        risk_of_ruin = result.risk_of_ruin,
        "parallel simulation finished"
    );
    Ok(result)
}
