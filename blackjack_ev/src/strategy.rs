pub mod table;

use crate::calculation::{SolveOptions, Solver};
use crate::{BlackjackError, BlackjackResult, CardCount, Decision, Rule};

pub use self::table::{StrategyCell, StrategyTable};

/// Everything a decision policy may look at when asked for a move.
#[derive(Debug, Clone, Copy)]
pub struct MoveContext<'a> {
    pub hand_value: u16,
    pub soft: bool,
    pub dealer_up_card: u8,
    pub can_double: bool,
    pub can_split: bool,
    pub can_surrender: bool,
    pub can_insure: bool,
    pub hand_cards: &'a [u8],
    /// Every card dealt since the last shuffle except the dealer's hole card.
    pub cards_seen: &'a CardCount,
    pub number_of_decks: u8,
    pub rule: &'a Rule,
}

/// A decision policy. Returns the decision for the hand and whether to take
/// insurance.
pub trait Mover: Send {
    fn get_move(&mut self, ctx: &MoveContext) -> BlackjackResult<(Decision, bool)> {
        let _ = ctx;
        Err(BlackjackError::NotImplemented("get_move"))
    }
}

/// A policy without any decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseMover;

impl Mover for BaseMover {}

/// Plays like a dealer standing on all 17s and never insures.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMover;

impl Mover for SimpleMover {
    fn get_move(&mut self, ctx: &MoveContext) -> BlackjackResult<(Decision, bool)> {
        if ctx.hand_value < 17 {
            Ok((Decision::Hit, false))
        } else {
            Ok((Decision::Stand, false))
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicStrategyMover {
    table: StrategyTable,
}

impl BasicStrategyMover {
    pub fn new(table: StrategyTable) -> Self {
        Self { table }
    }
}

impl Mover for BasicStrategyMover {
    fn get_move(&mut self, ctx: &MoveContext) -> BlackjackResult<(Decision, bool)> {
        self.table.get_move(ctx)
    }
}

/// A strategy table played while the true count is in `[min, max)`.
#[derive(Debug, Clone)]
pub struct CountBand {
    pub min: f64,
    pub max: f64,
    pub table: StrategyTable,
}

impl CountBand {
    pub fn contains(&self, true_count: f64) -> bool {
        self.min <= true_count && true_count < self.max
    }
}

/// Switches between strategy tables by the Hi-Lo true count of the cards seen.
#[derive(Debug, Clone)]
pub struct CardCountMover {
    bands: Vec<CountBand>,
}

impl CardCountMover {
    pub fn new(bands: Vec<CountBand>) -> Self {
        Self { bands }
    }

    /// The first band containing `true_count`.
    pub fn band_for(&self, true_count: f64) -> BlackjackResult<&CountBand> {
        self.bands
            .iter()
            .find(|band| band.contains(true_count))
            .ok_or(BlackjackError::NoCountBand(true_count))
    }
}

impl Mover for CardCountMover {
    fn get_move(&mut self, ctx: &MoveContext) -> BlackjackResult<(Decision, bool)> {
        let true_count = ctx.cards_seen.hilo_true_count(ctx.number_of_decks);
        self.band_for(true_count)?.table.get_move(ctx)
    }
}

/// Asks the exact solver for every decision. The solver's memo lives as long
/// as the mover.
#[derive(Debug, Clone, Default)]
pub struct PerfectMover {
    solver: Solver,
}

impl PerfectMover {
    pub fn new(rule: &Rule) -> Self {
        Self {
            solver: Solver::with_insurance_payout(rule.payout_insurance),
        }
    }
}

impl Mover for PerfectMover {
    fn get_move(&mut self, ctx: &MoveContext) -> BlackjackResult<(Decision, bool)> {
        let unseen = ctx.cards_seen.unseen_from_seen(ctx.number_of_decks)?;
        let options = SolveOptions {
            can_double: ctx.can_double,
            can_insure: ctx.can_insure,
            can_surrender: ctx.can_surrender,
            max_splits: ctx.can_split as u8,
            ..SolveOptions::from_rule(ctx.rule)
        };
        let best = self
            .solver
            .best_move(ctx.hand_cards, ctx.dealer_up_card, &unseen, options)?;
        Ok((best.decision, ctx.can_insure && best.should_insure()))
    }
}
