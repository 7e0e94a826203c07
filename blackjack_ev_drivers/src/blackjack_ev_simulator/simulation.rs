use blackjack_ev::registry::{create_better, create_mover};
use blackjack_ev::simulation::hand::Hand;
use blackjack_ev::simulation::shoe::Shoe;
use blackjack_ev::simulation::{
    simulate, simulate_parallel, RoundOutcome, SimulationConfig, SimulationResult,
    SimulatorEventHandler,
};
use blackjack_ev::Rule;
use blackjack_ev_drivers::{DriverError, Policies};
use tracing::{debug, info};

/// Logs how far a single-worker simulation has come.
#[derive(Debug, Clone, Default)]
struct ProgressHandler {
    progress_every: u64,
    hands: u64,
    shoes: u64,
    profit: f64,
}

impl SimulatorEventHandler for ProgressHandler {
    fn on_shuffle(&mut self, shoe: &Shoe) {
        self.shoes += 1;
        debug!(shoes = self.shoes, decks = shoe.number_of_decks(), "new shoe");
    }

    fn on_summary_game(&mut self, outcome: &RoundOutcome, _: &Hand) {
        self.hands += 1;
        self.profit += outcome.profit;
        if self.progress_every > 0 && self.hands % self.progress_every == 0 {
            info!(hands = self.hands, profit = self.profit, "hands played");
        }
    }
}

pub fn run(
    rule: &Rule,
    config: &SimulationConfig,
    policies: &Policies,
    progress_every: u64,
) -> Result<SimulationResult, DriverError> {
    if config.workers == 1 {
        let mut mover = create_mover(policies.mover, rule, &policies.sources)?;
        let mut better = create_better(policies.better, &policies.sources);
        let mut handler = ProgressHandler {
            progress_every,
            ..Default::default()
        };
        let result = simulate(rule, config, mover.as_mut(), better.as_mut(), &mut handler)?;
        return Ok(result);
    }

    let result = simulate_parallel(
        rule,
        config,
        || create_mover(policies.mover, rule, &policies.sources),
        || Ok(create_better(policies.better, &policies.sources)),
    )?;
    Ok(result)
}
