use std::collections::VecDeque;

use serde::Serialize;

use super::RoundOutcome;

/// Aggregate result of a simulation, in units of one bet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimulationResult {
    pub total_profit: f64,
    /// Profit per unit of initial bet.
    pub average_return: f64,
    pub average_profit_per_hand: f64,
    pub average_bet: f64,
    /// Average bet over the rounds that were not sat out.
    pub average_nonzero_bet: f64,
    /// Fraction of windows of `ruin_window` consecutive rounds whose profit
    /// fell by at least the bankroll from the window's start to its end. The
    /// windows slide one round at a time rather than being anchored at the
    /// start of the simulation, so a run of `n` rounds observes
    /// `n - ruin_window + 1` of them.
    pub risk_of_ruin: f64,
    pub hands: u64,
    /// Everything put on the table, doubles, splits and insurance included.
    pub total_wagered: f64,
}

impl SimulationResult {
    /// Combines per-worker results. Ratios are averaged over the workers,
    /// totals are summed.
    pub fn average(results: &[SimulationResult]) -> SimulationResult {
        if results.is_empty() {
            return SimulationResult::default();
        }
        let n = results.len() as f64;
        let mean = |f: fn(&SimulationResult) -> f64| results.iter().map(f).sum::<f64>() / n;
        SimulationResult {
            total_profit: results.iter().map(|r| r.total_profit).sum(),
            average_return: mean(|r| r.average_return),
            average_profit_per_hand: mean(|r| r.average_profit_per_hand),
            average_bet: mean(|r| r.average_bet),
            average_nonzero_bet: mean(|r| r.average_nonzero_bet),
            risk_of_ruin: mean(|r| r.risk_of_ruin),
            hands: results.iter().map(|r| r.hands).sum(),
            total_wagered: results.iter().map(|r| r.total_wagered).sum(),
        }
    }
}

/// Running totals of one simulation.
///
/// Risk of ruin is measured on a sliding window over the cumulative profit:
/// once `ruin_window` rounds are buffered, every new round closes a window,
/// which counts as ruined when the profit fell by at least `ruin_bankroll`
/// between its first and last round. A zero window disables the measure.
#[derive(Debug, Clone)]
pub struct Statistics {
    total_profit: f64,
    total_bet: f64,
    total_wagered: f64,
    hands: u64,
    nonzero_bets: u64,
    nonzero_bet_sum: f64,

    ruin_window: usize,
    ruin_bankroll: f64,
    cumulative_profits: VecDeque<f64>,
    windows_observed: u64,
    windows_ruined: u64,
}

impl Statistics {
    pub fn new(ruin_window: usize, ruin_bankroll: f64) -> Self {
        let mut cumulative_profits = VecDeque::with_capacity(ruin_window + 1);
        cumulative_profits.push_back(0.0);
        Self {
            total_profit: 0.0,
            total_bet: 0.0,
            total_wagered: 0.0,
            hands: 0,
            nonzero_bets: 0,
            nonzero_bet_sum: 0.0,
            ruin_window,
            ruin_bankroll,
            cumulative_profits,
            windows_observed: 0,
            windows_ruined: 0,
        }
    }

    pub fn record(&mut self, outcome: &RoundOutcome) {
        self.total_profit += outcome.profit;
        self.total_bet += outcome.bet as f64;
        self.total_wagered += outcome.wagered;
        self.hands += 1;
        if outcome.bet > 0 {
            self.nonzero_bets += 1;
            self.nonzero_bet_sum += outcome.bet as f64;
        }

        if self.ruin_window == 0 {
            return;
        }
        self.cumulative_profits.push_back(self.total_profit);
        if self.cumulative_profits.len() > self.ruin_window {
            if let (Some(start), Some(end)) =
                (self.cumulative_profits.front(), self.cumulative_profits.back())
            {
                self.windows_observed += 1;
                if start - end >= self.ruin_bankroll {
                    self.windows_ruined += 1;
                }
            }
            self.cumulative_profits.pop_front();
        }
    }

    pub fn hands(&self) -> u64 {
        self.hands
    }

    pub fn finish(&self) -> SimulationResult {
        let ratio = |numerator: f64, denominator: f64| {
            if denominator == 0.0 {
                0.0
            } else {
                numerator / denominator
            }
        };
        SimulationResult {
            total_profit: self.total_profit,
            average_return: ratio(self.total_profit, self.total_bet),
            average_profit_per_hand: ratio(self.total_profit, self.hands as f64),
            average_bet: ratio(self.total_bet, self.hands as f64),
            average_nonzero_bet: ratio(self.nonzero_bet_sum, self.nonzero_bets as f64),
            risk_of_ruin: ratio(self.windows_ruined as f64, self.windows_observed as f64),
            hands: self.hands,
            total_wagered: self.total_wagered,
        }
    }
}
