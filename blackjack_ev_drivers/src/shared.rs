use std::fs;
use std::path::Path;

use blackjack_ev::registry::{BetterKind, MoverKind, PolicySources};
use blackjack_ev::simulation::SimulationConfig;
use blackjack_ev::strategy::{CountBand, StrategyTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value: {0}")]
    Convert(#[from] serde::de::value::Error),

    #[error(transparent)]
    Blackjack(#[from] blackjack_ev::BlackjackError),

    #[error("Invalid log level `{0}`")]
    LogLevel(String),

    #[error("Config file {0}")]
    ConfigPath(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rule: ConfigRule,
    pub simulation: ConfigSimulation,
    pub policies: ConfigPolicies,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    String::from("info")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub cut_card_proportion: f64,
    pub max_splits: u8,
    pub allow_decisions_after_split_aces: bool,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_late_surrender: bool,
    pub peek_policy: String,

    pub payout_blackjack: f64,
    pub payout_insurance: f64,
}

impl TryInto<blackjack_ev::Rule> for ConfigRule {
    type Error = serde::de::value::Error;

    fn try_into(self) -> Result<blackjack_ev::Rule, Self::Error> {
        let rule = blackjack_ev::Rule {
            number_of_decks: self.number_of_decks,
            cut_card_proportion: self.cut_card_proportion,
            max_splits: self.max_splits,
            allow_decisions_after_split_aces: self.allow_decisions_after_split_aces,
            dealer_hit_on_soft17: self.dealer_hit_on_soft17,
            allow_das: self.allow_das,
            allow_late_surrender: self.allow_late_surrender,
            peek_policy: self.peek_policy.parse()?,
            payout_blackjack: self.payout_blackjack,
            payout_insurance: self.payout_insurance,
        };

        Ok(rule)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSimulation {
    pub hands: u64,
    pub workers: usize,
    pub seed: u64,
    pub ruin_window: usize,
    pub ruin_bankroll: f64,
    /// Log progress every this many hands when running on one worker.
    pub progress_every: u64,
}

impl From<&ConfigSimulation> for SimulationConfig {
    fn from(config: &ConfigSimulation) -> Self {
        SimulationConfig {
            hands: config.hands,
            workers: config.workers,
            seed: config.seed,
            ruin_window: config.ruin_window,
            ruin_bankroll: config.ruin_bankroll,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPolicies {
    pub mover: String,
    pub better: String,
    #[serde(default)]
    pub basic_strategy: Option<String>,
    #[serde(default)]
    pub count_bands: Vec<ConfigCountBand>,
    #[serde(default)]
    pub wong_out_below: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCountBand {
    pub min: f64,
    pub max: f64,
    pub table: String,
}

/// Policies named by a config, with every table they need loaded.
#[derive(Debug, Clone)]
pub struct Policies {
    pub mover: MoverKind,
    pub better: BetterKind,
    pub sources: PolicySources,
}

impl ConfigPolicies {
    /// Loads the strategy tables. Relative table paths are taken from
    /// `base_dir`, normally the directory of the config file.
    pub fn build(&self, base_dir: &Path) -> Result<Policies, DriverError> {
        let mover: MoverKind = self.mover.parse()?;
        let better: BetterKind = self.better.parse()?;

        let basic_strategy = match &self.basic_strategy {
            Some(path) => Some(StrategyTable::from_file(base_dir.join(path))?),
            None => None,
        };
        let count_bands = self
            .count_bands
            .iter()
            .map(|band| -> Result<CountBand, DriverError> {
                Ok(CountBand {
                    min: band.min,
                    max: band.max,
                    table: StrategyTable::from_file(base_dir.join(&band.table))?,
                })
            })
            .collect::<Result<Vec<_>, DriverError>>()?;

        Ok(Policies {
            mover,
            better,
            sources: PolicySources {
                basic_strategy,
                count_bands,
                wong_out_below: self.wong_out_below,
            },
        })
    }
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file<P: AsRef<Path>>(filename: P) -> Result<Config, DriverError> {
    let file_content = fs::read_to_string(filename)?;
    Ok(serde_yaml::from_str(&file_content)?)
}
