mod simulation;

use std::path::{Path, PathBuf};

use blackjack_ev::simulation::SimulationConfig;
use blackjack_ev_drivers::{parse_config_from_file, DriverError};
use clap::Parser;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "~/.blackjack_ev.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Overrides the seed of the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the number of hands of the config file
    #[arg(long)]
    hands: Option<u64>,
}

fn resolve_config_path(config: &str) -> Result<PathBuf, DriverError> {
    if config != DEFAULT_CONFIG_PATH {
        return Ok(PathBuf::from(config));
    }
    let home_dir = home::home_dir()
        .ok_or_else(|| DriverError::ConfigPath(String::from("needs a home directory")))?;
    let config_file_path = home_dir.join(".blackjack_ev.yml");
    if !config_file_path.exists() {
        return Err(DriverError::ConfigPath(format!(
            "{} does not exist",
            config_file_path.display()
        )));
    }
    if config_file_path.is_dir() {
        return Err(DriverError::ConfigPath(format!(
            "{} is a directory",
            config_file_path.display()
        )));
    }
    Ok(config_file_path)
}

fn main() -> Result<(), DriverError> {
    let args = CommandLineArgs::parse();
    let config_path = resolve_config_path(&args.config)?;
    let config = parse_config_from_file(&config_path)?;

    let level: tracing::Level = config
        .log_level
        .parse()
        .map_err(|_| DriverError::LogLevel(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let rule: blackjack_ev::Rule = config.rule.clone().try_into()?;
    rule.validate()?;
    let mut simulation_config: SimulationConfig = (&config.simulation).into();
    if let Some(seed) = args.seed {
        simulation_config.seed = seed;
    }
    if let Some(hands) = args.hands {
        simulation_config.hands = hands;
    }

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let policies = config.policies.build(base_dir)?;
    info!(
        mover = ?policies.mover,
        better = ?policies.better,
        hands = simulation_config.hands,
        "starting"
    );

    let result = simulation::run(
        &rule,
        &simulation_config,
        &policies,
        config.simulation.progress_every,
    )?;
    print!("{}", serde_yaml::to_string(&result)?);
    Ok(())
}
