use blackjack_ev::betting::{BaseBetter, Better, CountRampBetter, FlatBetter};
use blackjack_ev::simulation::{simulate, simulate_parallel, SimulationConfig};
use blackjack_ev::strategy::{CardCountMover, CountBand, Mover, SimpleMover, StrategyTable};
use blackjack_ev::{BlackjackError, Rule};

const BASIC_STRATEGY: &str = include_str!("../../data/6deck_s17_das_peek_basic_strategy.csv");

/// The basic strategy with insurance taken against every ace.
fn insuring_basic_strategy() -> StrategyTable {
    BASIC_STRATEGY
        .lines()
        .map(|line| match line.rsplit_once(',') {
            Some((head, last)) => format!("{},i{}\n", head, last),
            None => String::new(),
        })
        .collect::<String>()
        .parse()
        .unwrap()
}

#[test]
fn dealer_mimicking_play_loses() {
    let config = SimulationConfig {
        hands: 50_000,
        seed: 2024,
        ..Default::default()
    };
    let result = simulate(
        &Rule::default(),
        &config,
        &mut SimpleMover,
        &mut FlatBetter::default(),
        &mut (),
    )
    .unwrap();
    assert_eq!(result.hands, 50_000);
    assert_eq!(result.average_bet, 1.0);
    assert!(result.average_return < -0.02, "average return {}", result.average_return);
}

#[test]
fn counting_cards_is_much_better() {
    let config = SimulationConfig {
        hands: 200_000,
        workers: 4,
        seed: 7,
        ..Default::default()
    };
    let bands = vec![
        CountBand {
            min: -1000.0,
            max: 3.0,
            table: BASIC_STRATEGY.parse().unwrap(),
        },
        CountBand {
            min: 3.0,
            max: 1000.0,
            table: insuring_basic_strategy(),
        },
    ];
    let result = simulate_parallel(
        &Rule::default(),
        &config,
        || Ok(Box::new(CardCountMover::new(bands.clone())) as Box<dyn Mover>),
        || Ok(Box::new(CountRampBetter::card_count()) as Box<dyn Better>),
    )
    .unwrap();
    assert_eq!(result.hands, 200_000);
    assert!(result.average_bet > 1.0);
    assert!(result.average_return > -0.05, "average return {}", result.average_return);
}

#[test]
fn base_better_aborts_the_simulation() {
    let config = SimulationConfig {
        hands: 10,
        ..Default::default()
    };
    let result = simulate(&Rule::default(), &config, &mut SimpleMover, &mut BaseBetter, &mut ());
    assert!(matches!(result, Err(BlackjackError::NotImplemented("get_bet"))));
}

#[test]
fn missing_count_band_aborts_the_simulation() {
    let config = SimulationConfig {
        hands: 5_000,
        ..Default::default()
    };
    let mut mover = CardCountMover::new(vec![CountBand {
        min: -0.5,
        max: 0.5,
        table: BASIC_STRATEGY.parse().unwrap(),
    }]);
    let result = simulate(&Rule::default(), &config, &mut mover, &mut FlatBetter::default(), &mut ());
    assert!(matches!(result, Err(BlackjackError::NoCountBand(_))));
}
