//! Policies by name, so a configuration can pick them at startup.

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

use crate::betting::{Better, CountRampBetter, FlatBetter, DEFAULT_WONG_OUT_BELOW};
use crate::strategy::{
    BasicStrategyMover, CardCountMover, CountBand, Mover, PerfectMover, SimpleMover, StrategyTable,
};
use crate::{BlackjackError, BlackjackResult, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum MoverKind {
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "basic-strategy")]
    BasicStrategy,
    #[serde(rename = "card-count")]
    CardCount,
    #[serde(rename = "perfect")]
    Perfect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum BetterKind {
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "card-count")]
    CardCount,
    #[serde(rename = "card-count-wong")]
    CardCountWong,
}

/// Data the table-driven policies are built from.
#[derive(Debug, Clone, Default)]
pub struct PolicySources {
    pub basic_strategy: Option<StrategyTable>,
    pub count_bands: Vec<CountBand>,
    pub wong_out_below: Option<f64>,
}

pub fn create_mover(
    kind: MoverKind,
    rule: &Rule,
    sources: &PolicySources,
) -> BlackjackResult<Box<dyn Mover>> {
    Ok(match kind {
        MoverKind::Simple => Box::new(SimpleMover),
        MoverKind::BasicStrategy => {
            let table = sources
                .basic_strategy
                .clone()
                .ok_or_else(|| BlackjackError::MissingStrategyTable(kind.to_string()))?;
            Box::new(BasicStrategyMover::new(table))
        }
        MoverKind::CardCount => {
            if sources.count_bands.is_empty() {
                return Err(BlackjackError::MissingStrategyTable(kind.to_string()));
            }
            Box::new(CardCountMover::new(sources.count_bands.clone()))
        }
        MoverKind::Perfect => Box::new(PerfectMover::new(rule)),
    })
}

pub fn create_better(kind: BetterKind, sources: &PolicySources) -> Box<dyn Better> {
    match kind {
        BetterKind::Simple => Box::new(FlatBetter::default()),
        BetterKind::CardCount => Box::new(CountRampBetter::card_count()),
        BetterKind::CardCountWong => Box::new(CountRampBetter::wonging(
            sources.wong_out_below.unwrap_or(DEFAULT_WONG_OUT_BELOW),
        )),
    }
}
