use crate::{BlackjackError, BlackjackResult, CardCount};

/// A bet-sizing policy. Returns the bet in units for the next round, zero to
/// sit it out.
pub trait Better: Send {
    fn get_bet(&mut self, cards_seen: &CardCount, number_of_decks: u8) -> BlackjackResult<u32> {
        let _ = (cards_seen, number_of_decks);
        Err(BlackjackError::NotImplemented("get_bet"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaseBetter;

impl Better for BaseBetter {}

/// Bets the same amount every round.
#[derive(Debug, Clone, Copy)]
pub struct FlatBetter {
    pub units: u32,
}

impl Default for FlatBetter {
    fn default() -> Self {
        Self { units: 1 }
    }
}

impl Better for FlatBetter {
    fn get_bet(&mut self, _: &CardCount, _: u8) -> BlackjackResult<u32> {
        Ok(self.units)
    }
}

/// Bets in proportion to the Hi-Lo true count once it reaches `ramp_start`,
/// between `min_bet` and `max_bet`. With `wong_out_below` set, rounds below
/// that true count are sat out.
#[derive(Debug, Clone, Copy)]
pub struct CountRampBetter {
    pub units_per_count: f64,
    pub min_bet: u32,
    pub max_bet: u32,
    pub ramp_start: f64,
    pub wong_out_below: Option<f64>,
}

pub const DEFAULT_WONG_OUT_BELOW: f64 = -1.0;

impl CountRampBetter {
    /// A 1 to 15 spread at three units per true count.
    pub fn card_count() -> Self {
        Self {
            units_per_count: 3.0,
            min_bet: 1,
            max_bet: 15,
            ramp_start: 1.0,
            wong_out_below: None,
        }
    }

    pub fn wonging(threshold: f64) -> Self {
        Self {
            wong_out_below: Some(threshold),
            ..Self::card_count()
        }
    }

    pub fn bet_for(&self, true_count: f64) -> u32 {
        if let Some(threshold) = self.wong_out_below {
            if true_count < threshold {
                return 0;
            }
        }
        if true_count >= self.ramp_start {
            let units = (true_count * self.units_per_count).floor().max(0.0) as u32;
            units.clamp(self.min_bet, self.max_bet)
        } else {
            self.min_bet
        }
    }
}

impl Default for CountRampBetter {
    fn default() -> Self {
        Self::card_count()
    }
}

impl Better for CountRampBetter {
    fn get_bet(&mut self, cards_seen: &CardCount, number_of_decks: u8) -> BlackjackResult<u32> {
        Ok(self.bet_for(cards_seen.hilo_true_count(number_of_decks)))
    }
}
