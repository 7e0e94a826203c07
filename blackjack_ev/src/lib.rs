pub mod betting;
pub mod calculation;
mod error;
pub mod registry;
pub mod simulation;
mod statearray;
pub mod strategy;

use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use strum_macros::EnumIter;

pub use error::{BlackjackError, BlackjackResult};
pub use statearray::{CardCount, StateArray};

/// Rank of an ace. It counts as 11 until the hand would bust.
pub const ACE: u8 = 11;
/// Rank shared by 10, J, Q and K.
pub const TEN: u8 = 10;
/// Lowest card rank.
pub const MIN_RANK: u8 = 2;

/// Fewest cards that must remain behind the cut card, so a round can always be
/// dealt to the end.
const MIN_CARDS_BEHIND_CUT_CARD: f64 = 26.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub number_of_decks: u8,
    /// Fraction of the shoe dealt before the cut card comes out.
    pub cut_card_proportion: f64,
    pub max_splits: u8,
    /// If false, every split ace gets exactly one card.
    pub allow_decisions_after_split_aces: bool,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub allow_late_surrender: bool,
    pub peek_policy: PeekPolicy,

    pub payout_blackjack: f64,
    pub payout_insurance: f64,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            number_of_decks: 6,
            cut_card_proportion: 0.75,
            max_splits: 3,
            allow_decisions_after_split_aces: false,
            dealer_hit_on_soft17: false,
            allow_das: true,
            allow_late_surrender: true,
            peek_policy: PeekPolicy::UpAceOrTen,
            payout_blackjack: 1.5,
            payout_insurance: 2.0,
        }
    }
}

impl Rule {
    pub fn validate(&self) -> BlackjackResult<()> {
        if self.number_of_decks == 0 {
            return Err(BlackjackError::InvalidConfig(String::from(
                "number_of_decks must be positive",
            )));
        }
        if !(self.cut_card_proportion > 0.0 && self.cut_card_proportion < 1.0) {
            return Err(BlackjackError::InvalidConfig(format!(
                "cut_card_proportion must be in (0, 1), got {}",
                self.cut_card_proportion
            )));
        }
        let behind_cut_card =
            (self.number_of_decks as f64 * 52.0) * (1.0 - self.cut_card_proportion);
        if behind_cut_card < MIN_CARDS_BEHIND_CUT_CARD {
            return Err(BlackjackError::InvalidConfig(format!(
                "only {:.0} cards remain behind the cut card",
                behind_cut_card
            )));
        }
        if self.payout_blackjack < 0.0 || self.payout_insurance < 0.0 {
            return Err(BlackjackError::InvalidConfig(String::from(
                "payouts cannot be negative",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_enum_str, Deserialize_enum_str)]
pub enum PeekPolicy {
    UpAceOrTen,
    UpAce,
    NoPeek,
}

impl PeekPolicy {
    /// Whether the dealer checks the hole card for blackjack with this up card.
    pub fn dealer_peeks(&self, dealer_up_card: u8) -> bool {
        match self {
            PeekPolicy::UpAceOrTen => dealer_up_card == ACE || dealer_up_card == TEN,
            PeekPolicy::UpAce => dealer_up_card == ACE,
            PeekPolicy::NoPeek => false,
        }
    }
}

/// A playing decision. The declaration order is also the order in which ties
/// between equal expectations are broken.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize_enum_str, Deserialize_enum_str,
)]
pub enum Decision {
    #[serde(rename = "s")]
    Stand,
    #[serde(rename = "h")]
    Hit,
    #[serde(rename = "d")]
    Double,
    #[serde(rename = "p")]
    Split,
    #[serde(rename = "u")]
    Surrender,
}

impl Decision {
    pub fn long_name(&self) -> &'static str {
        match self {
            Decision::Stand => "stand",
            Decision::Hit => "hit",
            Decision::Double => "double",
            Decision::Split => "split",
            Decision::Surrender => "surrender",
        }
    }

    pub fn from_long_name(name: &str) -> Option<Decision> {
        match name {
            "stand" => Some(Decision::Stand),
            "hit" => Some(Decision::Hit),
            "double" => Some(Decision::Double),
            "split" => Some(Decision::Split),
            "surrender" => Some(Decision::Surrender),
            _ => None,
        }
    }
}

/// Short code of the insurance side decision in strategy tables.
pub const INSURANCE_CODE: char = 'i';

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn decision_codes_round_trip_through_names() {
        let codes: Vec<String> = Decision::iter().map(|d| d.to_string()).collect();
        assert_eq!(codes, ["s", "h", "d", "p", "u"]);
        for decision in Decision::iter() {
            assert_eq!(Decision::from_long_name(decision.long_name()), Some(decision));
        }
        assert_eq!("u".parse::<Decision>().unwrap(), Decision::Surrender);
        assert!("x".parse::<Decision>().is_err());
        assert_eq!(Decision::from_long_name("insurance"), None);
    }

    #[test]
    fn peek_policy_depends_on_up_card() {
        assert!(PeekPolicy::UpAceOrTen.dealer_peeks(ACE));
        assert!(PeekPolicy::UpAceOrTen.dealer_peeks(TEN));
        assert!(!PeekPolicy::UpAceOrTen.dealer_peeks(9));
        assert!(PeekPolicy::UpAce.dealer_peeks(ACE));
        assert!(!PeekPolicy::UpAce.dealer_peeks(TEN));
        assert!(!PeekPolicy::NoPeek.dealer_peeks(ACE));
        assert_eq!("UpAce".parse::<PeekPolicy>().unwrap(), PeekPolicy::UpAce);
    }

    #[test]
    fn rule_validation() {
        assert!(Rule::default().validate().is_ok());
        let mut rule = Rule::default();
        rule.cut_card_proportion = 1.0;
        assert!(rule.validate().is_err());
        rule.cut_card_proportion = 0.95;
        rule.number_of_decks = 1;
        assert!(rule.validate().is_err());
        rule.number_of_decks = 0;
        assert!(rule.validate().is_err());
    }
}
