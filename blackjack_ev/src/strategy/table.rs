use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use super::MoveContext;
use crate::calculation::{ExpectationAll, SolveOptions, Solver};
use crate::statearray::rank_index;
use crate::{BlackjackError, BlackjackResult, CardCount, Decision, ACE, INSURANCE_CODE};

const HARD_ROWS: std::ops::RangeInclusive<u16> = 4..=21;
const SOFT_ROWS: std::ops::RangeInclusive<u16> = 12..=21;
const PAIR_ROWS: std::ops::RangeInclusive<u16> = 2..=11;

/// One cell of a strategy table: an optional insurance marker followed by up
/// to three decisions, each a fallback for the one before it.
///
/// Surrender falls through when surrender is not allowed, then double falls
/// through when doubling is not allowed. The last decision is always stand,
/// hit or split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyCell {
    insure: bool,
    chain: [Decision; 3],
    len: u8,
}

impl Default for StrategyCell {
    fn default() -> Self {
        Self::single(Decision::Stand)
    }
}

impl StrategyCell {
    fn single(decision: Decision) -> Self {
        Self {
            insure: false,
            chain: [decision; 3],
            len: 1,
        }
    }

    pub fn insure(&self) -> bool {
        self.insure
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.chain[..self.len as usize]
    }

    /// The first decision of the chain that is available.
    pub fn resolve(&self, can_double: bool, can_surrender: bool) -> Decision {
        for &decision in self.decisions() {
            match decision {
                Decision::Surrender if !can_surrender => continue,
                Decision::Double if !can_double => continue,
                _ => return decision,
            }
        }
        // The last decision is never double or surrender.
        self.chain[self.len as usize - 1]
    }

    fn push(&mut self, decision: Decision) {
        self.chain[self.len as usize] = decision;
        self.len += 1;
    }
}

impl FromStr for StrategyCell {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let mut cell = StrategyCell {
            len: 0,
            ..Default::default()
        };
        let mut rest = code;
        if let Some(stripped) = rest.strip_prefix(INSURANCE_CODE) {
            cell.insure = true;
            rest = stripped;
        }
        for optional in [Decision::Surrender, Decision::Double] {
            if let Some(stripped) = rest.strip_prefix(optional.to_string().as_str()) {
                cell.push(optional);
                rest = stripped;
            }
        }
        let last = rest
            .parse::<Decision>()
            .map_err(|_| format!("invalid action code `{}`", code))?;
        if matches!(last, Decision::Double | Decision::Surrender) {
            return Err(format!("action code `{}` has no fallback", code));
        }
        cell.push(last);
        Ok(cell)
    }
}

impl fmt::Display for StrategyCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.insure {
            write!(f, "{}", INSURANCE_CODE)?;
        }
        for decision in self.decisions() {
            write!(f, "{}", decision)?;
        }
        Ok(())
    }
}

/// Decisions keyed by hand shape and dealer up card. Rows are hard totals
/// 4 to 21, soft totals 12 to 21 and pairs of 2 to aces; columns are dealer
/// up cards 2 to ace. Cells missing from a loaded file stand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    hard: [[StrategyCell; 10]; 18],
    soft: [[StrategyCell; 10]; 10],
    pairs: [[StrategyCell; 10]; 10],
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            hard: [[StrategyCell::default(); 10]; 18],
            soft: [[StrategyCell::default(); 10]; 10],
            pairs: [[StrategyCell::default(); 10]; 10],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Hard,
    Soft,
    Pair,
}

impl RowKind {
    fn prefix(&self) -> char {
        match self {
            RowKind::Hard => 'n',
            RowKind::Soft => 'a',
            RowKind::Pair => 's',
        }
    }

    fn rows(&self) -> std::ops::RangeInclusive<u16> {
        match self {
            RowKind::Hard => HARD_ROWS,
            RowKind::Soft => SOFT_ROWS,
            RowKind::Pair => PAIR_ROWS,
        }
    }
}

impl StrategyTable {
    fn row(&self, kind: RowKind, key: u16) -> &[StrategyCell; 10] {
        let index = (key - *kind.rows().start()) as usize;
        match kind {
            RowKind::Hard => &self.hard[index],
            RowKind::Soft => &self.soft[index],
            RowKind::Pair => &self.pairs[index],
        }
    }

    fn row_mut(&mut self, kind: RowKind, key: u16) -> &mut [StrategyCell; 10] {
        let index = (key - *kind.rows().start()) as usize;
        match kind {
            RowKind::Hard => &mut self.hard[index],
            RowKind::Soft => &mut self.soft[index],
            RowKind::Pair => &mut self.pairs[index],
        }
    }

    pub fn hard_cell(&self, total: u16, dealer_up_card: u8) -> StrategyCell {
        self.row(RowKind::Hard, total.clamp(4, 21))[rank_index(dealer_up_card)]
    }

    pub fn soft_cell(&self, total: u16, dealer_up_card: u8) -> StrategyCell {
        self.row(RowKind::Soft, total.clamp(12, 21))[rank_index(dealer_up_card)]
    }

    pub fn pair_cell(&self, rank: u8, dealer_up_card: u8) -> StrategyCell {
        self.row(RowKind::Pair, rank as u16)[rank_index(dealer_up_card)]
    }

    /// Looks up the decision and insurance flag for the situation in `ctx`.
    pub fn get_move(&self, ctx: &MoveContext) -> BlackjackResult<(Decision, bool)> {
        let cell = if ctx.can_split {
            let &rank = ctx.hand_cards.first().ok_or(BlackjackError::EmptyHand)?;
            self.pair_cell(rank, ctx.dealer_up_card)
        } else if ctx.soft {
            self.soft_cell(ctx.hand_value, ctx.dealer_up_card)
        } else {
            self.hard_cell(ctx.hand_value, ctx.dealer_up_card)
        };
        Ok((
            cell.resolve(ctx.can_double, ctx.can_surrender),
            ctx.can_insure && cell.insure(),
        ))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> BlackjackResult<StrategyTable> {
        let mut table = StrategyTable::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let malformed = |reason: String| BlackjackError::MalformedTable {
                line: line_number,
                reason,
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let identifier = fields.next().unwrap_or_default();
            let kind = match identifier.chars().next() {
                Some('n') => RowKind::Hard,
                Some('a') => RowKind::Soft,
                Some('s') => RowKind::Pair,
                _ => return Err(malformed(format!("unknown row identifier `{}`", identifier))),
            };
            let key: u16 = identifier[1..]
                .parse()
                .map_err(|_| malformed(format!("unknown row identifier `{}`", identifier)))?;
            if !kind.rows().contains(&key) {
                return Err(malformed(format!("row `{}` is out of range", identifier)));
            }

            let cells = fields
                .map(|code| code.parse::<StrategyCell>().map_err(&malformed))
                .collect::<BlackjackResult<Vec<_>>>()?;
            if cells.len() != 10 {
                return Err(malformed(format!(
                    "expected 10 action codes, found {}",
                    cells.len()
                )));
            }
            table.row_mut(kind, key).copy_from_slice(&cells);
        }
        Ok(table)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> BlackjackResult<StrategyTable> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading strategy table");
        StrategyTable::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> BlackjackResult<()> {
        write!(writer, "{}", self)?;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> BlackjackResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Builds a table from the exact solver. Every cell is solved for a
    /// representative hand against `unseen` minus the hand and the up card.
    pub fn generate(
        solver: &mut Solver,
        unseen: &CardCount,
        options: SolveOptions,
    ) -> BlackjackResult<StrategyTable> {
        let mut table = StrategyTable::default();
        for kind in [RowKind::Hard, RowKind::Soft, RowKind::Pair] {
            for key in kind.rows() {
                let (hand, options) = representative_hand(kind, key, options);
                for dealer_up_card in CardCount::ranks() {
                    let mut used = CardCount::from_cards(&hand)?;
                    used.add_card(dealer_up_card);
                    if !unseen.contains(&used) {
                        return Err(BlackjackError::InvalidConfig(format!(
                            "the shoe cannot deal {:?} against {}",
                            hand, dealer_up_card
                        )));
                    }
                    let mut rest = *unseen;
                    rest -= &used;
                    let expectations = solver.solve(&hand, dealer_up_card, &rest, options)?;
                    table.row_mut(kind, key)[rank_index(dealer_up_card)] = suggest_cell(&expectations);
                }
                debug!(row = %format!("{}{}", kind.prefix(), key), "generated strategy row");
            }
        }
        Ok(table)
    }
}

/// A hand that represents a table row, with splitting disabled for pairs
/// standing in for a hard or soft total.
fn representative_hand(kind: RowKind, key: u16, options: SolveOptions) -> (Vec<u8>, SolveOptions) {
    let no_split = SolveOptions {
        max_splits: 0,
        ..options
    };
    match kind {
        RowKind::Pair => (vec![key as u8; 2], options),
        RowKind::Soft if key == 12 => (vec![ACE, ACE], no_split),
        RowKind::Soft => (vec![ACE, (key - 11) as u8], options),
        // Ten-two plays apart from other twelves against a four. The chart
        // follows the common twelve.
        RowKind::Hard if key == 12 => (vec![7, 5], options),
        RowKind::Hard => {
            let distinct = (2..=10u16)
                .filter(|&low| low < key - low && key - low <= 10)
                .map(|low| vec![low as u8, (key - low) as u8])
                .next();
            match distinct {
                Some(hand) => (hand, options),
                None if key % 2 == 0 && key <= 20 => (vec![(key / 2) as u8; 2], no_split),
                None => (vec![10, 9, 2], options),
            }
        }
    }
}

/// The cell the solver's expectations suggest: the best decision, followed by
/// what to do when double or surrender is unavailable.
pub fn suggest_cell(expectations: &ExpectationAll) -> StrategyCell {
    let without = |removed: &[Decision]| {
        let mut rest = *expectations;
        for decision in removed {
            match decision {
                Decision::Double => rest.double = -f64::INFINITY,
                Decision::Surrender => rest.surrender = -f64::INFINITY,
                _ => {}
            }
        }
        rest.get_max_expectation().1
    };

    let mut cell = StrategyCell {
        insure: expectations.insurance > 0.0,
        len: 0,
        ..Default::default()
    };
    let best = expectations.get_max_expectation().1;
    cell.push(best);
    if best == Decision::Surrender {
        let second = without(&[Decision::Surrender]);
        cell.push(second);
        if second == Decision::Double {
            cell.push(without(&[Decision::Surrender, Decision::Double]));
        }
    } else if best == Decision::Double {
        cell.push(without(&[Decision::Double]));
    }
    cell
}

impl fmt::Display for StrategyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in [RowKind::Hard, RowKind::Soft, RowKind::Pair] {
            for key in kind.rows() {
                write!(f, "{}{}", kind.prefix(), key)?;
                for cell in self.row(kind, key) {
                    write!(f, ",{}", cell)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl FromStr for StrategyTable {
    type Err = BlackjackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyTable::from_reader(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TEN;

    const BASIC_STRATEGY: &str = include_str!("../../../data/6deck_s17_das_peek_basic_strategy.csv");

    #[test]
    fn cell_codes() {
        let cell: StrategyCell = "iudh".parse().unwrap();
        assert!(cell.insure());
        assert_eq!(cell.decisions(), &[Decision::Surrender, Decision::Double, Decision::Hit]);
        assert_eq!(cell.resolve(true, true), Decision::Surrender);
        assert_eq!(cell.resolve(true, false), Decision::Double);
        assert_eq!(cell.resolve(false, false), Decision::Hit);
        assert_eq!(cell.to_string(), "iudh");

        assert!("d".parse::<StrategyCell>().is_err());
        assert!("x".parse::<StrategyCell>().is_err());
        assert!("dsh".parse::<StrategyCell>().is_err());
    }

    #[test]
    fn loads_and_writes_the_basic_strategy() {
        let table: StrategyTable = BASIC_STRATEGY.parse().unwrap();
        assert_eq!(table.hard_cell(16, TEN).to_string(), "uh");
        assert_eq!(table.soft_cell(18, 3).to_string(), "ds");
        assert_eq!(table.pair_cell(9, 7).to_string(), "s");
        assert_eq!(table.to_string(), BASIC_STRATEGY);
    }

    #[test]
    fn missing_rows_stand_and_blank_lines_are_skipped() {
        let table: StrategyTable = "\nn16, h,h,h,h,h,h,h,h,h,h\n\n".parse().unwrap();
        assert_eq!(table.hard_cell(16, 2).resolve(true, true), Decision::Hit);
        assert_eq!(table.hard_cell(12, 2).resolve(true, true), Decision::Stand);
        assert_eq!(table.pair_cell(ACE, ACE).resolve(true, true), Decision::Stand);
    }

    #[test]
    fn malformed_rows_are_fatal() {
        let cases = [
            ("x16,h,h,h,h,h,h,h,h,h,h", 1),
            ("n3,h,h,h,h,h,h,h,h,h,h", 1),
            ("a12,h,h,h,h,h,h,h,h,h,h\ns12,h,h,h", 2),
            ("s2,h,h,h,h,h,h,h,h,h,q", 1),
            ("n,h,h,h,h,h,h,h,h,h,h", 1),
        ];
        for (text, expected_line) in cases {
            match text.parse::<StrategyTable>() {
                Err(BlackjackError::MalformedTable { line, .. }) => assert_eq!(line, expected_line),
                other => panic!("{:?} parsed as {:?}", text, other),
            }
        }
    }

    #[test]
    fn representative_hands() {
        let options = SolveOptions::default();
        assert_eq!(representative_hand(RowKind::Hard, 5, options).0, vec![2, 3]);
        let (hand, no_split) = representative_hand(RowKind::Hard, 4, options);
        assert_eq!(hand, vec![2, 2]);
        assert_eq!(no_split.max_splits, 0);
        assert_eq!(representative_hand(RowKind::Hard, 12, options).0, vec![7, 5]);
        assert_eq!(representative_hand(RowKind::Hard, 20, options).0, vec![10, 10]);
        assert_eq!(representative_hand(RowKind::Hard, 21, options).0, vec![10, 9, 2]);
        assert_eq!(representative_hand(RowKind::Soft, 12, options).0, vec![ACE, ACE]);
        assert_eq!(representative_hand(RowKind::Soft, 18, options).0, vec![ACE, 7]);
        assert_eq!(representative_hand(RowKind::Pair, 8, options).0, vec![8, 8]);
    }

    fn suggest(hand: &[u8], up: u8, solver: &mut Solver) -> String {
        let mut unseen = CardCount::with_number_of_decks(6);
        let mut used = CardCount::from_cards(hand).unwrap();
        used.add_card(up);
        unseen -= &used;
        let options = SolveOptions {
            max_splits: 1,
            ..Default::default()
        };
        suggest_cell(&solver.solve(hand, up, &unseen, options).unwrap()).to_string()
    }

    #[test]
    fn solver_suggests_basic_strategy_cells() {
        let mut solver = Solver::new();
        assert_eq!(suggest(&[6, 5], 6, &mut solver), "dh");
        assert_eq!(suggest(&[10, 6], TEN, &mut solver), "uh");
        assert_eq!(suggest(&[10, 7], 6, &mut solver), "s");
        assert_eq!(suggest(&[ACE, 7], 4, &mut solver), "ds");
        assert_eq!(suggest(&[7, 5], 4, &mut solver), "s");
        assert_eq!(suggest(&[2, 10], 4, &mut solver), "h");
    }

    #[test]
    #[ignore = "slow: solves every cell of a six deck table, run with --release"]
    fn generated_table_matches_basic_strategy() {
        let mut solver = Solver::new();
        let options = SolveOptions {
            max_splits: 1,
            ..Default::default()
        };
        let table = StrategyTable::generate(&mut solver, &CardCount::with_number_of_decks(6), options).unwrap();
        assert_eq!(table.to_string(), BASIC_STRATEGY);
    }
}
