//! Rule strings and the transition tables they resolve to.
//!
//! A rule string is a comma separated list of segments. Each segment is
//! `<alive digits>/<dead digits>`, optionally prefixed with `Nx` to
//! repeat it `N` times, or a random directive `AB+CD` that is resolved
//! to a concrete rule once, at parse time.

use crate::error::RuleError;
use rand::{seq::index, Rng};
use std::ops::Range;

/// Highest neighbour count a cell can see.
pub(crate) const MAX_NEIGHBOURS: u8 = 8;

/// Random directives draw their digits from this many counts (0..=7).
const RANDOM_CHOICES: usize = 8;

/// What happens to a cell at one particular neighbour count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Flip {
    pub(crate) if_alive: bool,
    pub(crate) if_dead: bool,
}

/// Flip decisions for every neighbour count `0..=8`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TransitionTable {
    flips: [Flip; MAX_NEIGHBOURS as usize + 1],
}

impl TransitionTable {
    fn parse(segment: &str) -> Result<Self, RuleError> {
        let (alive, dead) = match segment.split_once('/') {
            Some((a, d)) if !d.contains('/') => (a, d),
            _ => return Err(RuleError::MissingSlash(segment.to_string())),
        };

        let mut table = Self::default();
        for ch in alive.chars() {
            let n = count_digit(segment, ch)?;
            table.flips[n].if_alive = true;
        }
        for ch in dead.chars() {
            let n = count_digit(segment, ch)?;
            table.flips[n].if_dead = true;
        }
        Ok(table)
    }

    pub(crate) fn flip(&self, neighbours: u8) -> Flip {
        self.flips[usize::from(neighbours.min(MAX_NEIGHBOURS))]
    }

    /// State of a cell after one tick under this table.
    pub(crate) fn next_state(&self, alive: bool, neighbours: u8) -> bool {
        let flip = self.flip(neighbours);
        if alive {
            !flip.if_alive
        } else {
            flip.if_dead
        }
    }
}

fn count_digit(segment: &str, ch: char) -> Result<usize, RuleError> {
    match ch.to_digit(10) {
        Some(d) if d <= u32::from(MAX_NEIGHBOURS) => Ok(d as usize),
        _ => Err(RuleError::BadDigit {
            segment: segment.to_string(),
            ch,
        }),
    }
}

/// Tables cycled through by tick number. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RuleSequence {
    tables: Vec<TransitionTable>,
}

impl RuleSequence {
    pub(crate) fn len(&self) -> usize {
        self.tables.len()
    }

    /// Table in effect at `tick`. Negative ticks wrap like positive ones.
    pub(crate) fn at(&self, tick: i64) -> &TransitionTable {
        let i = tick.rem_euclid(self.tables.len() as i64) as usize;
        &self.tables[i]
    }
}

/// A parsed rule together with the string that reproduces it.
///
/// `canonical` equals the input except that every random directive is
/// replaced by the rule it resolved to.
#[derive(Clone, Debug)]
pub(crate) struct ParsedRule {
    pub(crate) sequence: RuleSequence,
    pub(crate) canonical: String,
}

pub(crate) fn parse_rules<R: Rng + ?Sized>(
    rule_string: &str,
    rng: &mut R,
) -> Result<ParsedRule, RuleError> {
    let mut tables = Vec::new();
    let mut canonical = Vec::new();

    for segment in rule_string.split(',') {
        if segment.is_empty() {
            return Err(RuleError::EmptySegment(rule_string.to_string()));
        }

        let (prefix, body) = match segment.split_once('x') {
            Some((mult, rest)) => (Some(mult), rest),
            None => (None, segment),
        };
        let repeat = match prefix {
            Some(mult) => match mult.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(RuleError::BadMultiplier(mult.to_string())),
            },
            None => 1,
        };

        let resolved = if body.contains('+') {
            let (alive, dead) = random_bounds(body)?;
            random_rule(rng, alive, dead)
        } else {
            body.to_string()
        };

        let table = TransitionTable::parse(&resolved)?;
        tables.extend(std::iter::repeat(table).take(repeat));
        canonical.push(match prefix {
            Some(mult) => format!("{mult}x{resolved}"),
            None => resolved,
        });
    }

    Ok(ParsedRule {
        sequence: RuleSequence { tables },
        canonical: canonical.join(","),
    })
}

/// Splits `AB+CD` into the ranges `A..B` and `C..D`.
fn random_bounds(directive: &str) -> Result<(Range<usize>, Range<usize>), RuleError> {
    let bad = || RuleError::BadRandomDirective(directive.to_string());
    let (left, right) = directive.split_once('+').ok_or_else(bad)?;

    let pair = |s: &str| -> Result<(u32, u32), RuleError> {
        let digits: Option<Vec<u32>> = s.chars().map(|c| c.to_digit(10)).collect();
        match digits.as_deref() {
            Some(&[low, high]) => Ok((low, high)),
            _ => Err(bad()),
        }
    };

    let (alive, dead) = (pair(left)?, pair(right)?);
    for (low, high) in [alive, dead] {
        if low >= high {
            return Err(RuleError::EmptyRandomRange {
                directive: directive.to_string(),
                low,
                high,
            });
        }
    }
    Ok((
        alive.0 as usize..alive.1 as usize,
        dead.0 as usize..dead.1 as usize,
    ))
}

/// Generates a random `alive/dead` rule whose digit counts fall in the
/// given ranges. Digits are distinct and sorted.
pub(crate) fn random_rule<R: Rng + ?Sized>(
    rng: &mut R,
    alive: Range<usize>,
    dead: Range<usize>,
) -> String {
    let mut digits = |counts: Range<usize>| -> String {
        let amount = rng.gen_range(counts).min(RANDOM_CHOICES);
        let mut picked = index::sample(&mut *rng, RANDOM_CHOICES, amount).into_vec();
        picked.sort_unstable();
        picked.iter().map(|d| d.to_string()).collect()
    };
    let l = digits(alive);
    let r = digits(dead);
    format!("{l}/{r}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn parse(s: &str) -> Result<ParsedRule, RuleError> {
        parse_rules(s, &mut StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_digits_set_flips() {
        let rule = parse("3/2").unwrap();
        assert_eq!(rule.sequence.len(), 1);
        let table = rule.sequence.at(0);
        for n in 0..=MAX_NEIGHBOURS {
            let flip = table.flip(n);
            assert_eq!(flip.if_alive, n == 3, "alive flip at {n}");
            assert_eq!(flip.if_dead, n == 2, "dead flip at {n}");
        }
    }

    #[test]
    fn test_next_state() {
        let table = parse("3/2").unwrap().sequence.at(0).clone();
        assert!(!table.next_state(true, 3));
        assert!(table.next_state(true, 2));
        assert!(table.next_state(false, 2));
        assert!(!table.next_state(false, 3));
    }

    #[test]
    fn test_empty_digit_groups() {
        let table = parse("/").unwrap().sequence.at(0).clone();
        assert_eq!(table, TransitionTable::default());
    }

    #[test]
    fn test_duplicate_digits_are_idempotent() {
        assert_eq!(parse("33/22").unwrap().sequence, parse("3/2").unwrap().sequence);
    }

    #[test]
    fn test_sequence_and_multiplier() {
        let rule = parse("23/3,2x/3").unwrap();
        assert_eq!(rule.sequence.len(), 3);
        assert_eq!(rule.canonical, "23/3,2x/3");
        assert_eq!(rule.sequence.at(1), rule.sequence.at(2));
        assert_ne!(rule.sequence.at(0), rule.sequence.at(1));
        // cycles
        assert_eq!(rule.sequence.at(3), rule.sequence.at(0));
        assert_eq!(rule.sequence.at(-1), rule.sequence.at(2));
    }

    #[test]
    fn test_malformed_rules() {
        assert_eq!(parse("23").unwrap_err(), RuleError::MissingSlash("23".into()));
        assert!(matches!(parse("2/3/4"), Err(RuleError::MissingSlash(_))));
        assert!(matches!(parse("2a/3"), Err(RuleError::BadDigit { ch: 'a', .. })));
        assert!(matches!(parse("9/3"), Err(RuleError::BadDigit { ch: '9', .. })));
        assert!(matches!(parse("23/3,"), Err(RuleError::EmptySegment(_))));
        assert!(matches!(parse("0x23/3"), Err(RuleError::BadMultiplier(_))));
        assert!(matches!(parse("ax23/3"), Err(RuleError::BadMultiplier(_))));
    }

    #[test]
    fn test_random_directive_resolves() {
        let rule = parse("13+25").unwrap();
        assert_eq!(rule.sequence.len(), 1);
        let (alive, dead) = rule.canonical.split_once('/').unwrap();
        assert!((1..3).contains(&alive.len()), "{}", rule.canonical);
        assert!((2..5).contains(&dead.len()), "{}", rule.canonical);
        for digits in [alive, dead] {
            let v: Vec<char> = digits.chars().collect();
            assert!(v.windows(2).all(|w| w[0] < w[1]));
            assert!(v.iter().all(|c| ('0'..='7').contains(c)));
        }
        // the resolved text parses to the same table
        let again = parse(&rule.canonical).unwrap();
        assert_eq!(again.sequence, rule.sequence);
        assert_eq!(again.canonical, rule.canonical);
    }

    #[test]
    fn test_random_directive_keeps_multiplier_and_neighbours() {
        let rule = parse("23/3,3x12+12").unwrap();
        assert_eq!(rule.sequence.len(), 4);
        assert!(rule.canonical.starts_with("23/3,3x"));
        assert!(!rule.canonical.contains('+'));
    }

    #[test]
    fn test_random_directive_is_seeded() {
        let a = parse_rules("18+18", &mut StdRng::seed_from_u64(99)).unwrap();
        let b = parse_rules("18+18", &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.canonical, b.canonical);
    }

    #[test]
    fn test_bad_random_directives() {
        assert!(matches!(
            parse("31+12"),
            Err(RuleError::EmptyRandomRange { low: 3, high: 1, .. })
        ));
        assert!(matches!(parse("12+22"), Err(RuleError::EmptyRandomRange { .. })));
        assert!(matches!(parse("3+12"), Err(RuleError::BadRandomDirective(_))));
        assert!(matches!(parse("1a+12"), Err(RuleError::BadRandomDirective(_))));
        assert!(matches!(parse("12+"), Err(RuleError::BadRandomDirective(_))));
    }

    proptest! {
        #[test]
        fn test_canonical_is_fixed_point(
            s in "([1-9]x)?[0-8]{0,5}/[0-8]{0,5}(,([1-9]x)?[0-8]{0,5}/[0-8]{0,5}){0,3}"
        ) {
            let first = parse(&s).unwrap();
            prop_assert_eq!(&first.canonical, &s);
            let second = parse(&first.canonical).unwrap();
            prop_assert_eq!(&second.canonical, &first.canonical);
            prop_assert_eq!(second.sequence, first.sequence);
        }
    }
}
