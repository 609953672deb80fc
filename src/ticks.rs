//! Tick selection expressions such as `0,10:20,-100:-1:10`.

use crate::error::TickRangeError;
use std::collections::BTreeSet;

/// Set of ticks at which a frame is written out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TickSelector {
    ticks: BTreeSet<u64>,
}

impl TickSelector {
    /// Parses comma separated `tick`, `start:end` or `start:end:step`
    /// tokens. Ranges are inclusive. Negative values count back from
    /// `max_tick` (`-1` is `max_tick` itself) and are rejected when no
    /// positive maximum is known.
    pub(crate) fn parse(expr: &str, max_tick: Option<u64>) -> Result<Self, TickRangeError> {
        let wrap = match max_tick.filter(|&m| m > 0) {
            Some(m) => Some(
                i64::try_from(m)
                    .ok()
                    .and_then(|m| m.checked_add(1))
                    .ok_or(TickRangeError::MaxTooLarge(m))?,
            ),
            None => None,
        };
        let mut ticks = BTreeSet::new();

        for token in expr.split(',') {
            let malformed = || TickRangeError::Malformed(token.to_string());
            let parts = token
                .split(':')
                .map(|p| p.trim().parse::<i64>().map_err(|_| malformed()))
                .collect::<Result<Vec<_>, _>>()?;

            let parts = parts
                .into_iter()
                .map(|v| match (v < 0, wrap) {
                    (false, _) => Ok(v as u64),
                    (true, Some(m)) => Ok(v.rem_euclid(m) as u64),
                    (true, None) => Err(TickRangeError::UnboundedNegative(v)),
                })
                .collect::<Result<Vec<_>, _>>()?;

            match parts[..] {
                [tick] => {
                    ticks.insert(tick);
                }
                [start, end] => ticks.extend(start..=end),
                [start, end, step] => {
                    if step == 0 {
                        return Err(TickRangeError::BadStep(token.to_string()));
                    }
                    ticks.extend((start..=end).step_by(step as usize));
                }
                _ => return Err(malformed()),
            }
        }

        Ok(Self { ticks })
    }

    pub(crate) fn contains(&self, tick: i64) -> bool {
        u64::try_from(tick).map_or(false, |t| self.ticks.contains(&t))
    }

    pub(crate) fn len(&self) -> usize {
        self.ticks.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ticks.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(expr: &str, max_tick: Option<u64>) -> Vec<u64> {
        TickSelector::parse(expr, max_tick).unwrap().iter().collect()
    }

    #[test]
    fn test_single_and_ranges() {
        assert_eq!(ticks("5", None), vec![5]);
        assert_eq!(ticks("2:4", None), vec![2, 3, 4]);
        assert_eq!(ticks("2:4", Some(1000)), vec![2, 3, 4]);
        assert_eq!(ticks("2:6:2", None), vec![2, 4, 6]);
        assert_eq!(ticks("2:7:2", None), vec![2, 4, 6]);
        assert_eq!(ticks("4:2", None), Vec::<u64>::new());
    }

    #[test]
    fn test_union_collapses_duplicates() {
        assert_eq!(ticks("1:3,2,3:4,0", None), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_negative_wraps_against_max() {
        assert_eq!(ticks("-1", Some(10)), vec![10]);
        assert_eq!(ticks("-3:-1", Some(10)), vec![8, 9, 10]);
        assert_eq!(ticks("0:-1:5", Some(10)), vec![0, 5, 10]);
    }

    #[test]
    fn test_negative_without_max_fails() {
        assert_eq!(
            TickSelector::parse("-1", None),
            Err(TickRangeError::UnboundedNegative(-1))
        );
        assert_eq!(
            TickSelector::parse("1,-2:4", Some(0)),
            Err(TickRangeError::UnboundedNegative(-2))
        );
    }

    #[test]
    fn test_huge_max_is_an_error() {
        assert_eq!(
            TickSelector::parse("-1", Some(u64::MAX)),
            Err(TickRangeError::MaxTooLarge(u64::MAX))
        );
        assert_eq!(
            TickSelector::parse("0:-1", Some(i64::MAX as u64)),
            Err(TickRangeError::MaxTooLarge(i64::MAX as u64))
        );
        assert_eq!(ticks("-1", Some(i64::MAX as u64 - 1)), vec![i64::MAX as u64 - 1]);
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(TickSelector::parse("a", None), Err(TickRangeError::Malformed(_))));
        assert!(matches!(TickSelector::parse("1,", None), Err(TickRangeError::Malformed(_))));
        assert!(matches!(TickSelector::parse("1:2:3:4", None), Err(TickRangeError::Malformed(_))));
        assert!(matches!(TickSelector::parse("1:5:0", None), Err(TickRangeError::BadStep(_))));
    }

    #[test]
    fn test_contains() {
        let sel = TickSelector::parse("0,3", None).unwrap();
        assert!(sel.contains(3));
        assert!(!sel.contains(2));
        assert!(!sel.contains(-3));
        assert_eq!(sel.len(), 2);
    }
}
