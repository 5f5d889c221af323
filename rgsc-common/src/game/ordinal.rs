//! Ordered enumerations (lamps, grades)
//!
//! Comparison always goes through an explicit index lookup. A higher index
//! is better, whatever direction the game UI presents.

use crate::{Error, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Named ordered set of string values
#[derive(Debug, Clone)]
pub struct OrderedSet {
    name: &'static str,
    values: Vec<&'static str>,
    index: HashMap<&'static str, usize>,
}

impl OrderedSet {
    /// Build from values listed worst to best
    pub fn ascending(name: &'static str, values: &[&'static str]) -> Self {
        let values = values.to_vec();
        let index = values.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        Self { name, values, index }
    }

    /// Build from explicitly ranked values in any declaration order
    ///
    /// Ranks must form a permutation of `0..n`.
    pub fn from_ranked(name: &'static str, ranked: &[(&'static str, usize)]) -> Result<Self> {
        let mut slots: Vec<Option<&'static str>> = vec![None; ranked.len()];
        let total = ranked.len();
        for &(value, rank) in ranked {
            let slot = slots.get_mut(rank).ok_or_else(|| {
                Error::Config(format!(
                    "{}: rank {} out of range for {} values",
                    name, rank, total
                ))
            })?;
            if let Some(existing) = slot {
                return Err(Error::Config(format!(
                    "{}: rank {} assigned to both {} and {}",
                    name, rank, existing, value
                )));
            }
            *slot = Some(value);
        }

        let values: Vec<&'static str> = slots.into_iter().flatten().collect();
        let set = Self::ascending(name, &values);
        if set.index.len() != set.values.len() {
            return Err(Error::Config(format!("{}: duplicate values", name)));
        }
        Ok(set)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[&'static str] {
        &self.values
    }

    /// Index of `value`; unknown values are an error, never clamped
    pub fn index_of(&self, value: &str) -> Result<usize> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| Error::UnknownOrdinalValue {
                set: self.name.to_string(),
                value: value.to_string(),
            })
    }

    pub fn value_at(&self, index: usize) -> Option<&'static str> {
        self.values.get(index).copied()
    }

    pub fn compare(&self, a: &str, b: &str) -> Result<Ordering> {
        Ok(self.index_of(a)?.cmp(&self.index_of(b)?))
    }

    /// True when `value` ranks at or above `threshold`
    pub fn at_least(&self, value: &str, threshold: &str) -> Result<bool> {
        Ok(self.compare(value, threshold)? != Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_uses_rank_not_declaration_order() {
        let lamps = OrderedSet::from_ranked(
            "lamp",
            &[("FULL COMBO", 2), ("FAILED", 0), ("CLEAR", 1)],
        )
        .unwrap();

        assert_eq!(lamps.compare("FULL COMBO", "CLEAR").unwrap(), Ordering::Greater);
        assert_eq!(lamps.compare("CLEAR", "FAILED").unwrap(), Ordering::Greater);
        assert_eq!(lamps.compare("FAILED", "FULL COMBO").unwrap(), Ordering::Less);
        assert_eq!(lamps.compare("CLEAR", "CLEAR").unwrap(), Ordering::Equal);
        assert_eq!(lamps.values(), &["FAILED", "CLEAR", "FULL COMBO"]);
    }

    #[test]
    fn test_unknown_value_is_an_error() {
        let lamps = OrderedSet::ascending("lamp", &["FAILED", "CLEAR"]);
        let err = lamps.index_of("HARD CLEAR").unwrap_err();
        assert!(matches!(err, Error::UnknownOrdinalValue { ref value, .. } if value == "HARD CLEAR"));
        assert!(lamps.compare("CLEAR", "HARD CLEAR").is_err());
    }

    #[test]
    fn test_from_ranked_rejects_gaps_and_duplicates() {
        assert!(OrderedSet::from_ranked("grade", &[("A", 0), ("B", 2)]).is_err());
        assert!(OrderedSet::from_ranked("grade", &[("A", 0), ("B", 0)]).is_err());
        assert!(OrderedSet::from_ranked("grade", &[("A", 0), ("A", 1)]).is_err());
    }

    #[test]
    fn test_at_least() {
        let lamps = OrderedSet::ascending("lamp", &["FAILED", "EASY CLEAR", "HARD CLEAR"]);
        assert!(lamps.at_least("HARD CLEAR", "EASY CLEAR").unwrap());
        assert!(lamps.at_least("EASY CLEAR", "EASY CLEAR").unwrap());
        assert!(!lamps.at_least("FAILED", "EASY CLEAR").unwrap());
    }
}
