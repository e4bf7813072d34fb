//! Result-count limit with an unbounded sentinel.
//!
//! `--num` accepts either an integer or `all`. `all` maps to
//! [`Limit::Infinity`], which is larger than every count, equal only to itself,
//! and absorbs subtraction of finite counts.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Count(u64),
    Infinity,
}

impl Limit {
    /// `self - rhs`.
    ///
    /// `Infinity - n == Infinity`, `Infinity - Infinity == 0`, and subtracting
    /// `Infinity` from a finite count is an error. Finite subtraction saturates
    /// at zero.
    pub fn checked_sub(self, rhs: Limit) -> Result<Limit> {
        match (self, rhs) {
            (Limit::Infinity, Limit::Infinity) => Ok(Limit::Count(0)),
            (Limit::Infinity, Limit::Count(_)) => Ok(Limit::Infinity),
            (Limit::Count(_), Limit::Infinity) => Err(Error::invalid_argument(
                "cannot subtract Infinity from a finite count",
            )),
            (Limit::Count(a), Limit::Count(b)) => Ok(Limit::Count(a.saturating_sub(b))),
        }
    }

    /// Remaining room after `taken` items, still `Infinity` when unbounded.
    pub fn remaining(self, taken: u64) -> Limit {
        match self {
            Limit::Infinity => Limit::Infinity,
            Limit::Count(n) => Limit::Count(n.saturating_sub(taken)),
        }
    }

    /// Smallest of `self` and a finite bound.
    pub fn min_with(self, bound: u64) -> u64 {
        match self {
            Limit::Infinity => bound,
            Limit::Count(n) => n.min(bound),
        }
    }
}

impl From<u64> for Limit {
    fn from(n: u64) -> Self {
        Limit::Count(n)
    }
}

impl PartialOrd for Limit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Limit {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Limit::Infinity, Limit::Infinity) => Ordering::Equal,
            (Limit::Infinity, Limit::Count(_)) => Ordering::Greater,
            (Limit::Count(_), Limit::Infinity) => Ordering::Less,
            (Limit::Count(a), Limit::Count(b)) => a.cmp(b),
        }
    }
}

impl PartialEq<u64> for Limit {
    fn eq(&self, other: &u64) -> bool {
        matches!(self, Limit::Count(n) if n == other)
    }
}

impl PartialOrd<u64> for Limit {
    fn partial_cmp(&self, other: &u64) -> Option<Ordering> {
        Some(self.cmp(&Limit::Count(*other)))
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Count(n) => write!(f, "{}", n),
            Limit::Infinity => write!(f, "Infinity"),
        }
    }
}

impl FromStr for Limit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Limit::Infinity);
        }
        s.parse::<u64>()
            .map(Limit::Count)
            .map_err(|_| Error::invalid_argument(format!("num needs to be an integer or \"all\", got {:?}", s)))
    }
}
