//! Round data model: identifiers, statuses, drawn results and the bounded result history.

use std::{collections::VecDeque, fmt, str::FromStr};

use thiserror::Error;
use time::OffsetDateTime;

/// Number of marbles racing in a round, hence the length of every result.
pub const POSITIONS_LEN: usize = 10;
/// Default capacity of the recent-results list.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
/// Sums strictly above this threshold are "big".
const BIG_THRESHOLD: u8 = 11;

/// Opaque identifier of a betting round.
///
/// Identifiers are never compared numerically, only for equality. Numeric ids coming off the
/// wire are converted to their decimal form once at the normalization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoundId(String);

impl RoundId {
    /// Build an identifier, rejecting empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    /// No round is active; waiting for the server to open the next one.
    Waiting,
    /// Bets are accepted while the countdown runs.
    Betting,
    /// Betting is closed and the race has not reported a result yet.
    Closed,
    /// The race is running. Treated like [`RoundStatus::Closed`] for betting purposes.
    Playing,
    /// The result is known and displayed until the grace window elapses.
    Finished,
}

impl RoundStatus {
    /// Lowercase name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Waiting => "waiting",
            RoundStatus::Betting => "betting",
            RoundStatus::Closed => "closed",
            RoundStatus::Playing => "playing",
            RoundStatus::Finished => "finished",
        }
    }

    /// Whether the round is closed for bets and waiting for its result.
    pub fn is_awaiting_result(self) -> bool {
        matches!(self, RoundStatus::Closed | RoundStatus::Playing)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name is not one of the five known statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown round status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for RoundStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(RoundStatus::Waiting),
            "betting" => Ok(RoundStatus::Betting),
            "closed" => Ok(RoundStatus::Closed),
            "playing" => Ok(RoundStatus::Playing),
            "finished" => Ok(RoundStatus::Finished),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// "Big" or "small" classification of a result's sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BigSmall {
    Big,
    Small,
}

/// Parity of a result's sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddEven {
    Odd,
    Even,
}

/// Reasons a list of drawn positions is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionsError {
    #[error("expected {POSITIONS_LEN} positions, got {0}")]
    Length(usize),
    #[error("position {value} at index {index} is outside 1..=10")]
    OutOfRange { index: usize, value: i64 },
    #[error("position {0} appears more than once")]
    Duplicate(u8),
}

/// Finishing order of the ten marbles: every number `1..=10` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positions([u8; POSITIONS_LEN]);

impl Positions {
    /// Validate raw wire values into a finishing order.
    pub fn try_from_values(values: &[i64]) -> Result<Self, PositionsError> {
        if values.len() != POSITIONS_LEN {
            return Err(PositionsError::Length(values.len()));
        }

        let mut positions = [0u8; POSITIONS_LEN];
        let mut seen = [false; POSITIONS_LEN + 1];
        for (index, &value) in values.iter().enumerate() {
            if !(1..=POSITIONS_LEN as i64).contains(&value) {
                return Err(PositionsError::OutOfRange { index, value });
            }
            let number = value as u8;
            if seen[number as usize] {
                return Err(PositionsError::Duplicate(number));
            }
            seen[number as usize] = true;
            positions[index] = number;
        }

        Ok(Self(positions))
    }

    /// Marble numbers from first to last place.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Immutable result of a finished round, with the derived fields computed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    round_id: RoundId,
    positions: Positions,
    sum: u8,
    big_small: BigSmall,
    odd_even: OddEven,
    drawn_at: Option<OffsetDateTime>,
}

impl RoundResult {
    /// Record the result of `round_id` and derive sum, big/small and odd/even from it.
    pub fn new(round_id: RoundId, positions: Positions) -> Self {
        let sum = positions.0[0] + positions.0[1];
        let big_small = if sum > BIG_THRESHOLD {
            BigSmall::Big
        } else {
            BigSmall::Small
        };
        let odd_even = if sum % 2 == 0 {
            OddEven::Even
        } else {
            OddEven::Odd
        };

        Self {
            round_id,
            positions,
            sum,
            big_small,
            odd_even,
            drawn_at: None,
        }
    }

    /// Attach the server timestamp reported by the results page.
    pub fn with_drawn_at(mut self, drawn_at: Option<OffsetDateTime>) -> Self {
        self.drawn_at = drawn_at;
        self
    }

    /// Round this result belongs to.
    pub fn round_id(&self) -> &RoundId {
        &self.round_id
    }

    /// Finishing order.
    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    /// Sum of the first two finishers.
    pub fn sum(&self) -> u8 {
        self.sum
    }

    /// Big/small classification of [`Self::sum`].
    pub fn big_small(&self) -> BigSmall {
        self.big_small
    }

    /// Parity of [`Self::sum`].
    pub fn odd_even(&self) -> OddEven {
        self.odd_even
    }

    /// When the server drew the result, if it said.
    pub fn drawn_at(&self) -> Option<OffsetDateTime> {
        self.drawn_at
    }
}

/// Bounded list of recent results, most recent first, without duplicate rounds.
#[derive(Debug, Clone)]
pub struct ResultHistory {
    entries: VecDeque<RoundResult>,
    capacity: usize,
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResultHistory {
    /// Create an empty history holding at most `capacity` results (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether a result for `round_id` is already recorded.
    pub fn contains(&self, round_id: &RoundId) -> bool {
        self.entries.iter().any(|entry| entry.round_id() == round_id)
    }

    /// Prepend a freshly confirmed result, evicting the oldest entry once over capacity.
    ///
    /// Returns `false` when the round already has a recorded result.
    pub fn record(&mut self, result: RoundResult) -> bool {
        if self.contains(result.round_id()) {
            return false;
        }

        self.entries.push_front(result);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
        true
    }

    /// Append an older result (e.g. from a results page) behind the existing entries.
    ///
    /// Returns `false` when the round is already known or the history is full.
    pub fn append_older(&mut self, result: RoundResult) -> bool {
        if self.entries.len() >= self.capacity || self.contains(result.round_id()) {
            return false;
        }

        self.entries.push_back(result);
        true
    }

    /// Iterate from the most recent result to the oldest.
    pub fn iter(&self) -> impl Iterator<Item = &RoundResult> {
        self.entries.iter()
    }

    /// Owned copy, most recent first.
    pub fn to_vec(&self) -> Vec<RoundResult> {
        self.entries.iter().cloned().collect()
    }
}

/// Normalized REST snapshot of the round the server currently considers active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub round_id: RoundId,
    /// Status the server reports.
    pub status: RoundStatus,
    /// Seconds left for bets; zero unless betting.
    pub countdown_seconds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> RoundId {
        RoundId::new(value).unwrap()
    }

    fn result(round: &str, values: &[i64]) -> RoundResult {
        RoundResult::new(id(round), Positions::try_from_values(values).unwrap())
    }

    #[test]
    fn sum_of_eleven_is_small_and_odd() {
        let result = result("R1", &[7, 4, 2, 9, 1, 6, 3, 10, 5, 8]);
        assert_eq!(result.sum(), 11);
        assert_eq!(result.big_small(), BigSmall::Small);
        assert_eq!(result.odd_even(), OddEven::Odd);
    }

    #[test]
    fn sum_of_seventeen_is_big_and_odd() {
        let result = result("R2", &[9, 8, 1, 2, 3, 4, 5, 6, 7, 10]);
        assert_eq!(result.sum(), 17);
        assert_eq!(result.big_small(), BigSmall::Big);
        assert_eq!(result.odd_even(), OddEven::Odd);
    }

    #[test]
    fn even_sum_is_even() {
        let result = result("R3", &[10, 2, 1, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(result.sum(), 12);
        assert_eq!(result.big_small(), BigSmall::Big);
        assert_eq!(result.odd_even(), OddEven::Even);
    }

    #[test]
    fn positions_must_have_ten_entries() {
        assert_eq!(
            Positions::try_from_values(&[1, 2, 3]),
            Err(PositionsError::Length(3))
        );
        assert_eq!(
            Positions::try_from_values(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 1]),
            Err(PositionsError::Length(11))
        );
    }

    #[test]
    fn positions_reject_out_of_range_and_duplicates() {
        assert_eq!(
            Positions::try_from_values(&[0, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            Err(PositionsError::OutOfRange { index: 0, value: 0 })
        );
        assert_eq!(
            Positions::try_from_values(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 11]),
            Err(PositionsError::OutOfRange {
                index: 9,
                value: 11
            })
        );
        assert_eq!(
            Positions::try_from_values(&[1, 1, 3, 4, 5, 6, 7, 8, 9, 10]),
            Err(PositionsError::Duplicate(1))
        );
    }

    #[test]
    fn round_id_is_opaque_and_non_empty() {
        assert!(RoundId::new("").is_none());
        assert!(RoundId::new("   ").is_none());
        assert_ne!(id("007"), id("7"));
        assert_eq!(id(" 20240101-001 ").as_str(), "20240101-001");
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("BETTING".parse::<RoundStatus>(), Ok(RoundStatus::Betting));
        assert_eq!(" playing ".parse::<RoundStatus>(), Ok(RoundStatus::Playing));
        assert!("settled".parse::<RoundStatus>().is_err());
    }

    #[test]
    fn history_never_exceeds_capacity_and_evicts_oldest() {
        let mut history = ResultHistory::new(10);
        for round in 1..=11 {
            assert!(history.record(result(
                &format!("R{round}"),
                &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
            )));
        }

        assert_eq!(history.len(), 10);
        let ids: Vec<_> = history.iter().map(|r| r.round_id().to_string()).collect();
        assert_eq!(ids.first().map(String::as_str), Some("R11"));
        assert_eq!(ids.last().map(String::as_str), Some("R2"));
        assert!(!history.contains(&id("R1")));
    }

    #[test]
    fn history_ignores_duplicate_rounds() {
        let mut history = ResultHistory::new(10);
        assert!(history.record(result("R1", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])));
        assert!(!history.record(result("R1", &[2, 1, 3, 4, 5, 6, 7, 8, 9, 10])));
        assert!(!history.append_older(result("R1", &[2, 1, 3, 4, 5, 6, 7, 8, 9, 10])));
        assert_eq!(history.len(), 1);
        assert_eq!(history.iter().next().unwrap().sum(), 3);
    }

    #[test]
    fn append_older_fills_behind_newer_entries() {
        let mut history = ResultHistory::new(2);
        history.record(result("R5", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        assert!(history.append_older(result("R4", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])));
        assert!(!history.append_older(result("R3", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])));

        let ids: Vec<_> = history.iter().map(|r| r.round_id().to_string()).collect();
        assert_eq!(ids, vec!["R5", "R4"]);
    }
}
