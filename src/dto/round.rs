use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::format_timestamp,
    state::{
        lifecycle::RoundView,
        round::{BigSmall, OddEven, RoundResult, RoundStatus},
    },
};

/// Round status exposed to the presentation layer (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoundStatus {
    /// Waiting for the next round.
    Waiting,
    /// Bets are open.
    Betting,
    /// Betting closed, either confirmed by the server or predicted by the local countdown.
    Closed,
    /// Race in progress.
    Playing,
    /// Result known, shown until the grace window elapses.
    Finished,
}

impl From<RoundStatus> for VisibleRoundStatus {
    fn from(value: RoundStatus) -> Self {
        match value {
            RoundStatus::Waiting => VisibleRoundStatus::Waiting,
            RoundStatus::Betting => VisibleRoundStatus::Betting,
            RoundStatus::Closed => VisibleRoundStatus::Closed,
            RoundStatus::Playing => VisibleRoundStatus::Playing,
            RoundStatus::Finished => VisibleRoundStatus::Finished,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BigSmallDto {
    Big,
    Small,
}

impl From<BigSmall> for BigSmallDto {
    fn from(value: BigSmall) -> Self {
        match value {
            BigSmall::Big => BigSmallDto::Big,
            BigSmall::Small => BigSmallDto::Small,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OddEvenDto {
    Odd,
    Even,
}

impl From<OddEven> for OddEvenDto {
    fn from(value: OddEven) -> Self {
        match value {
            OddEven::Odd => OddEvenDto::Odd,
            OddEven::Even => OddEvenDto::Even,
        }
    }
}

/// A finished round with its derived fields.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultSummary {
    pub round_id: String,
    pub positions: Vec<u8>,
    pub sum: u8,
    pub big_small: BigSmallDto,
    pub odd_even: OddEvenDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawn_at: Option<String>,
}

impl From<&RoundResult> for RoundResultSummary {
    fn from(result: &RoundResult) -> Self {
        Self {
            round_id: result.round_id().to_string(),
            positions: result.positions().as_slice().to_vec(),
            sum: result.sum(),
            big_small: result.big_small().into(),
            odd_even: result.odd_even().into(),
            drawn_at: result.drawn_at().map(format_timestamp),
        }
    }
}

/// Read-only view of the current round.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoundViewResponse {
    pub status: VisibleRoundStatus,
    pub round_id: Option<String>,
    /// Seconds left for bets.
    pub countdown: u32,
    pub can_bet: bool,
    /// True while a collaborator suspended betting.
    pub suspended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Recent results, most recent first.
    pub results: Vec<RoundResultSummary>,
}

impl From<&RoundView> for RoundViewResponse {
    fn from(view: &RoundView) -> Self {
        Self {
            status: view.status.into(),
            round_id: view.round_id.as_ref().map(ToString::to_string),
            countdown: view.countdown,
            can_bet: view.can_bet,
            suspended: view.suspended,
            last_updated: view.last_updated.map(format_timestamp),
            results: view.results.iter().map(RoundResultSummary::from).collect(),
        }
    }
}

/// Bounded list of recent results.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultsResponse {
    pub results: Vec<RoundResultSummary>,
}

impl From<&[RoundResult]> for ResultsResponse {
    fn from(results: &[RoundResult]) -> Self {
        Self {
            results: results.iter().map(RoundResultSummary::from).collect(),
        }
    }
}

/// Betting suspension reported by an external collaborator.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SuspensionRequest {
    pub suspended: bool,
}
