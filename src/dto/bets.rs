//! Bet slip requests/responses and the upstream ledger contract.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::bet_slip::{BetDraft, BetSlip};

/// Add a draft to the bet slip.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddBetRequest {
    #[validate(length(min = 1, max = 32))]
    pub category: String,
    #[validate(length(min = 1, max = 32))]
    pub option: String,
    #[validate(range(min = 1))]
    pub amount: u64,
    /// Odds quoted when the draft was composed.
    #[validate(range(exclusive_min = 0.0))]
    pub odds: f64,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct BetDraftDto {
    pub id: Uuid,
    pub category: String,
    pub option: String,
    pub amount: u64,
    pub odds: f64,
    pub potential_payout: u64,
}

impl From<&BetDraft> for BetDraftDto {
    fn from(draft: &BetDraft) -> Self {
        Self {
            id: draft.id,
            category: draft.category.clone(),
            option: draft.option.clone(),
            amount: draft.amount,
            odds: draft.odds,
            potential_payout: draft.potential_payout,
        }
    }
}

/// Current content of the bet slip.
#[derive(Debug, Serialize, ToSchema)]
pub struct BetSlipResponse {
    pub round_id: Option<String>,
    pub drafts: Vec<BetDraftDto>,
    pub total_stake: u64,
    pub potential_payout: u64,
}

impl From<&BetSlip> for BetSlipResponse {
    fn from(slip: &BetSlip) -> Self {
        Self {
            round_id: slip.round_id().map(ToString::to_string),
            drafts: slip.drafts().iter().map(BetDraftDto::from).collect(),
            total_stake: slip.total_stake(),
            potential_payout: slip.total_potential_payout(),
        }
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitBetsResponse {
    pub round_id: String,
    pub accepted: usize,
    pub balance: i64,
}

/// Body sent to the upstream ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSubmission {
    pub round_id: String,
    pub bets: Vec<BetLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BetLine {
    pub category: String,
    pub option: String,
    pub amount: u64,
    pub odds: f64,
}

impl From<&BetDraft> for BetLine {
    fn from(draft: &BetDraft) -> Self {
        Self {
            category: draft.category.clone(),
            option: draft.option.clone(),
            amount: draft.amount,
            odds: draft.odds,
        }
    }
}

/// Ledger answer: the player's balance after the bets were taken.
#[derive(Debug, Clone, Deserialize)]
pub struct BetReceipt {
    pub balance: i64,
    #[serde(default)]
    pub accepted: Option<usize>,
}
