//! Player-side bet drafts. Owned here, not by the coordinator; the slip only reacts to
//! the coordinator's clear signals.

use uuid::Uuid;

use crate::state::round::RoundId;

/// One bet the player is composing.
#[derive(Debug, Clone, PartialEq)]
pub struct BetDraft {
    /// Local identifier used to remove the draft.
    pub id: Uuid,
    /// Bet family, e.g. `big_small` or `champion`.
    pub category: String,
    /// Option identifier within the category, e.g. `big`.
    pub option: String,
    /// Stake in points.
    pub amount: u64,
    /// Decimal odds offered for the option.
    pub odds: f64,
    /// `floor(amount * odds)`, computed once when the draft is created.
    pub potential_payout: u64,
}

impl BetDraft {
    /// Create a draft and compute its potential payout.
    pub fn new(category: String, option: String, amount: u64, odds: f64) -> Self {
        let potential_payout = (amount as f64 * odds).floor() as u64;
        Self {
            id: Uuid::new_v4(),
            category,
            option,
            amount,
            odds,
            potential_payout,
        }
    }
}

/// Drafts composed for the round that was open when the first draft was added.
#[derive(Debug, Clone, Default)]
pub struct BetSlip {
    round_id: Option<RoundId>,
    drafts: Vec<BetDraft>,
}

impl BetSlip {
    /// Empty slip bound to no round.
    pub fn new() -> Self {
        Self::default()
    }

    /// Round the drafts were placed for.
    pub fn round_id(&self) -> Option<&RoundId> {
        self.round_id.as_ref()
    }

    /// Drafts in insertion order.
    pub fn drafts(&self) -> &[BetDraft] {
        &self.drafts
    }

    /// Whether the slip holds no draft.
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// Add a draft for `round_id`.
    ///
    /// Drafts left over from another round are discarded first. A draft on the same
    /// category and option replaces the previous one.
    pub fn add(&mut self, round_id: RoundId, draft: BetDraft) -> &BetDraft {
        if self.round_id.as_ref() != Some(&round_id) {
            self.drafts.clear();
            self.round_id = Some(round_id);
        }

        self.drafts
            .retain(|existing| existing.category != draft.category || existing.option != draft.option);
        self.drafts.push(draft);
        &self.drafts[self.drafts.len() - 1]
    }

    /// Remove a single draft; returns whether it existed.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.drafts.len();
        self.drafts.retain(|draft| draft.id != id);
        before != self.drafts.len()
    }

    /// Drop every draft, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.drafts.len();
        self.drafts.clear();
        self.round_id = None;
        removed
    }

    /// Sum of every draft amount.
    pub fn total_stake(&self) -> u64 {
        self.drafts.iter().map(|draft| draft.amount).sum()
    }

    /// Sum of every draft's potential payout.
    pub fn total_potential_payout(&self) -> u64 {
        self.drafts.iter().map(|draft| draft.potential_payout).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> RoundId {
        RoundId::new(value).unwrap()
    }

    fn draft(option: &str, amount: u64, odds: f64) -> BetDraft {
        BetDraft::new("big_small".into(), option.into(), amount, odds)
    }

    #[test]
    fn payout_is_floored() {
        assert_eq!(draft("big", 100, 1.95).potential_payout, 195);
        assert_eq!(draft("big", 3, 1.95).potential_payout, 5);
        assert_eq!(draft("big", 1, 0.5).potential_payout, 0);
    }

    #[test]
    fn same_option_replaces_previous_draft() {
        let mut slip = BetSlip::new();
        slip.add(id("R1"), draft("big", 100, 1.95));
        slip.add(id("R1"), draft("small", 50, 1.95));
        slip.add(id("R1"), draft("big", 200, 1.95));

        assert_eq!(slip.drafts().len(), 2);
        assert_eq!(slip.total_stake(), 250);
        assert_eq!(slip.total_potential_payout(), 390 + 97);
    }

    #[test]
    fn drafts_from_previous_round_are_discarded() {
        let mut slip = BetSlip::new();
        slip.add(id("R1"), draft("big", 100, 1.95));
        slip.add(id("R2"), draft("small", 10, 1.95));

        assert_eq!(slip.round_id(), Some(&id("R2")));
        assert_eq!(slip.drafts().len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let mut slip = BetSlip::new();
        let first = slip.add(id("R1"), draft("big", 100, 1.95)).id;
        slip.add(id("R1"), draft("small", 10, 1.95));

        assert!(slip.remove(first));
        assert!(!slip.remove(first));
        assert_eq!(slip.clear(), 1);
        assert!(slip.is_empty());
        assert_eq!(slip.round_id(), None);
    }
}
