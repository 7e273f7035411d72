//! Pure round lifecycle reducer.
//!
//! [`RoundLifecycle`] owns the authoritative [`RoundState`] and the bounded result history.
//! Every operation returns a [`Transition`] listing the side effects the host has to perform
//! (timers, collaborator signals). The reducer never reads a clock other than to stamp
//! `last_updated`, and never spawns anything.

use time::OffsetDateTime;

use crate::state::round::{
    Positions, ResultHistory, RoundId, RoundResult, RoundSnapshot, RoundStatus,
};

/// Monotonic counter fencing timers: a timer only acts if its epoch is still current.
pub type Epoch = u64;

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// (Re)start the 1 Hz countdown for the given epoch.
    StartCountdown(Epoch),
    /// Stop the countdown timer entirely.
    StopCountdown,
    /// Start the finished-to-waiting grace timer for the given epoch.
    StartGraceTimer(Epoch),
    /// Cancel any pending grace timer.
    CancelGraceTimer,
    /// Tell the bet slip to drop its drafts.
    ClearBetDrafts,
    /// Tell the hot-bet statistics collaborator to reset its aggregate.
    ClearHotBets,
    /// A new result entered the history.
    ResultRecorded(RoundResult),
}

/// Outcome of a reducer operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Whether the observable view changed.
    pub changed: bool,
    /// Effects to execute, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed(effects: Vec<Effect>) -> Self {
        Self {
            changed: true,
            effects,
        }
    }

    /// True when nothing happened at all.
    pub fn is_noop(&self) -> bool {
        !self.changed && self.effects.is_empty()
    }
}

/// The single mutable entity describing the tracked round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    /// Tracked round; `None` exactly when waiting.
    pub round_id: Option<RoundId>,
    /// Authoritative status; a countdown reaching zero never changes it.
    pub status: RoundStatus,
    /// Seconds left for bets. Only meaningful while betting.
    pub countdown_seconds: u32,
    /// Time of the last authoritative mutation.
    pub last_updated: Option<OffsetDateTime>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            round_id: None,
            status: RoundStatus::Waiting,
            countdown_seconds: 0,
            last_updated: None,
        }
    }
}

/// Immutable snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundView {
    /// Status as displayed; a betting round whose countdown hit zero reads as predicted `Closed`.
    pub status: RoundStatus,
    /// Round being displayed, if any.
    pub round_id: Option<RoundId>,
    /// Seconds left for bets, zero outside betting.
    pub countdown: u32,
    /// Betting, countdown running and not suspended.
    pub can_bet: bool,
    /// Betting suspended by a collaborator.
    pub suspended: bool,
    /// Time of the last authoritative mutation.
    pub last_updated: Option<OffsetDateTime>,
    /// Recent results, most recent first.
    pub results: Vec<RoundResult>,
}

/// Reducer reconciling round-started, betting-closed and result-confirmed events with the
/// local countdown.
#[derive(Debug, Clone)]
pub struct RoundLifecycle {
    state: RoundState,
    history: ResultHistory,
    epoch: Epoch,
    last_started: Option<RoundId>,
    suspended: bool,
}

impl Default for RoundLifecycle {
    fn default() -> Self {
        Self::new(ResultHistory::default())
    }
}

impl RoundLifecycle {
    /// Start in `waiting` with no tracked round.
    pub fn new(history: ResultHistory) -> Self {
        Self {
            state: RoundState::default(),
            history,
            epoch: 0,
            last_started: None,
            suspended: false,
        }
    }

    /// Tracked round state.
    pub fn state(&self) -> &RoundState {
        &self.state
    }

    /// Recent results, most recent first.
    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    /// Current timer epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether betting is suspended.
    pub fn suspended(&self) -> bool {
        self.suspended
    }

    /// Whether a countdown started for `epoch` should keep ticking.
    pub fn countdown_running(&self, epoch: Epoch) -> bool {
        epoch == self.epoch
            && self.state.status == RoundStatus::Betting
            && self.state.countdown_seconds > 0
    }

    /// Build the presentation snapshot.
    pub fn view(&self) -> RoundView {
        let status = match self.state.status {
            RoundStatus::Betting if self.state.countdown_seconds == 0 => RoundStatus::Closed,
            other => other,
        };
        let can_bet = self.state.status == RoundStatus::Betting
            && self.state.countdown_seconds > 0
            && !self.suspended;

        RoundView {
            status,
            round_id: self.state.round_id.clone(),
            countdown: self.state.countdown_seconds,
            can_bet,
            suspended: self.suspended,
            last_updated: self.state.last_updated,
            results: self.history.to_vec(),
        }
    }

    /// A new round opened for bets.
    ///
    /// The most recently started round is remembered even after the grace window clears the
    /// tracked id, so a replayed start for it is ignored.
    pub fn apply_round_started(&mut self, round_id: RoundId, countdown: u32) -> Transition {
        if self.last_started.as_ref() == Some(&round_id) {
            return Transition::unchanged();
        }

        self.epoch += 1;
        self.last_started = Some(round_id.clone());
        self.state = RoundState {
            round_id: Some(round_id),
            status: RoundStatus::Betting,
            countdown_seconds: countdown,
            last_updated: Some(OffsetDateTime::now_utc()),
        };

        let mut effects = vec![Effect::CancelGraceTimer, Effect::StopCountdown];
        if countdown > 0 {
            effects.push(Effect::StartCountdown(self.epoch));
        }
        effects.push(Effect::ClearBetDrafts);
        effects.push(Effect::ClearHotBets);
        Transition::changed(effects)
    }

    /// The server closed betting. Only acts while betting.
    pub fn apply_betting_closed(&mut self) -> Transition {
        if self.state.status != RoundStatus::Betting {
            return Transition::unchanged();
        }

        self.state.status = RoundStatus::Closed;
        self.state.countdown_seconds = 0;
        self.state.last_updated = Some(OffsetDateTime::now_utc());
        Transition::changed(vec![Effect::StopCountdown, Effect::ClearBetDrafts])
    }

    /// A result was confirmed. Always recorded in history; only finishes the tracked round.
    pub fn apply_result_confirmed(&mut self, round_id: RoundId, positions: Positions) -> Transition {
        let mut transition = Transition::unchanged();

        let result = RoundResult::new(round_id.clone(), positions);
        if self.history.record(result.clone()) {
            transition.changed = true;
            transition.effects.push(Effect::ResultRecorded(result));
        }

        let is_tracked = self.state.round_id.as_ref() == Some(&round_id);
        let was_betting = self.state.status == RoundStatus::Betting;
        if is_tracked && (was_betting || self.state.status.is_awaiting_result()) {
            self.epoch += 1;
            self.state.status = RoundStatus::Finished;
            self.state.countdown_seconds = 0;
            self.state.last_updated = Some(OffsetDateTime::now_utc());

            transition.changed = true;
            transition.effects.push(Effect::StopCountdown);
            if was_betting {
                transition.effects.push(Effect::ClearBetDrafts);
            }
            transition.effects.push(Effect::StartGraceTimer(self.epoch));
        }

        transition
    }

    /// One local second elapsed. Never changes `status`.
    pub fn tick(&mut self) -> Transition {
        if self.state.status != RoundStatus::Betting || self.state.countdown_seconds == 0 {
            return Transition::unchanged();
        }

        self.state.countdown_seconds -= 1;
        if self.state.countdown_seconds == 0 {
            Transition::changed(vec![Effect::StopCountdown])
        } else {
            Transition::changed(Vec::new())
        }
    }

    /// Tick issued by a timer started for `epoch`; ignored once the epoch moved on.
    pub fn tick_for(&mut self, epoch: Epoch) -> Transition {
        if epoch != self.epoch {
            return Transition::unchanged();
        }
        self.tick()
    }

    /// Grace window elapsed: revert a finished round to `waiting` and clear its id.
    pub fn expire_grace(&mut self, epoch: Epoch) -> Transition {
        if epoch != self.epoch || self.state.status != RoundStatus::Finished {
            return Transition::unchanged();
        }

        self.state.status = RoundStatus::Waiting;
        self.state.round_id = None;
        self.state.countdown_seconds = 0;
        Transition::changed(Vec::new())
    }

    /// Record whether a collaborator suspended betting.
    pub fn set_suspended(&mut self, suspended: bool) -> Transition {
        if self.suspended == suspended {
            return Transition::unchanged();
        }
        self.suspended = suspended;
        Transition::changed(Vec::new())
    }

    /// Merge a REST current-round snapshot without ever regressing pushed state.
    pub fn merge_snapshot(&mut self, snapshot: Option<RoundSnapshot>) -> Transition {
        let Some(snapshot) = snapshot else {
            return Transition::unchanged();
        };

        match self.state.round_id.clone() {
            None => self.adopt_snapshot(snapshot),
            Some(tracked) if tracked == snapshot.round_id => {
                match (self.state.status, snapshot.status) {
                    (RoundStatus::Betting, RoundStatus::Closed) => self.apply_betting_closed(),
                    (RoundStatus::Betting, RoundStatus::Playing) => {
                        let transition = self.apply_betting_closed();
                        self.state.status = RoundStatus::Playing;
                        transition
                    }
                    (RoundStatus::Closed, RoundStatus::Playing) => {
                        self.state.status = RoundStatus::Playing;
                        self.state.last_updated = Some(OffsetDateTime::now_utc());
                        Transition::changed(Vec::new())
                    }
                    _ => Transition::unchanged(),
                }
            }
            Some(_) => Transition::unchanged(),
        }
    }

    fn adopt_snapshot(&mut self, snapshot: RoundSnapshot) -> Transition {
        let stale = self.last_started.as_ref() == Some(&snapshot.round_id)
            || self.history.contains(&snapshot.round_id);
        if stale {
            return Transition::unchanged();
        }

        match snapshot.status {
            RoundStatus::Betting => {
                self.apply_round_started(snapshot.round_id, snapshot.countdown_seconds)
            }
            status @ (RoundStatus::Closed | RoundStatus::Playing) => {
                self.epoch += 1;
                self.last_started = Some(snapshot.round_id.clone());
                self.state = RoundState {
                    round_id: Some(snapshot.round_id),
                    status,
                    countdown_seconds: 0,
                    last_updated: Some(OffsetDateTime::now_utc()),
                };
                Transition::changed(vec![
                    Effect::CancelGraceTimer,
                    Effect::StopCountdown,
                    Effect::ClearBetDrafts,
                    Effect::ClearHotBets,
                ])
            }
            RoundStatus::Waiting | RoundStatus::Finished => Transition::unchanged(),
        }
    }

    /// Add results-page entries the history does not know yet, behind the newer ones.
    pub fn merge_results(&mut self, results: Vec<RoundResult>) -> Transition {
        let mut changed = false;
        for result in results {
            changed |= self.history.append_older(result);
        }

        if changed {
            Transition::changed(Vec::new())
        } else {
            Transition::unchanged()
        }
    }
}
