//! Async host around [`RoundLifecycle`]: owns the countdown and grace timers and publishes
//! every change to subscribers.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Mutex, broadcast, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at, sleep},
};
use tracing::{debug, info};

use crate::state::{
    lifecycle::{Effect, Epoch, RoundLifecycle, RoundView, Transition},
    round::{Positions, ResultHistory, RoundId, RoundResult, RoundSnapshot},
};

/// Default period of the local countdown.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Default delay before a finished round reverts to waiting.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(5);
const SIGNAL_CAPACITY: usize = 64;

/// Timing and sizing knobs of the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    /// Period of the local countdown.
    pub tick_interval: Duration,
    /// How long a finished round stays displayed.
    pub grace_window: Duration,
    /// Maximum number of recent results kept.
    pub history_capacity: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            grace_window: DEFAULT_GRACE_WINDOW,
            history_capacity: crate::state::round::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Notification fanned out to collaborators.
#[derive(Debug, Clone)]
pub enum RoundSignal {
    /// The view changed; carries the new snapshot.
    ViewChanged(RoundView),
    /// Bet drafts must be dropped (new round or betting closed).
    BetDraftsCleared {
        /// Round that became current, or the one whose betting closed.
        round_id: Option<RoundId>,
    },
    /// The hot-bet statistics aggregate must be reset.
    HotBetsCleared {
        /// Round that became current.
        round_id: Option<RoundId>,
    },
    /// A result entered the history.
    ResultRecorded(RoundResult),
}

struct Inner {
    lifecycle: RoundLifecycle,
    countdown: Option<JoinHandle<()>>,
    grace: Option<JoinHandle<()>>,
}

impl Inner {
    fn stop_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }

    fn cancel_grace(&mut self) {
        if let Some(handle) = self.grace.take() {
            handle.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_countdown();
        self.cancel_grace();
    }
}

/// Single source of truth for the current round.
///
/// State-mutating operations are only called by the event normalization layer. They never
/// fail: invalid input is rejected before it gets here, stale input is absorbed by the
/// reducer's guards.
pub struct RoundCoordinator {
    inner: Mutex<Inner>,
    view: watch::Sender<RoundView>,
    signals: broadcast::Sender<RoundSignal>,
    settings: CoordinatorSettings,
}

impl RoundCoordinator {
    /// Create a coordinator in the `waiting` state.
    pub fn new(settings: CoordinatorSettings) -> Arc<Self> {
        let lifecycle = RoundLifecycle::new(ResultHistory::new(settings.history_capacity));
        let (view, _rx) = watch::channel(lifecycle.view());
        let (signals, _rx) = broadcast::channel(SIGNAL_CAPACITY);

        Arc::new(Self {
            inner: Mutex::new(Inner {
                lifecycle,
                countdown: None,
                grace: None,
            }),
            view,
            signals,
            settings,
        })
    }

    /// Current immutable snapshot.
    pub fn view(&self) -> RoundView {
        self.view.borrow().clone()
    }

    /// Receiver always holding the latest view.
    pub fn watch(&self) -> watch::Receiver<RoundView> {
        self.view.subscribe()
    }

    /// Subscribe to every change and collaborator signal.
    pub fn subscribe(&self) -> broadcast::Receiver<RoundSignal> {
        self.signals.subscribe()
    }

    /// Start betting on `round_id`; a repeat of the last started round is ignored.
    pub async fn apply_round_started(self: &Arc<Self>, round_id: RoundId, countdown: u32) {
        let mut inner = self.inner.lock().await;
        let transition = inner
            .lifecycle
            .apply_round_started(round_id.clone(), countdown);
        if transition.is_noop() {
            debug!(round_id = %round_id, "duplicate round start ignored");
        } else {
            info!(round_id = %round_id, countdown, "round started");
        }
        self.commit(&mut inner, transition);
    }

    /// Close betting. A mismatched `round_id` is still applied since it carries nothing to misfile.
    pub async fn apply_betting_closed(self: &Arc<Self>, round_id: Option<RoundId>) {
        let mut inner = self.inner.lock().await;
        let tracked = inner.lifecycle.state().round_id.clone();
        if let (Some(reported), Some(tracked)) = (&round_id, &tracked) {
            if reported != tracked {
                debug!(reported = %reported, tracked = %tracked, "betting closed for another round id");
            }
        }

        let transition = inner.lifecycle.apply_betting_closed();
        if transition.is_noop() {
            debug!(status = %inner.lifecycle.state().status, "betting closed ignored");
        } else {
            info!(round_id = ?tracked.as_ref().map(RoundId::as_str), "betting closed");
        }
        self.commit(&mut inner, transition);
    }

    /// Record a result and finish the tracked round when it matches.
    pub async fn apply_result_confirmed(self: &Arc<Self>, round_id: RoundId, positions: Positions) {
        let mut inner = self.inner.lock().await;
        let transition = inner
            .lifecycle
            .apply_result_confirmed(round_id.clone(), positions);
        info!(
            round_id = %round_id,
            positions = ?positions.as_slice(),
            tracked = inner.lifecycle.state().round_id.as_ref() == Some(&round_id),
            "result confirmed"
        );
        self.commit(&mut inner, transition);
    }

    /// Report whether a collaborator suspended betting.
    pub async fn set_suspended(self: &Arc<Self>, suspended: bool) {
        let mut inner = self.inner.lock().await;
        let transition = inner.lifecycle.set_suspended(suspended);
        if transition.changed {
            info!(suspended, "betting suspension changed");
        }
        self.commit(&mut inner, transition);
    }

    /// Merge a REST snapshot; a snapshot that arrives after newer pushed state is dropped.
    pub async fn merge_snapshot(self: &Arc<Self>, snapshot: Option<RoundSnapshot>) -> RoundView {
        let mut inner = self.inner.lock().await;
        let transition = inner.lifecycle.merge_snapshot(snapshot);
        if transition.is_noop() {
            debug!("round snapshot brought nothing new");
        }
        self.commit(&mut inner, transition);
        inner.lifecycle.view()
    }

    /// Merge a page of recent results behind the live ones.
    pub async fn merge_results(self: &Arc<Self>, results: Vec<RoundResult>) -> Vec<RoundResult> {
        let mut inner = self.inner.lock().await;
        let transition = inner.lifecycle.merge_results(results);
        self.commit(&mut inner, transition);
        inner.lifecycle.history().to_vec()
    }

    async fn tick_for(self: &Arc<Self>, epoch: Epoch) -> bool {
        let mut inner = self.inner.lock().await;
        let transition = inner.lifecycle.tick_for(epoch);
        let running = inner.lifecycle.countdown_running(epoch);
        self.commit(&mut inner, transition);
        running
    }

    async fn expire_grace(self: &Arc<Self>, epoch: Epoch) {
        let mut inner = self.inner.lock().await;
        let transition = inner.lifecycle.expire_grace(epoch);
        if transition.changed {
            inner.grace = None;
            info!("grace window elapsed; waiting for next round");
        }
        self.commit(&mut inner, transition);
    }

    /// Publish the new view, then run effects while still holding the lock.
    ///
    /// The watch is updated before any signal goes out so a subscriber reacting to a
    /// signal never reads a view older than that signal.
    fn commit(self: &Arc<Self>, inner: &mut Inner, transition: Transition) {
        let view = transition.changed.then(|| {
            let view = inner.lifecycle.view();
            self.view.send_replace(view.clone());
            view
        });

        for effect in transition.effects {
            match effect {
                Effect::StartCountdown(epoch) => {
                    inner.stop_countdown();
                    inner.countdown = Some(self.spawn_countdown(epoch));
                }
                Effect::StopCountdown => inner.stop_countdown(),
                Effect::StartGraceTimer(epoch) => {
                    inner.cancel_grace();
                    inner.grace = Some(self.spawn_grace(epoch));
                }
                Effect::CancelGraceTimer => inner.cancel_grace(),
                Effect::ClearBetDrafts => self.signal(RoundSignal::BetDraftsCleared {
                    round_id: inner.lifecycle.state().round_id.clone(),
                }),
                Effect::ClearHotBets => self.signal(RoundSignal::HotBetsCleared {
                    round_id: inner.lifecycle.state().round_id.clone(),
                }),
                Effect::ResultRecorded(result) => self.signal(RoundSignal::ResultRecorded(result)),
            }
        }

        if let Some(view) = view {
            self.signal(RoundSignal::ViewChanged(view));
        }
    }

    fn signal(&self, signal: RoundSignal) {
        // No subscribers is fine.
        let _ = self.signals.send(signal);
    }

    fn spawn_countdown(self: &Arc<Self>, epoch: Epoch) -> JoinHandle<()> {
        let coordinator: Weak<Self> = Arc::downgrade(self);
        let period = self.settings.tick_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                if !coordinator.tick_for(epoch).await {
                    break;
                }
            }
        })
    }

    fn spawn_grace(self: &Arc<Self>, epoch: Epoch) -> JoinHandle<()> {
        let coordinator: Weak<Self> = Arc::downgrade(self);
        let window = self.settings.grace_window;

        tokio::spawn(async move {
            sleep(window).await;
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.expire_grace(epoch).await;
            }
        })
    }
}
