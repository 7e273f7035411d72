pub mod bet_slip;
pub mod coordinator;
pub mod lifecycle;
pub mod round;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    services::{
        event_normalizer::EventNormalizer, ledger::BettingLedger, query::GameQueryService,
    },
};

pub use self::coordinator::{CoordinatorSettings, RoundCoordinator, RoundSignal};
pub use self::sse::SseHub;
use self::bet_slip::BetSlip;

pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 64;

/// Central application state: the round coordinator, its collaborators and the SSE hub.
pub struct AppState {
    config: Arc<AppConfig>,
    coordinator: Arc<RoundCoordinator>,
    normalizer: EventNormalizer,
    sse: SseHub,
    bet_slip: RwLock<BetSlip>,
    query: Arc<dyn GameQueryService>,
    ledger: Arc<dyn BettingLedger>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until the transport connects.
    pub fn new(
        config: AppConfig,
        query: Arc<dyn GameQueryService>,
        ledger: Arc<dyn BettingLedger>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let coordinator = RoundCoordinator::new(config.coordinator_settings());
        let normalizer = EventNormalizer::new(config.default_countdown_secs);

        Arc::new(Self {
            config: Arc::new(config),
            coordinator,
            normalizer,
            sse: SseHub::new(SSE_CAPACITY),
            bet_slip: RwLock::new(BetSlip::new()),
            query,
            ledger,
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// The round lifecycle coordinator.
    pub fn coordinator(&self) -> &Arc<RoundCoordinator> {
        &self.coordinator
    }

    /// Boundary translating transport and REST payloads into coordinator input.
    pub fn normalizer(&self) -> &EventNormalizer {
        &self.normalizer
    }

    /// Broadcast hub used for the presentation SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    pub fn bet_slip(&self) -> &RwLock<BetSlip> {
        &self.bet_slip
    }

    pub fn query(&self) -> Arc<dyn GameQueryService> {
        self.query.clone()
    }

    pub fn ledger(&self) -> Arc<dyn BettingLedger> {
        self.ledger.clone()
    }

    /// Current degraded flag (transport disconnected).
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory collaborators for service tests.

    use std::sync::{Arc, Mutex};

    use futures::{FutureExt, future::BoxFuture};

    use crate::{
        config::AppConfig,
        dto::{
            bets::{BetReceipt, BetSubmission},
            snapshot::{CurrentRoundDto, ResultEntryDto},
        },
        services::{
            ledger::{BettingLedger, LedgerError, LedgerResult},
            query::{GameQueryService, QueryError, QueryResult},
        },
        state::{AppState, SharedState},
    };

    /// Query service returning canned responses, or failing when `fail` is set.
    #[derive(Default)]
    pub struct StubQuery {
        pub current: Mutex<Option<CurrentRoundDto>>,
        pub results: Mutex<Vec<ResultEntryDto>>,
        pub fail: Mutex<bool>,
    }

    impl GameQueryService for StubQuery {
        fn current_round(&self) -> BoxFuture<'static, QueryResult<Option<CurrentRoundDto>>> {
            let outcome = if *self.fail.lock().unwrap() {
                Err(QueryError::Status {
                    url: "stub://rounds/current".into(),
                    status: 502,
                })
            } else {
                Ok(self.current.lock().unwrap().clone())
            };
            async move { outcome }.boxed()
        }

        fn recent_results(&self, _limit: usize) -> BoxFuture<'static, QueryResult<Vec<ResultEntryDto>>> {
            let outcome = if *self.fail.lock().unwrap() {
                Err(QueryError::Status {
                    url: "stub://rounds/results".into(),
                    status: 502,
                })
            } else {
                Ok(self.results.lock().unwrap().clone())
            };
            async move { outcome }.boxed()
        }
    }

    /// Ledger recording submissions and answering with a fixed balance.
    #[derive(Default)]
    pub struct StubLedger {
        pub submissions: Mutex<Vec<BetSubmission>>,
        pub reject: Mutex<bool>,
    }

    impl BettingLedger for StubLedger {
        fn submit(&self, submission: BetSubmission) -> BoxFuture<'static, LedgerResult<BetReceipt>> {
            let outcome = if *self.reject.lock().unwrap() {
                Err(LedgerError::Rejected {
                    status: 400,
                    message: "insufficient balance".into(),
                })
            } else {
                let accepted = submission.bets.len();
                self.submissions.lock().unwrap().push(submission);
                Ok(BetReceipt {
                    balance: 900,
                    accepted: Some(accepted),
                })
            };
            async move { outcome }.boxed()
        }
    }

    pub fn state_with(query: Arc<StubQuery>, ledger: Arc<StubLedger>) -> SharedState {
        AppState::new(AppConfig::default(), query, ledger)
    }
}
