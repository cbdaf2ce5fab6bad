//! The session expiry guard.
//!
//! A single task owns the deadline. It waits on two things at once: the
//! timer for `deadline + grace`, and the [`SignalBus`](crate::SignalBus).
//! Every arm of the wait re-enters the loop, so a new deadline always
//! replaces the previous timer and no stale timer survives.
//!
//! ```text
//! Active ──hydrate/extend──▶ Scheduled ──timer/expired──▶ Expiring ──▶ LoggedOut
//!    │                        ▲     │
//!    └──────expired───────┐   └─────┘ extend
//!                         ▼
//!                      Expiring
//! ```

use crate::client::{Clock, LogoutClient, Navigator, SystemClock};
use crate::signal::{SessionSignal, SignalBus, SignalSubscription, parse_expiration};
use crate::store::TabSession;
use chrono::{DateTime, Utc};
use staffdesk_access::redirect::{DEFAULT_LOGIN_PATH, is_login_path};
use staffdesk_access::{SESSION_EXPIRED_REASON, login_url};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Buffer added to every deadline before invalidating.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

/// Expiry guard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Delay after the deadline before invalidating.
    pub grace: Duration,
    /// Login page the guard redirects to.
    pub login_path: String,
}

impl GuardConfig {
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            grace: DEFAULT_GRACE,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

/// Observable guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Signed in, no deadline known.
    Active,
    /// A timer is armed for this deadline (grace not included).
    Scheduled(DateTime<Utc>),
    /// Invalidation is running.
    Expiring,
    /// Terminal.
    LoggedOut,
}

/// Schedules invalidation at a moving deadline.
pub struct ExpiryGuard {
    config: GuardConfig,
    store: TabSession,
    navigator: Arc<dyn Navigator>,
    logout: Arc<dyn LogoutClient>,
    invalidating: AtomicBool,
    state: watch::Sender<GuardState>,
    clock: Arc<dyn Clock>,
}

impl ExpiryGuard {
    /// Creates a guard over a hydrated tab session.
    #[must_use]
    pub fn new(
        config: GuardConfig,
        store: TabSession,
        navigator: Arc<dyn Navigator>,
        logout: Arc<dyn LogoutClient>,
    ) -> Self {
        let initial = store
            .expiration()
            .map_or(GuardState::Active, GuardState::Scheduled);
        let (state, _) = watch::channel(initial);

        Self {
            config,
            store,
            navigator,
            logout,
            invalidating: AtomicBool::new(false),
            state,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the wall clock deadlines are measured against.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    /// Subscribes to the bus and runs the guard on its own task.
    #[must_use]
    pub fn spawn(self, bus: &SignalBus) -> GuardHandle {
        let signals = bus.subscribe();
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run(signals));
        GuardHandle { state, task }
    }

    /// Runs until the session is invalidated.
    ///
    /// Returns early, without invalidating, if the bus closes while no
    /// deadline is armed.
    pub async fn run(self, mut signals: SignalSubscription) {
        let mut fire_at = self.store.expiration().map(|at| self.arm(at));
        let mut listening = true;

        loop {
            // Covers an expiry signal lost to lag.
            if signals.expired() {
                tracing::info!("session expired on the signal bus");
                self.invalidate();
                return;
            }

            tokio::select! {
                biased;

                received = signals.recv(), if listening => match received {
                    Ok(SessionSignal::ExpirationUpdated(raw)) => match parse_expiration(&raw) {
                        Ok(at) => {
                            self.store.set_expiration(Some(at));
                            fire_at = Some(self.arm(at));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "ignoring expiration update, keeping current timer");
                        }
                    },
                    Ok(SessionSignal::SessionExpired) => {
                        tracing::info!("session expired signal received");
                        self.invalidate();
                        return;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session signals dropped");
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("signal bus closed");
                        listening = false;
                        if fire_at.is_none() {
                            return;
                        }
                    }
                },

                () = sleep_until(fire_at) => {
                    tracing::info!("session deadline passed");
                    self.invalidate();
                    return;
                }
            }
        }
    }

    /// Invalidates the session now.
    ///
    /// Clears the tab session, fires a best-effort server logout and
    /// redirects to login unless already there. Returns false if
    /// invalidation already ran.
    ///
    /// Outside a Tokio runtime the server logout is skipped.
    pub fn invalidate(&self) -> bool {
        if self.invalidating.swap(true, Ordering::AcqRel) {
            tracing::debug!("invalidation already in progress");
            return false;
        }

        self.transition(GuardState::Expiring);
        self.store.clear();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let logout = Arc::clone(&self.logout);
                runtime.spawn(async move {
                    if let Err(e) = logout.logout().await {
                        tracing::debug!(error = %e, "best-effort logout failed");
                    }
                });
            }
            Err(_) => tracing::debug!("no async runtime, skipping server logout"),
        }

        let current = self.navigator.current_location();
        if is_login_path(&self.config.login_path, &current) {
            tracing::debug!(location = %current, "already on login, not redirecting");
        } else {
            let target = login_url(
                &self.config.login_path,
                Some(SESSION_EXPIRED_REASON),
                Some(&current),
            );
            self.navigator.redirect(&target);
        }

        self.transition(GuardState::LoggedOut);
        true
    }

    /// Moves to `Scheduled(at)` and returns the instant the timer fires.
    fn arm(&self, at: DateTime<Utc>) -> Instant {
        let remaining = (at - self.clock.now()).to_std().unwrap_or_default();
        self.transition(GuardState::Scheduled(at));
        Instant::now() + remaining + self.config.grace
    }

    fn transition(&self, next: GuardState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(?previous, ?next, "session guard state changed");
        }
    }
}

impl std::fmt::Debug for ExpiryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryGuard")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Handle to a spawned [`ExpiryGuard`]. Dropping it stops the guard.
#[derive(Debug)]
pub struct GuardHandle {
    state: watch::Receiver<GuardState>,
    task: JoinHandle<()>,
}

impl GuardHandle {
    #[must_use]
    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<GuardState> {
        self.state.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the guard task to end.
    pub async fn join(&mut self) {
        if let Err(e) = (&mut self.task).await {
            tracing::debug!(error = %e, "session guard task ended abnormally");
        }
    }

    /// Stops the guard, cancelling any armed timer.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GuardError;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use rootcause::prelude::Report;
    use staffdesk_access::{Session, StaffUser};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct FakeNavigator {
        location: Mutex<String>,
        redirects: Mutex<Vec<String>>,
    }

    impl FakeNavigator {
        fn at(location: &str) -> Arc<Self> {
            Arc::new(Self {
                location: Mutex::new(location.to_string()),
                redirects: Mutex::new(Vec::new()),
            })
        }

        fn redirects(&self) -> Vec<String> {
            self.redirects.lock().expect("lock").clone()
        }
    }

    impl Navigator for FakeNavigator {
        fn current_location(&self) -> String {
            self.location.lock().expect("lock").clone()
        }

        fn redirect(&self, location: &str) {
            self.redirects.lock().expect("lock").push(location.to_string());
            *self.location.lock().expect("lock") = location.to_string();
        }
    }

    #[derive(Default)]
    struct FakeLogout {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeLogout {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LogoutClient for FakeLogout {
        async fn logout(&self) -> Result<(), Report<GuardError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GuardError::LogoutFailed {
                    reason: "offline".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    struct FakeClock(Mutex<DateTime<Utc>>);

    impl FakeClock {
        fn starting_now() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Utc::now())))
        }

        fn advance(&self, by: TimeDelta) {
            *self.0.lock().expect("lock") += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().expect("lock")
        }
    }

    struct Harness {
        bus: SignalBus,
        store: TabSession,
        navigator: Arc<FakeNavigator>,
        logout: Arc<FakeLogout>,
    }

    impl Harness {
        fn new(location: &str) -> Self {
            Self::with_logout(location, FakeLogout::default())
        }

        fn with_logout(location: &str, logout: FakeLogout) -> Self {
            Self {
                bus: SignalBus::new(),
                store: TabSession::new(),
                navigator: FakeNavigator::at(location),
                logout: Arc::new(logout),
            }
        }

        fn hydrate(&self, expires_at: Option<DateTime<Utc>>) {
            let raw = expires_at.map(|at| at.to_rfc3339());
            self.store.hydrate(
                Some(Session::new(StaffUser::new("camarero"))),
                raw.as_deref(),
            );
        }

        fn guard(&self) -> ExpiryGuard {
            ExpiryGuard::new(
                GuardConfig::default(),
                self.store.clone(),
                Arc::clone(&self.navigator) as Arc<dyn Navigator>,
                Arc::clone(&self.logout) as Arc<dyn LogoutClient>,
            )
        }

        fn spawn(&self) -> GuardHandle {
            self.guard().spawn(&self.bus)
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn millis(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn in_secs(n: i64) -> DateTime<Utc> {
        Utc::now() + TimeDelta::seconds(n)
    }

    #[tokio::test(start_paused = true)]
    async fn hydrated_expiration_arms_the_timer() {
        let h = Harness::new("/fichaje");
        let deadline = in_secs(10);
        h.hydrate(Some(deadline));

        let handle = h.spawn();
        assert_eq!(handle.state(), GuardState::Scheduled(deadline));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_deadline_plus_grace() {
        let h = Harness::new("/facturas?page=2");
        h.hydrate(Some(in_secs(10)));
        let handle = h.spawn();

        tokio::time::sleep(millis(10_500)).await;
        assert!(h.navigator.redirects().is_empty(), "grace not yet elapsed");
        assert!(h.store.is_signed_in());

        tokio::time::sleep(secs(1)).await;
        assert_eq!(
            h.navigator.redirects(),
            vec!["/login?reason=session-expired&next=%2Ffacturas%3Fpage%3D2".to_string()]
        );
        assert_eq!(h.logout.calls(), 1);
        assert!(!h.store.is_signed_in());
        assert_eq!(h.store.expiration(), None);
        assert_eq!(handle.state(), GuardState::LoggedOut);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn extension_moves_invalidation_to_the_new_deadline() {
        let h = Harness::new("/reservas?date=2024-05-08");
        h.hydrate(Some(in_secs(10)));
        let handle = h.spawn();

        tokio::time::sleep(secs(5)).await;
        let extended = in_secs(15);
        assert_eq!(h.bus.expiration_updated(extended), 1);

        // Past the original deadline and its grace.
        tokio::time::sleep(millis(6_500)).await;
        assert!(h.navigator.redirects().is_empty(), "fired at the old deadline");
        assert_eq!(h.store.expiration(), Some(extended));
        assert!(matches!(handle.state(), GuardState::Scheduled(_)));

        tokio::time::sleep(secs(10)).await;
        assert_eq!(h.navigator.redirects().len(), 1);
        assert_eq!(h.logout.calls(), 1);
        assert_eq!(handle.state(), GuardState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn last_extension_wins_even_if_earlier() {
        let h = Harness::new("/menus");
        h.hydrate(Some(in_secs(60)));
        let _handle = h.spawn();

        h.bus.expiration_updated(in_secs(5));
        tokio::time::sleep(millis(6_500)).await;
        assert_eq!(h.navigator.redirects().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_expired_signals_invalidate_once() {
        let h = Harness::new("/informes");
        h.hydrate(Some(in_secs(60)));
        let mut handle = h.spawn();

        h.bus.session_expired();
        h.bus.session_expired();
        handle.join().await;
        tokio::time::sleep(millis(10)).await;

        assert_eq!(h.navigator.redirects().len(), 1);
        assert_eq!(h.logout.calls(), 1);
        assert_eq!(handle.state(), GuardState::LoggedOut);

        // Nothing left to fire at the old deadline either.
        tokio::time::sleep(secs(120)).await;
        assert_eq!(h.navigator.redirects().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_is_single_shot() {
        let h = Harness::new("/menus");
        h.hydrate(None);
        let guard = h.guard();

        assert!(guard.invalidate());
        assert!(!guard.invalidate());
        tokio::time::sleep(millis(10)).await;

        assert_eq!(h.navigator.redirects().len(), 1);
        assert_eq!(h.logout.calls(), 1);
        assert_eq!(guard.state(), GuardState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_extension_keeps_the_current_timer() {
        let h = Harness::new("/ajustes");
        let deadline = in_secs(10);
        h.hydrate(Some(deadline));
        let handle = h.spawn();

        tokio::time::sleep(secs(5)).await;
        h.bus
            .publish(SessionSignal::ExpirationUpdated("not a date".to_string()));
        tokio::time::sleep(millis(100)).await;
        assert_eq!(handle.state(), GuardState::Scheduled(deadline));
        assert_eq!(h.store.expiration(), Some(deadline));

        tokio::time::sleep(secs(6)).await;
        assert_eq!(h.navigator.redirects().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_fires_after_grace() {
        let h = Harness::new("/fichaje");
        h.hydrate(Some(in_secs(-30)));
        let _handle = h.spawn();

        tokio::time::sleep(millis(500)).await;
        assert!(h.navigator.redirects().is_empty());

        tokio::time::sleep(secs(1)).await;
        assert_eq!(
            h.navigator.redirects(),
            vec!["/login?reason=session-expired&next=%2Ffichaje".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn already_on_login_clears_without_redirect() {
        let h = Harness::new("/login?reason=manual");
        h.hydrate(Some(in_secs(60)));
        let mut handle = h.spawn();

        h.bus.session_expired();
        handle.join().await;
        tokio::time::sleep(millis(10)).await;

        assert!(h.navigator.redirects().is_empty());
        assert!(!h.store.is_signed_in());
        assert_eq!(h.logout.calls(), 1);
        assert_eq!(handle.state(), GuardState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_logout_does_not_block_redirect() {
        let h = Harness::with_logout(
            "/miembros",
            FakeLogout {
                fail: true,
                ..FakeLogout::default()
            },
        );
        h.hydrate(Some(in_secs(60)));
        let mut handle = h.spawn();

        h.bus.session_expired();
        handle.join().await;
        tokio::time::sleep(millis(10)).await;

        assert_eq!(h.logout.calls(), 1);
        assert_eq!(h.navigator.redirects().len(), 1);
        assert!(!h.store.is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn no_deadline_stays_active_until_extended() {
        let h = Harness::new("/fichaje");
        h.hydrate(None);
        let handle = h.spawn();

        tokio::time::sleep(secs(3600)).await;
        assert_eq!(handle.state(), GuardState::Active);
        assert!(h.navigator.redirects().is_empty());

        let deadline = in_secs(3610);
        h.bus.expiration_updated(deadline);
        tokio::time::sleep(millis(10)).await;
        assert_eq!(handle.state(), GuardState::Scheduled(deadline));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_the_timer() {
        let h = Harness::new("/fichaje");
        h.hydrate(Some(in_secs(10)));
        let handle = h.spawn();

        handle.shutdown();
        tokio::time::sleep(secs(30)).await;

        assert!(h.navigator.redirects().is_empty());
        assert_eq!(h.logout.calls(), 0);
        assert!(h.store.is_signed_in());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_lost_to_lag_still_invalidates() {
        let h = Harness::new("/reservas");
        h.hydrate(Some(in_secs(3600)));
        let handle = h.spawn();

        h.bus.session_expired();
        for _ in 0..40 {
            h.bus.expiration_updated(in_secs(3600));
        }
        tokio::time::sleep(millis(50)).await;

        assert_eq!(
            h.navigator.redirects(),
            vec!["/login?reason=session-expired&next=%2Freservas".to_string()]
        );
        assert_eq!(h.logout.calls(), 1);
        assert!(!h.store.is_signed_in());
        assert_eq!(handle.state(), GuardState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_published_before_spawn_invalidates() {
        let h = Harness::new("/menus");
        h.hydrate(Some(in_secs(3600)));
        h.bus.session_expired();

        let mut handle = h.spawn();
        handle.join().await;

        assert_eq!(h.navigator.redirects().len(), 1);
        assert_eq!(handle.state(), GuardState::LoggedOut);
    }

    #[test]
    fn invalidate_without_runtime_skips_server_logout() {
        let h = Harness::new("/facturas");
        h.hydrate(Some(in_secs(60)));
        let guard = h.guard();

        assert!(guard.invalidate());
        assert!(!guard.invalidate());
        assert_eq!(
            h.navigator.redirects(),
            vec!["/login?reason=session-expired&next=%2Ffacturas".to_string()]
        );
        assert_eq!(h.logout.calls(), 0);
        assert!(!h.store.is_signed_in());
        assert_eq!(guard.state(), GuardState::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_follows_the_wall_clock_after_suspend() {
        let h = Harness::new("/informes");
        let clock = FakeClock::starting_now();
        h.hydrate(Some(clock.now() + TimeDelta::hours(1)));
        let handle = h
            .guard()
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .spawn(&h.bus);

        // Host sleeps for an hour: wall clock moves, the timer clock does not.
        clock.advance(TimeDelta::hours(1));
        let extended = clock.now() + TimeDelta::minutes(30);
        h.bus.expiration_updated(extended);

        tokio::time::sleep(secs(30 * 60)).await;
        assert!(h.navigator.redirects().is_empty(), "fired before the new deadline");
        assert_eq!(handle.state(), GuardState::Scheduled(extended));

        tokio::time::sleep(secs(2)).await;
        assert_eq!(h.navigator.redirects().len(), 1);
        assert_eq!(handle.state(), GuardState::LoggedOut);
    }

    #[test]
    fn config_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.grace, secs(1));
        assert_eq!(config.login_path, "/login");

        let config = config.with_grace(millis(250)).with_login_path("/acceso");
        assert_eq!(config.grace, millis(250));
        assert_eq!(config.login_path, "/acceso");
    }
}
