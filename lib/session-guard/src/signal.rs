//! Typed publish/subscribe channel for session lifecycle signals.
//!
//! Any component that learns something about the session (a response that
//! carried a refreshed expiration, a 401 from the API) publishes here; the
//! expiry guard subscribes.

use crate::error::GuardError;
use chrono::{DateTime, SecondsFormat, Utc};
use rootcause::prelude::Report;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::{self, error::RecvError};

/// Signals retained for slow subscribers before they start lagging.
const BUS_CAPACITY: usize = 32;

/// A cross-component session signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The session deadline moved. Payload is an ISO-8601 timestamp.
    ExpirationUpdated(String),
    /// The session is no longer valid; invalidate now.
    SessionExpired,
}

impl SessionSignal {
    /// Builds an expiration update from a typed timestamp.
    #[must_use]
    pub fn expiration_updated(at: DateTime<Utc>) -> Self {
        Self::ExpirationUpdated(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// Parses an ISO-8601 (RFC 3339) expiration timestamp.
///
/// # Errors
///
/// Returns an error if the payload is not a timestamp with an offset.
pub fn parse_expiration(raw: &str) -> Result<DateTime<Utc>, Report<GuardError>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            GuardError::InvalidExpiration {
                raw: raw.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

/// Broadcast bus for [`SessionSignal`]s. Cheap to clone.
///
/// Expiry is sticky: once [`SessionSignal::SessionExpired`] is published
/// the bus stays expired, so a subscriber that lagged past the signal
/// still observes it through [`SignalSubscription::expired`].
#[derive(Debug, Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<SessionSignal>,
    expired: Arc<AtomicBool>,
}

impl SignalBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            sender,
            expired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publishes a signal. Returns the number of subscribers reached; a
    /// signal nobody listens to is dropped, except that expiry still
    /// marks the bus expired.
    pub fn publish(&self, signal: SessionSignal) -> usize {
        if signal == SessionSignal::SessionExpired {
            self.expired.store(true, Ordering::Release);
        }

        match self.sender.send(signal) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(signal)) => {
                tracing::debug!(?signal, "no subscribers for session signal");
                0
            }
        }
    }

    /// Publishes an "expiration updated" signal.
    pub fn expiration_updated(&self, at: DateTime<Utc>) -> usize {
        self.publish(SessionSignal::expiration_updated(at))
    }

    /// Publishes a "session expired" signal.
    pub fn session_expired(&self) -> usize {
        self.publish(SessionSignal::SessionExpired)
    }

    /// True once a "session expired" signal has been published.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    /// Subscribes to signals published from now on.
    #[must_use]
    pub fn subscribe(&self) -> SignalSubscription {
        SignalSubscription {
            receiver: self.sender.subscribe(),
            expired: Arc::clone(&self.expired),
        }
    }
}

/// A subscriber's end of the [`SignalBus`].
#[derive(Debug)]
pub struct SignalSubscription {
    receiver: broadcast::Receiver<SessionSignal>,
    expired: Arc<AtomicBool>,
}

impl SignalSubscription {
    /// Receives the next signal.
    ///
    /// # Errors
    ///
    /// Returns [`RecvError::Lagged`] if older signals were dropped, and
    /// [`RecvError::Closed`] once every bus handle is gone.
    pub async fn recv(&mut self) -> Result<SessionSignal, RecvError> {
        self.receiver.recv().await
    }

    /// True once the bus has seen a "session expired" signal, whether or
    /// not this subscriber received it.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
