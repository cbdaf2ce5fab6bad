//! Client-side session expiry for the staffdesk dashboard.
//!
//! The backend hands out sessions with a *moving* expiration: any response
//! may push the deadline further out. This crate keeps one tab's view of
//! that deadline and logs the tab out when it passes.
//!
//! - [`TabSession`] holds the hydrated session and its expiration
//! - [`SignalBus`] carries [`SessionSignal`]s between components
//! - [`ExpiryGuard`] arms a timer at `deadline + grace`, re-arms on every
//!   extension, and invalidates on timeout or an explicit expiry signal
//!
//! # Example
//!
//! ```no_run
//! use staffdesk_session_guard::{
//!     ExpiryGuard, GuardConfig, HttpLogoutClient, Navigator, SignalBus, TabSession,
//! };
//! use std::sync::Arc;
//!
//! struct Location;
//!
//! impl Navigator for Location {
//!     fn current_location(&self) -> String {
//!         "/reservas".to_string()
//!     }
//!
//!     fn redirect(&self, location: &str) {
//!         println!("navigate to {location}");
//!     }
//! }
//!
//! # async fn example() {
//! let store = TabSession::new();
//! store.hydrate(None, Some("2030-01-01T00:00:00Z"));
//!
//! let bus = SignalBus::new();
//! let logout = HttpLogoutClient::new(reqwest::Client::new(), "http://localhost:3000");
//! let handle = ExpiryGuard::new(
//!     GuardConfig::default(),
//!     store,
//!     Arc::new(Location),
//!     Arc::new(logout),
//! )
//! .spawn(&bus);
//!
//! // A 401 from the API:
//! bus.session_expired();
//! # drop(handle);
//! # }
//! ```

pub mod client;
pub mod error;
pub mod guard;
pub mod signal;
pub mod store;

pub use client::{Clock, HttpLogoutClient, LogoutClient, Navigator, SystemClock};
pub use error::GuardError;
pub use guard::{DEFAULT_GRACE, ExpiryGuard, GuardConfig, GuardHandle, GuardState};
pub use signal::{SessionSignal, SignalBus, SignalSubscription, parse_expiration};
pub use store::TabSession;
