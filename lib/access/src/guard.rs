//! Per-request route guard.
//!
//! [`RouteGuard::decide`] is the whole enforcement sequence, kept free of
//! any HTTP framework so it can be tested directly. The server runs it as
//! middleware before any handler produces protected data:
//!
//! 1. A protected path without a session goes to login, remembering where
//!    the user was headed.
//! 2. The root or the login page with a session goes to the landing path.
//! 3. A protected path the session cannot reach goes to the landing path.
//!    The response is identical whether or not the section exists for the
//!    user, so denied sections cannot be discovered by URL.
//! 4. Section pages that need a date parameter get a canonical one.

use crate::path::section_for_path;
use crate::redirect::{
    DEFAULT_LOGIN_PATH, is_login_path, login_url, path_and_query, query_param, with_query_param,
};
use crate::role::RoleCatalog;
use crate::section::Section;
use crate::session::AccessContext;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::sync::Arc;

/// Date format of canonical query parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of guarding one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through.
    Continue,
    /// Redirect (302) to the given location.
    Redirect(String),
    /// Nothing is reachable, not even the landing page.
    Forbidden,
}

/// A canonical query parameter some sections require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateParam {
    /// Any calendar day, defaulting to today.
    Day(&'static str),
    /// A Monday, defaulting to the current week's.
    WeekStart(&'static str),
}

impl DateParam {
    fn for_section(section: Section) -> Option<Self> {
        match section {
            Section::Reservations => Some(Self::Day("date")),
            Section::Schedules => Some(Self::WeekStart("week")),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Day(key) | Self::WeekStart(key) => key,
        }
    }

    /// Returns the value to inject, or `None` if `current` is already
    /// canonical.
    fn canonical_value(self, current: Option<&str>, today: NaiveDate) -> Option<String> {
        let parsed = current.and_then(parse_canonical_date);
        let wanted = match (self, parsed) {
            (Self::Day(_), Some(_)) => return None,
            (Self::Day(_), None) => today,
            (Self::WeekStart(_), Some(date)) if date.weekday() == Weekday::Mon => return None,
            (Self::WeekStart(_), Some(date)) => week_start(date),
            (Self::WeekStart(_), None) => week_start(today),
        };
        Some(wanted.format(DATE_FORMAT).to_string())
    }
}

/// Parses a date, accepting only the exact canonical spelling.
fn parse_canonical_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == raw)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Enforces section access for incoming requests.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    catalog: Arc<RoleCatalog>,
    login_path: String,
}

impl RouteGuard {
    /// Creates a guard over a role catalog, with the default login path.
    #[must_use]
    pub fn new(catalog: Arc<RoleCatalog>) -> Self {
        Self {
            catalog,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Sets the login page path.
    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Role catalog decisions are made against.
    #[must_use]
    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Login page path.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decides what to do with a request for `path?query`.
    ///
    /// `access` is `None` when no session could be resolved, whatever the
    /// reason. `today` is the date used for canonical defaults.
    #[must_use]
    pub fn decide(
        &self,
        path: &str,
        query: Option<&str>,
        access: Option<&AccessContext>,
        today: NaiveDate,
    ) -> GuardDecision {
        let catalog = self.catalog.as_ref();

        if path == "/" || is_login_path(&self.login_path, path) {
            return match access {
                Some(access) => GuardDecision::Redirect(access.landing_path(catalog).to_string()),
                None if path == "/" => GuardDecision::Redirect(login_url(&self.login_path, None, None)),
                None => GuardDecision::Continue,
            };
        }

        let Some(section) = section_for_path(path) else {
            return GuardDecision::Continue;
        };

        let Some(access) = access else {
            tracing::debug!(path, "no session on protected path");
            let next = path_and_query(path, query);
            return GuardDecision::Redirect(login_url(&self.login_path, None, Some(&next)));
        };

        if !access.can_access(catalog, section) {
            let landing = access.landing_path(catalog);
            if section_for_path(landing) == Some(section) {
                tracing::debug!(path, role = access.role(), "landing section itself is denied");
                return GuardDecision::Forbidden;
            }
            tracing::debug!(path, role = access.role(), landing, "section denied");
            return GuardDecision::Redirect(landing.to_string());
        }

        let canonical_root = path.trim_end_matches('/') == section.path();
        if let Some(param) = DateParam::for_section(section).filter(|_| canonical_root) {
            let current = query_param(query, param.key());
            if let Some(value) = param.canonical_value(current.as_deref(), today) {
                let query = with_query_param(query, param.key(), &value);
                return GuardDecision::Redirect(path_and_query(path, Some(&query)));
            }
        }

        GuardDecision::Continue
    }
}
