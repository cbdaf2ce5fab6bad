//! Dashboard sections and their fixed configuration.
//!
//! A section is an independently gated feature area. The set is closed, and
//! each section has a wire slug (what the backend sends in role and session
//! payloads), a canonical path and a sidebar label. [`Section::ALL`] is the
//! global priority order used for both landing-path selection and sidebar
//! ordering.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Logical feature area of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    /// Table reservations.
    #[serde(rename = "reservas")]
    Reservations,
    /// Menu composition.
    #[serde(rename = "menus")]
    Menus,
    /// Food and ingredient catalog.
    #[serde(rename = "alimentos")]
    FoodCatalog,
    /// Restaurant settings.
    #[serde(rename = "ajustes")]
    Settings,
    /// Staff membership management. Additionally gated by importance.
    #[serde(rename = "miembros")]
    Members,
    /// Clock-in terminal. The minimum-privilege landing page.
    #[serde(rename = "fichaje")]
    ClockIn,
    /// Shift schedules.
    #[serde(rename = "horarios")]
    Schedules,
    /// Invoices.
    #[serde(rename = "facturas")]
    Invoices,
    /// Reports.
    #[serde(rename = "informes")]
    Reports,
    /// Account statement.
    #[serde(rename = "estado-cuenta")]
    AccountStatement,
}

impl Section {
    /// Every section, in priority order.
    pub const ALL: [Section; 10] = [
        Section::Reservations,
        Section::Menus,
        Section::FoodCatalog,
        Section::Settings,
        Section::Members,
        Section::ClockIn,
        Section::Schedules,
        Section::Invoices,
        Section::Reports,
        Section::AccountStatement,
    ];

    /// Returns the wire slug.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Reservations => "reservas",
            Self::Menus => "menus",
            Self::FoodCatalog => "alimentos",
            Self::Settings => "ajustes",
            Self::Members => "miembros",
            Self::ClockIn => "fichaje",
            Self::Schedules => "horarios",
            Self::Invoices => "facturas",
            Self::Reports => "informes",
            Self::AccountStatement => "estado-cuenta",
        }
    }

    /// Returns the canonical path of the section's landing page.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Reservations => "/reservas",
            Self::Menus => "/menus",
            Self::FoodCatalog => "/alimentos",
            Self::Settings => "/ajustes",
            Self::Members => "/miembros",
            Self::ClockIn => "/fichaje",
            Self::Schedules => "/horarios",
            Self::Invoices => "/facturas",
            Self::Reports => "/informes",
            Self::AccountStatement => "/estado-cuenta",
        }
    }

    /// Returns the navigation label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reservations => "Reservas",
            Self::Menus => "Menús",
            Self::FoodCatalog => "Alimentos",
            Self::Settings => "Ajustes",
            Self::Members => "Miembros",
            Self::ClockIn => "Fichaje",
            Self::Schedules => "Horarios",
            Self::Invoices => "Facturas",
            Self::Reports => "Informes",
            Self::AccountStatement => "Estado de cuenta",
        }
    }

    /// Position in the global priority order (lower comes first).
    #[must_use]
    pub fn priority(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Looks up a section by slug, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_slug(raw: &str) -> Option<Self> {
        let slug = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.slug().eq_ignore_ascii_case(slug))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Normalizes a raw section-access value into an ordered list of sections.
///
/// Arrays keep the input order with unknown and duplicate entries dropped. A
/// bare string is treated as a one-element list. Anything else yields an
/// empty list.
#[must_use]
pub fn normalize_section_access(raw: &Value) -> Vec<Section> {
    match raw {
        Value::Array(items) => {
            normalize_section_slugs(items.iter().filter_map(Value::as_str))
        }
        Value::String(s) => normalize_section_slugs([s.as_str()]),
        _ => Vec::new(),
    }
}

/// Normalizes already-extracted slugs, with the same rules as
/// [`normalize_section_access`].
#[must_use]
pub fn normalize_section_slugs<I, S>(slugs: I) -> Vec<Section>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sections = Vec::new();
    for slug in slugs {
        match Section::from_slug(slug.as_ref()) {
            Some(section) if !sections.contains(&section) => sections.push(section),
            Some(_) => {}
            None => {
                tracing::debug!(slug = slug.as_ref(), "dropping unknown section slug");
            }
        }
    }
    sections
}
