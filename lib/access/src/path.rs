//! URL path to section mapping.
//!
//! The prefix table is ordered and first-match-wins. Nested exceptions must
//! precede the broader prefix that contains them.

use crate::resolver::has_section_access;
use crate::role::RoleCatalog;
use crate::section::Section;

/// Path of the own-schedule view. Any clock-in user may see their own shifts,
/// so it belongs to clock-in even though it lives under `/horarios`.
pub const OWN_SCHEDULE_PATH: &str = "/horarios/mio";

/// Ordered prefix table.
const PATH_TABLE: &[(&str, Section)] = &[
    (OWN_SCHEDULE_PATH, Section::ClockIn),
    ("/reservas", Section::Reservations),
    ("/menus", Section::Menus),
    ("/alimentos", Section::FoodCatalog),
    ("/ajustes", Section::Settings),
    ("/miembros", Section::Members),
    ("/fichaje", Section::ClockIn),
    ("/horarios", Section::Schedules),
    ("/facturas", Section::Invoices),
    ("/informes", Section::Reports),
    ("/estado-cuenta", Section::AccountStatement),
];

/// Returns true if `path` is `prefix` itself or lies beneath it.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Maps a request path to the section that guards it.
///
/// Query strings and fragments are ignored. Returns `None` for paths no
/// section owns (assets, auth endpoints, the API, the root).
#[must_use]
pub fn section_for_path(path: &str) -> Option<Section> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    PATH_TABLE
        .iter()
        .find(|(prefix, _)| matches_prefix(path, prefix))
        .map(|(_, section)| *section)
}

/// Returns true if the path belongs to a section and that section is
/// reachable. Unmapped paths are never "allowed" by this check.
#[must_use]
pub fn is_path_allowed(
    catalog: &RoleCatalog,
    path: &str,
    role: &str,
    explicit_access: &[Section],
    importance: Option<u8>,
) -> bool {
    section_for_path(path).is_some_and(|section| {
        has_section_access(catalog, role, section, explicit_access, importance)
    })
}
