//! Section access resolution.
//!
//! Every function here is pure and total: the role is normalized through the
//! catalog, an empty explicit list means "no override", and an unknown
//! importance is passed as `None`. Both the route guard and the sidebar call
//! into this module, so they can never disagree.

use crate::role::RoleCatalog;
use crate::section::Section;

/// Minimum importance required to reach [`Section::Members`].
pub const MEMBERS_MIN_IMPORTANCE: u8 = 90;

/// Applies the importance floor.
///
/// Only [`Section::Members`] is gated. When the importance is unknown the
/// gate passes; existing deployments rely on that, so it stays fail-open.
#[must_use]
pub fn passes_importance_gate(section: Section, importance: Option<u8>) -> bool {
    match (section, importance) {
        (Section::Members, Some(importance)) => importance >= MEMBERS_MIN_IMPORTANCE,
        _ => true,
    }
}

/// Returns the explicit list when non-empty, else the role's defaults.
///
/// The two sources are never merged.
#[must_use]
pub fn effective_sections<'a>(
    catalog: &'a RoleCatalog,
    role: &str,
    explicit_access: &'a [Section],
) -> &'a [Section] {
    if explicit_access.is_empty() {
        catalog.default_sections(role)
    } else {
        explicit_access
    }
}

/// Decides whether a staff member may reach a section.
#[must_use]
pub fn has_section_access(
    catalog: &RoleCatalog,
    role: &str,
    section: Section,
    explicit_access: &[Section],
    importance: Option<u8>,
) -> bool {
    passes_importance_gate(section, importance)
        && effective_sections(catalog, role, explicit_access).contains(&section)
}

/// Returns every reachable section, in priority order.
#[must_use]
pub fn allowed_sections(
    catalog: &RoleCatalog,
    role: &str,
    explicit_access: &[Section],
    importance: Option<u8>,
) -> Vec<Section> {
    Section::ALL
        .into_iter()
        .filter(|section| has_section_access(catalog, role, *section, explicit_access, importance))
        .collect()
}

/// Returns the landing path: the highest-priority reachable section's path.
///
/// Falls back to the clock-in path when nothing is reachable, so the result
/// is always a concrete path.
#[must_use]
pub fn first_allowed_path(
    catalog: &RoleCatalog,
    role: &str,
    explicit_access: &[Section],
    importance: Option<u8>,
) -> &'static str {
    let candidates = effective_sections(catalog, role, explicit_access);
    let landing = Section::ALL
        .into_iter()
        .filter(|section| candidates.contains(section))
        .find(|section| passes_importance_gate(*section, importance));

    match landing {
        Some(section) => section.path(),
        None => {
            tracing::debug!(role, "no reachable section, landing on clock-in");
            Section::ClockIn.path()
        }
    }
}
