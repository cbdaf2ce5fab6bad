//! Sidebar projection.

use crate::resolver::has_section_access;
use crate::role::RoleCatalog;
use crate::section::Section;
use serde::Serialize;

/// A navigation entry. Static: it does not depend on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SidebarItem {
    pub section: Section,
    pub path: &'static str,
    pub label: &'static str,
}

impl From<Section> for SidebarItem {
    fn from(section: Section) -> Self {
        Self {
            section,
            path: section.path(),
            label: section.label(),
        }
    }
}

/// The full sidebar, in priority order.
pub fn sidebar_catalog() -> impl Iterator<Item = SidebarItem> {
    Section::ALL.into_iter().map(SidebarItem::from)
}

/// Projects the sidebar catalog onto what a staff member may reach.
///
/// Goes through the same [`has_section_access`] the route guard uses.
#[must_use]
pub fn sidebar_items_for_role(
    catalog: &RoleCatalog,
    role: &str,
    explicit_access: &[Section],
    importance: Option<u8>,
) -> Vec<SidebarItem> {
    sidebar_catalog()
        .filter(|item| has_section_access(catalog, role, item.section, explicit_access, importance))
        .collect()
}
