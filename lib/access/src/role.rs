//! Role catalog and role normalization.
//!
//! A role is a named privilege bundle: an importance score (0–100), a label
//! and the ordered set of sections it grants by default. The catalog is
//! loaded once at bootstrap and shared read-only across requests.

use crate::error::CatalogError;
use crate::section::{Section, normalize_section_access};
use staffdesk_core::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Highest importance a role or user can carry.
pub const MAX_IMPORTANCE: u8 = 100;

/// Legacy and blank role names, mapped to the role they stand for.
///
/// Consulted once by [`normalize_role`]; the match is on the already
/// lowercased, trimmed value.
const ROLE_ALIASES: &[(&str, &str)] = &[("", "admin"), ("owner", "admin"), ("propietario", "admin")];

/// Normalizes a role slug: trims, lowercases and resolves aliases.
#[must_use]
pub fn normalize_role(raw: &str) -> String {
    let role = raw.trim().to_lowercase();
    ROLE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == role)
        .map_or(role, |(_, target)| (*target).to_string())
}

/// Normalizes a role taken from an untyped payload.
///
/// A missing or null role is blank and therefore aliased like one. Other
/// non-string values are normalized from their JSON text, so `3` or
/// `["admin"]` become roles the catalog does not know.
#[must_use]
pub fn normalize_role_value(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => normalize_role(""),
        Some(Value::String(s)) => normalize_role(s),
        Some(other) => normalize_role(&other.to_string()),
    }
}

/// Normalizes an importance value taken from an untyped payload.
///
/// Integers in `0..=100` (as numbers or numeric strings) are accepted;
/// anything else is unknown.
#[must_use]
pub fn normalize_importance(raw: Option<&Value>) -> Option<u8> {
    let value = match raw? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u8::try_from(value).ok().filter(|v| *v <= MAX_IMPORTANCE)
}

/// A role as known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    slug: String,
    label: String,
    importance: u8,
    sections: Vec<Section>,
}

impl RoleDefinition {
    /// Creates a role definition. Importance is clamped to 100.
    #[must_use]
    pub fn new(
        slug: impl Into<String>,
        label: impl Into<String>,
        importance: u8,
        sections: Vec<Section>,
    ) -> Self {
        Self {
            slug: normalize_role(&slug.into()),
            label: label.into(),
            importance: importance.min(MAX_IMPORTANCE),
            sections,
        }
    }

    /// Returns the normalized role slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the role's importance.
    #[must_use]
    pub fn importance(&self) -> u8 {
        self.importance
    }

    /// Returns the default sections in catalog order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

/// Immutable mapping of role slug to role definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: HashMap<String, RoleDefinition>,
}

impl RoleCatalog {
    /// Creates a catalog from role definitions. Later duplicates win.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = RoleDefinition>) -> Self {
        Self {
            roles: roles
                .into_iter()
                .map(|role| (role.slug.clone(), role))
                .collect(),
        }
    }

    /// Returns the catalog shipped with the dashboard.
    #[must_use]
    pub fn builtin() -> Self {
        use Section::*;

        Self::new([
            RoleDefinition::new("admin", "Administrador", 100, Section::ALL.to_vec()),
            RoleDefinition::new(
                "gerente",
                "Gerente",
                90,
                vec![
                    Reservations,
                    Menus,
                    FoodCatalog,
                    Settings,
                    Members,
                    ClockIn,
                    Schedules,
                    Invoices,
                    Reports,
                ],
            ),
            RoleDefinition::new(
                "encargado",
                "Encargado",
                70,
                vec![Reservations, Menus, FoodCatalog, ClockIn, Schedules, Reports],
            ),
            RoleDefinition::new("recepcionista", "Recepcionista", 40, vec![Reservations, ClockIn]),
            RoleDefinition::new("cocinero", "Cocinero", 20, vec![FoodCatalog, ClockIn]),
            RoleDefinition::new("camarero", "Camarero", 10, vec![ClockIn]),
        ])
    }

    /// Builds a catalog from the backend's JSON shape:
    /// `{ "<slug>": { "importance": 90, "sectionAccess": ["reservas"] } }`.
    ///
    /// Malformed entries inside a role are normalized rather than rejected:
    /// unknown sections are dropped and an invalid importance becomes 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object.
    pub fn from_value(value: &Value) -> Result<Self, CatalogError> {
        let entries = value.as_object().ok_or(CatalogError::NotAMapping)?;

        let roles = entries.iter().map(|(slug, entry)| {
            let importance = normalize_importance(entry.get("importance")).unwrap_or_else(|| {
                tracing::warn!(role = %slug, "role has no valid importance, using 0");
                0
            });
            let sections = entry
                .get("sectionAccess")
                .map(normalize_section_access)
                .unwrap_or_default();
            let label = entry
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(slug)
                .to_string();
            RoleDefinition::new(slug.as_str(), label, importance, sections)
        });

        Ok(Self::new(roles))
    }

    /// Parses a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not JSON or not a mapping.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(json).map_err(|e| CatalogError::InvalidJson {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Looks up a role, normalizing the slug first.
    #[must_use]
    pub fn get(&self, role: &str) -> Option<&RoleDefinition> {
        self.roles.get(&normalize_role(role))
    }

    /// Returns the catalog importance of a role, if the role is known.
    #[must_use]
    pub fn importance(&self, role: &str) -> Option<u8> {
        self.get(role).map(RoleDefinition::importance)
    }

    /// Returns the default sections of a role; empty for unknown roles.
    #[must_use]
    pub fn default_sections(&self, role: &str) -> &[Section] {
        self.get(role)
            .map(RoleDefinition::sections)
            .unwrap_or_default()
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true if the catalog has no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
