//! Session shape consumed from the authentication backend.
//!
//! The backend owns sessions; this crate only reads them. Parsing is lenient:
//! every field is normalized to a safe value instead of failing the whole
//! payload, because a rejected session would log the user out over a single
//! malformed field.

use crate::resolver::{allowed_sections, first_allowed_path, has_section_access};
use crate::role::{RoleCatalog, normalize_importance, normalize_role_value};
use crate::section::{Section, normalize_section_access};
use crate::sidebar::{SidebarItem, sidebar_items_for_role};
use serde::Serialize;
use serde_json::Value;
use staffdesk_core::{RestaurantId, UserId};

/// The signed-in staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUser {
    id: Option<UserId>,
    email: Option<String>,
    name: Option<String>,
    /// Normalized role slug.
    role: String,
    /// Per-session importance override.
    role_importance: Option<u8>,
    /// Per-session section override; empty means "use role defaults".
    section_access: Vec<Section>,
}

impl StaffUser {
    /// Creates a user with a role and no overrides.
    #[must_use]
    pub fn new(role: &str) -> Self {
        Self {
            id: None,
            email: None,
            name: None,
            role: crate::role::normalize_role(role),
            role_importance: None,
            section_access: Vec::new(),
        }
    }

    /// Sets the importance override.
    #[must_use]
    pub fn with_importance(mut self, importance: Option<u8>) -> Self {
        self.role_importance = importance;
        self
    }

    /// Sets the section-access override.
    #[must_use]
    pub fn with_section_access(mut self, sections: Vec<Section>) -> Self {
        self.section_access = sections;
        self
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    fn from_value(value: &Value) -> Self {
        Self {
            id: string_field(value, "id").map(UserId::new),
            email: string_field(value, "email"),
            name: string_field(value, "name"),
            role: normalize_role_value(value.get("role")),
            role_importance: normalize_importance(value.get("roleImportance")),
            section_access: value
                .get("sectionAccess")
                .map(normalize_section_access)
                .unwrap_or_default(),
        }
    }

    /// Backend user id, if the payload carried one.
    #[must_use]
    pub fn id(&self) -> Option<&UserId> {
        self.id.as_ref()
    }

    /// Email, if present.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Display name, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Normalized role slug; `admin` when the payload had none.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Importance sent with the user, overriding the role's catalog value.
    #[must_use]
    pub fn role_importance(&self) -> Option<u8> {
        self.role_importance
    }

    /// Explicit section grants. Empty means the role's defaults apply.
    #[must_use]
    pub fn section_access(&self) -> &[Section] {
        &self.section_access
    }
}

/// A restaurant the staff member belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: Option<String>,
}

impl Restaurant {
    fn from_value(value: &Value) -> Option<Self> {
        let id = match value.get("id")? {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self {
            id: RestaurantId::new(id),
            name: string_field(value, "name"),
        })
    }
}

/// An authenticated dashboard session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    user: StaffUser,
    restaurants: Vec<Restaurant>,
    active_restaurant_id: Option<RestaurantId>,
}

impl Session {
    /// Creates a session for a user with no restaurants.
    #[must_use]
    pub fn new(user: StaffUser) -> Self {
        Self {
            user,
            restaurants: Vec::new(),
            active_restaurant_id: None,
        }
    }

    /// Adds restaurants and activates the first one if none is active.
    #[must_use]
    pub fn with_restaurants(mut self, restaurants: Vec<Restaurant>) -> Self {
        self.restaurants = restaurants;
        if self.active_restaurant_id.is_none() {
            self.active_restaurant_id = self.restaurants.first().map(|r| r.id.clone());
        }
        self
    }

    /// Parses the backend's session payload:
    /// `{ user: { role, roleImportance?, sectionAccess?, email, name },
    ///    restaurants: [..], activeRestaurantId }`.
    ///
    /// Returns `None` only when there is no `user` object at all, which is
    /// treated as "no session".
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let user = value.get("user").filter(|u| u.is_object())?;

        let restaurants = value
            .get("restaurants")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Restaurant::from_value).collect())
            .unwrap_or_default();

        let active_restaurant_id = match value.get("activeRestaurantId") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(RestaurantId::new(s.as_str())),
            Some(Value::Number(n)) => Some(RestaurantId::new(n.to_string())),
            _ => None,
        };

        Some(Self {
            user: StaffUser::from_value(user),
            restaurants,
            active_restaurant_id,
        })
    }

    #[must_use]
    pub fn user(&self) -> &StaffUser {
        &self.user
    }

    #[must_use]
    pub fn restaurants(&self) -> &[Restaurant] {
        &self.restaurants
    }

    #[must_use]
    pub fn active_restaurant_id(&self) -> Option<&RestaurantId> {
        self.active_restaurant_id.as_ref()
    }

    /// Switches the active restaurant. Only restaurants listed in the
    /// session can be activated; returns false otherwise.
    pub fn switch_restaurant(&mut self, id: &RestaurantId) -> bool {
        if self.restaurants.iter().any(|r| &r.id == id) {
            self.active_restaurant_id = Some(id.clone());
            true
        } else {
            false
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Request-scoped access inputs derived from a session and the catalog.
///
/// Importance is the session override when present, else the catalog
/// importance of the role, else unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    role: String,
    explicit_access: Vec<Section>,
    importance: Option<u8>,
}

impl AccessContext {
    /// Builds the context for a session.
    #[must_use]
    pub fn from_session(session: &Session, catalog: &RoleCatalog) -> Self {
        let user = session.user();
        Self {
            role: user.role().to_string(),
            explicit_access: user.section_access().to_vec(),
            importance: user
                .role_importance()
                .or_else(|| catalog.importance(user.role())),
        }
    }

    /// Builds a context from raw parts.
    #[must_use]
    pub fn new(role: &str, explicit_access: Vec<Section>, importance: Option<u8>) -> Self {
        Self {
            role: crate::role::normalize_role(role),
            explicit_access,
            importance,
        }
    }

    /// Normalized role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Explicit section grants.
    #[must_use]
    pub fn explicit_access(&self) -> &[Section] {
        &self.explicit_access
    }

    /// Effective importance: the user's own, else the role's.
    #[must_use]
    pub fn importance(&self) -> Option<u8> {
        self.importance
    }

    /// Whether `section` is reachable. See [`has_section_access`].
    #[must_use]
    pub fn can_access(&self, catalog: &RoleCatalog, section: Section) -> bool {
        has_section_access(catalog, &self.role, section, &self.explicit_access, self.importance)
    }

    /// Reachable sections, in priority order.
    #[must_use]
    pub fn allowed_sections(&self, catalog: &RoleCatalog) -> Vec<Section> {
        allowed_sections(catalog, &self.role, &self.explicit_access, self.importance)
    }

    /// Where a signed-in request for `/` or the login page goes.
    #[must_use]
    pub fn landing_path(&self, catalog: &RoleCatalog) -> &'static str {
        first_allowed_path(catalog, &self.role, &self.explicit_access, self.importance)
    }

    /// Sidebar entries for this context.
    #[must_use]
    pub fn sidebar(&self, catalog: &RoleCatalog) -> Vec<SidebarItem> {
        sidebar_items_for_role(catalog, &self.role, &self.explicit_access, self.importance)
    }
}
