//! Role-based section access for the staffdesk dashboard.
//!
//! This crate provides:
//! - The closed set of dashboard [`Section`]s, in priority order
//! - The [`RoleCatalog`] (role slug → importance, label, default sections)
//! - Pure resolver functions deciding section access and the landing path
//! - Path → section mapping and the per-request [`RouteGuard`]
//! - The sidebar projection, evaluated through the same resolver
//! - The backend [`Session`] shape, parsed leniently
//!
//! # Access Model
//!
//! A staff member's reachable sections are the per-session explicit list
//! when it is non-empty, otherwise their role's defaults; the two are never
//! merged. On top of that, [`Section::Members`] requires an importance of at
//! least 90.
//!
//! # Example
//!
//! ```
//! use staffdesk_access::{AccessContext, RoleCatalog, Section};
//!
//! let catalog = RoleCatalog::builtin();
//! let ctx = AccessContext::new(
//!     "admin",
//!     vec![Section::Reservations, Section::Invoices],
//!     Some(90),
//! );
//!
//! assert!(ctx.can_access(&catalog, Section::Invoices));
//! assert!(!ctx.can_access(&catalog, Section::Members));
//! assert_eq!(ctx.landing_path(&catalog), "/reservas");
//! ```

pub mod error;
pub mod guard;
pub mod path;
pub mod redirect;
pub mod resolver;
pub mod role;
pub mod section;
pub mod session;
pub mod sidebar;

pub use error::CatalogError;
pub use guard::{GuardDecision, RouteGuard};
pub use path::{is_path_allowed, section_for_path};
pub use redirect::{SESSION_EXPIRED_REASON, login_url};
pub use resolver::{
    MEMBERS_MIN_IMPORTANCE, allowed_sections, first_allowed_path, has_section_access,
};
pub use role::{RoleCatalog, RoleDefinition, normalize_importance, normalize_role};
pub use section::{Section, normalize_section_access};
pub use session::{AccessContext, Restaurant, Session, StaffUser};
pub use sidebar::{SidebarItem, sidebar_items_for_role};
