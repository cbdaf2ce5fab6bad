//! Shared error plumbing for the staffdesk crates.
//!
//! Domain errors live next to the code that raises them (`CatalogError` in
//! the access crate, `GuardError` in the session guard, and so on). This
//! module only fixes the report type they travel in.

use rootcause::Report;

/// Result alias carrying a rootcause [`Report`].
///
/// `C` is the context type of the outermost layer; callers attach their own
/// context with `.context()` as the error moves outward.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
